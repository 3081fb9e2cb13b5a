use crate::Kinetics::elementary_reaction::{ElementaryReaction, ExpressionStyle};
use crate::Kinetics::network_compiler::ReactionNetwork;
use crate::NetworkIVP::integrator::ReactionNetworkIVP;
use crate::NetworkIVP::solver_settings::{SolverKind, SolverOptions, SolverParam};
use std::collections::HashMap;

pub fn network_examples(task: usize) {
    //

    match task {
        0 => {
            // COMPILATION OF A SMALL NETWORK: balance terms and rate constant tensors
            let forward = ElementaryReaction::from_equation("A + B -> C", 2.0, "k1").unwrap();
            let reverse = forward.create_reverse_reaction(0.5, None, None);
            let decay = ElementaryReaction::from_equation("C -> D", 0.1, "k2").unwrap();
            let style = ExpressionStyle {
                spacing_width: 2,
                ..ExpressionStyle::default()
            };
            for rxn in [&forward, &reverse, &decay] {
                println!("{}   rate: {}", rxn.reaction_expression(&style).unwrap(), rxn.rate_expression());
            }
            let network =
                ReactionNetwork::compile(vec![forward, reverse, decay], HashMap::new()).unwrap();
            network.pretty_print().unwrap();
            println!("first order tensor {}", network.tensors.first_order);
            for (i, slice) in network.tensors.second_order.iter().enumerate() {
                println!("second order tensor, output species {}: {}", network.species_index.names()[i], slice);
            }
        }
        1 => {
            // REVERSIBLE ISOMERIZATION A <=> B, equilibrium at B/A = kf/kr
            let forward = ElementaryReaction::from_equation("A -> B", 1.0, "kf").unwrap();
            let reverse = forward.create_reverse_reaction(0.5, Some("kr"), None);
            let mut ivp = ReactionNetworkIVP::new(vec![forward, reverse]);
            ivp.set_initial_concentrations(HashMap::from([("A".to_string(), 1.0)]));
            ivp.set_time_span(0.0, 10.0).unwrap();
            ivp.solve().unwrap();
            ivp.pretty_print(10).unwrap();
            let last = ivp.get_result().unwrap().final_concentrations();
            println!("B/A at t = 10: {:.4}", last["B"] / last["A"]);
        }
        2 => {
            // DIMERIZATION 2A -> A2 with the rate constant scaled by group 1
            let dimerization = ElementaryReaction::from_equation("2 A -> A2", 1.0, "kd")
                .unwrap()
                .with_scaling_group(1);
            let mut ivp = ReactionNetworkIVP::new(vec![dimerization]);
            ivp.set_initial_concentrations(HashMap::from([("A".to_string(), 1.0)]));
            ivp.set_scaling_groups(HashMap::from([(1, 4.0)]));
            ivp.set_time_span(0.0, 5.0).unwrap();
            ivp.set_solver_params(HashMap::from([
                ("solver".to_string(), SolverParam::Str("dop853".to_string())),
                ("output_step".to_string(), SolverParam::OptionalFloat(Some(0.5))),
            ]))
            .unwrap();
            ivp.solve().unwrap();
            ivp.pretty_print(1).unwrap();
        }
        3 => {
            // LOTKA-VOLTERRA: X -> 2X, X + Y -> 2Y, Y -> (sink)
            let reactions = vec![
                ElementaryReaction::from_equation("X -> 2 X", 1.0, "k_birth").unwrap(),
                ElementaryReaction::from_equation("X + Y -> 2 Y", 1.0, "k_pred").unwrap(),
                ElementaryReaction::from_equation("Y -> ", 1.0, "k_death").unwrap(),
            ];
            let mut ivp = ReactionNetworkIVP::new(reactions);
            ivp.set_initial_concentrations(HashMap::from([
                ("X".to_string(), 2.0),
                ("Y".to_string(), 1.0),
            ]));
            ivp.set_time_span(0.0, 20.0).unwrap();
            ivp.set_solver_options(SolverOptions {
                solver: SolverKind::Dopri5,
                rtol: 1e-8,
                atol: 1e-10,
                output_step: Some(1.0),
                ..SolverOptions::default()
            });
            ivp.solve().unwrap();
            ivp.pretty_print(1).unwrap();
            ivp.save_result("lotka_volterra.json").unwrap();
        }
        _ => {
            println!("no such example");
        }
    }
}
