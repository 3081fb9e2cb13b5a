//! # Reaction Network Initial Value Problem
//!
//! Integrates the law-of-mass-action rate equations of a compiled network forward in time.
//!
//! ## Main Components
//! - [`integrate_reaction_network`]: initial concentrations + tensors + species index -> [`ReactionTrajectory`]
//! - [`ReactionNetworkIVP`]: task struct wrapping compilation and integration
//!
//! ## Usage Pattern
//! 1. `new()` - Create instance with the reactions
//! 2. `set_initial_concentrations()`, `set_time_span()`, `set_scaling_groups()`, `set_solver_params()`
//! 3. `check_task()` - Validate configuration
//! 4. `solve()` - Compile the network and integrate
//! 5. `get_result()`, `pretty_print()` or `save_result()`
//!
//! ## Error Handling Pattern
//! Malformed tasks (bad time span, unknown species, inconsistent tensors) are returned as errors
//! before the solver starts. Failures of the solver itself are not errors: the trajectory carries
//! [`SolverStatus::Failed`] with the solver's own error and the samples computed so far.
//!
//! ## Example
//! ```
//! use KiNet::Kinetics::elementary_reaction::ElementaryReaction;
//! use KiNet::NetworkIVP::integrator::ReactionNetworkIVP;
//! use std::collections::HashMap;
//! let rxn = ElementaryReaction::from_equation("A -> B", 1.0, "k1").unwrap();
//! let mut ivp = ReactionNetworkIVP::new(vec![rxn]);
//! ivp.set_initial_concentrations(HashMap::from([("A".to_string(), 1.0)]));
//! ivp.set_time_span(0.0, 10.0).unwrap();
//! ivp.solve().unwrap();
//! let result = ivp.get_result().unwrap();
//! assert!(result.success());
//! ```
use crate::Kinetics::elementary_reaction::ElementaryReaction;
use crate::Kinetics::network_compiler::{
    CellPolicy, CompileError, RateConstTensors, ReactionNetwork, ScalingGroups, SpeciesIndex,
};
use crate::NetworkIVP::mass_action::MassActionSystem;
use crate::NetworkIVP::solver_settings::{SolverKind, SolverOptions, SolverParam};
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use ode_solvers::dop853::Dop853;
use ode_solvers::dop_shared::{IntegrationError as OdeError, OutputType, Stats};
use ode_solvers::dopri5::Dopri5;
use prettytable::{Cell, Row, Table};
use serde_json::json;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/////////////////////ERROR HANDLING////////////////////////////////////////////////////////
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("Invalid time span: t0={t0}, tf={tf}")]
    InvalidTimeSpan { t0: f64, tf: f64 },
    #[error("Species '{0}' of the initial state is not part of the network")]
    UnknownSpecies(String),
    #[error("Rate constant tensors do not match the {0} indexed species")]
    ShapeMismatch(usize),
    #[error("Invalid solver parameter: {0}")]
    InvalidSolverParam(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum NetworkIVPError {
    #[error("Task is not complete: {0}")]
    IncompleteTask(String),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

////////////////////////////////////////////////////////////////////////////////////////////
/// outcome reported by the ODE solver
#[derive(Debug)]
pub enum SolverStatus {
    Success,
    Failed(OdeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SolverStats {
    pub num_eval: usize,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
}

impl std::ops::AddAssign for SolverStats {
    fn add_assign(&mut self, other: Self) {
        self.num_eval += other.num_eval;
        self.accepted_steps += other.accepted_steps;
        self.rejected_steps += other.rejected_steps;
    }
}

impl From<Stats> for SolverStats {
    fn from(stats: Stats) -> Self {
        Self {
            num_eval: stats.num_eval as usize,
            accepted_steps: stats.accepted_steps as usize,
            rejected_steps: stats.rejected_steps as usize,
        }
    }
}

/// Concentration-vs-time trajectory of a reaction network
#[derive(Debug)]
pub struct ReactionTrajectory {
    /// species names in index order, i.e. the row order of `y`
    pub species: Vec<String>,
    /// sampled time points
    pub t: Vec<f64>,
    /// concentrations, shape (n_species, n_samples)
    pub y: DMatrix<f64>,
    pub status: SolverStatus,
    pub message: String,
    /// None if the solver failed
    pub stats: Option<SolverStats>,
}

impl ReactionTrajectory {
    pub fn success(&self) -> bool {
        matches!(self.status, SolverStatus::Success)
    }

    pub fn n_samples(&self) -> usize {
        self.t.len()
    }

    /// concentration of one species at every sampled time point
    pub fn concentrations_of(&self, species: &str) -> Option<Vec<f64>> {
        let i = self.species.iter().position(|s| s == species)?;
        Some(self.y.row(i).iter().copied().collect())
    }

    pub fn state_at(&self, sample: usize) -> Option<DVector<f64>> {
        if sample >= self.y.ncols() {
            return None;
        }
        Some(self.y.column(sample).into_owned())
    }

    /// concentrations at the last sampled time point
    pub fn final_concentrations(&self) -> HashMap<String, f64> {
        match self.y.ncols().checked_sub(1) {
            Some(last) => self
                .species
                .iter()
                .enumerate()
                .map(|(i, s)| (s.clone(), self.y[(i, last)]))
                .collect(),
            None => HashMap::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let concentrations: serde_json::Map<String, serde_json::Value> = self
            .species
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), json!(self.y.row(i).iter().collect::<Vec<&f64>>())))
            .collect();
        json!({
            "success": self.success(),
            "message": self.message,
            "t": self.t,
            "concentrations": concentrations,
        })
    }

    pub fn save_result<P: AsRef<Path>>(&self, path: P) -> Result<(), IntegrationError> {
        let mut file = File::create(path.as_ref())?;
        file.write_all(serde_json::to_string_pretty(&self.to_json())?.as_bytes())?;
        info!("trajectory written to {}", path.as_ref().display());
        Ok(())
    }

    /// prints every `every`-th sample (and the last one) as a table
    pub fn pretty_print(&self, every: usize) {
        let mut table = Table::new();
        let mut header = vec![Cell::new("t")];
        header.extend(self.species.iter().map(|s| Cell::new(s)));
        table.add_row(Row::new(header));
        let every = every.max(1);
        for (sample, t) in self.t.iter().enumerate() {
            if sample % every != 0 && sample + 1 != self.t.len() {
                continue;
            }
            let mut row = vec![Cell::new(&format!("{:.4e}", t))];
            row.extend(
                self.y
                    .column(sample)
                    .iter()
                    .map(|c| Cell::new(&format!("{:.6e}", c))),
            );
            table.add_row(Row::new(row));
        }
        table.printstd();
        println!("{}", self.message);
    }
}

/////////////////////////////////INTEGRATION///////////////////////////////////////////////

/// Solves the system of ODEs of a compiled reaction network.
///
/// Species absent from `init_nonzero_concs` start at zero. A zero-length time span returns the
/// initial state as the only sample.
/// Any finite `t0 < tf` is accepted; unless the solver fails the last sample is at `tf`, also
/// when `output_step` does not divide the span.
pub fn integrate_reaction_network(
    init_nonzero_concs: &HashMap<String, f64>,
    rate_const_tensors: &RateConstTensors,
    species_index: &SpeciesIndex,
    t0: f64,
    tf: f64,
    options: &SolverOptions,
) -> Result<ReactionTrajectory, IntegrationError> {
    if !t0.is_finite() || !tf.is_finite() || tf < t0 {
        return Err(IntegrationError::InvalidTimeSpan { t0, tf });
    }
    let n_species = species_index.len();
    if !rate_const_tensors.is_consistent() || rate_const_tensors.n_species() != n_species {
        return Err(IntegrationError::ShapeMismatch(n_species));
    }
    options.validate()?;

    let mut init_concs = DVector::zeros(n_species);
    for (species, c0) in init_nonzero_concs.iter() {
        let i = species_index
            .get(species)
            .ok_or_else(|| IntegrationError::UnknownSpecies(species.clone()))?;
        init_concs[i] = *c0;
    }
    let species = species_index.names().to_vec();

    if tf == t0 {
        return Ok(ReactionTrajectory {
            species,
            t: vec![t0],
            y: DMatrix::from_columns(&[init_concs]),
            status: SolverStatus::Success,
            message: "Zero-length time span, initial state returned".to_string(),
            stats: Some(SolverStats::default()),
        });
    }
    // nothing to integrate, and the solvers' error norms are undefined for an empty state
    if n_species == 0 {
        return Ok(ReactionTrajectory {
            species,
            t: vec![t0, tf],
            y: DMatrix::zeros(0, 2),
            status: SolverStatus::Success,
            message: "Empty network, nothing to integrate".to_string(),
            stats: Some(SolverStats::default()),
        });
    }

    // the system is autonomous, so the solvers always run on tau = t - t0 in [0, span]
    let span = tf - t0;
    let end_tol = 1e-9 * span.max(1.0);
    let (dx, out_type) = match options.output_step {
        Some(dx) => (dx, OutputType::Dense),
        None => (0.0, OutputType::Sparse),
    };
    let dense = options.output_step.is_some();
    info!(
        "integrating {} species over [{}, {}] with {:?}",
        n_species, t0, tf, options.solver
    );

    let (mut result, mut taus, mut states) = run_solver(
        rate_const_tensors,
        init_concs.clone(),
        span,
        dx,
        out_type,
        options,
    );

    // the initial state is always the first sample
    if !taus.first().is_some_and(|tau| tau.abs() <= f64::EPSILON) {
        taus.insert(0, 0.0);
        states.insert(0, init_concs.clone());
    }

    // dense output stops at the last multiple of dx, the remainder up to tf is one more run
    let mut tail_error = None;
    if dense {
        if let Ok(stats) = result.as_mut() {
            let last_tau = taus.last().copied().unwrap_or(0.0);
            if span - last_tau > end_tol {
                let y_last = states.last().cloned().unwrap_or_else(|| init_concs.clone());
                let (tail_result, _, tail_states) = run_solver(
                    rate_const_tensors,
                    y_last,
                    span - last_tau,
                    0.0,
                    OutputType::Sparse,
                    options,
                );
                match tail_result {
                    Ok(tail_stats) => {
                        *stats += tail_stats;
                        if let Some(y_end) = tail_states.last() {
                            taus.push(span);
                            states.push(y_end.clone());
                        }
                    }
                    Err(e) => tail_error = Some(e),
                }
            }
        }
    }
    if let Some(e) = tail_error {
        result = Err(e);
    }

    let reached_end = result.is_ok() && taus.last().is_some_and(|tau| span - tau <= end_tol);
    let mut t: Vec<f64> = taus.iter().map(|tau| t0 + tau).collect();
    if reached_end {
        if let Some(t_last) = t.last_mut() {
            *t_last = tf;
        }
    }

    let (status, message, stats) = match result {
        Ok(stats) => {
            info!(
                "integration finished: {} evaluations, {} accepted and {} rejected steps",
                stats.num_eval, stats.accepted_steps, stats.rejected_steps
            );
            (
                SolverStatus::Success,
                "The solver successfully reached the end of the integration interval.".to_string(),
                Some(stats),
            )
        }
        Err(e) => {
            warn!("integration failed: {}", e);
            let message = e.to_string();
            (SolverStatus::Failed(e), message, None)
        }
    };

    Ok(ReactionTrajectory {
        species,
        t,
        y: DMatrix::from_columns(&states),
        status,
        message,
        stats,
    })
}

/// one solver run from tau = 0 to `tau_end`; returns the solver outcome and the recorded samples
fn run_solver(
    rate_const_tensors: &RateConstTensors,
    y0: DVector<f64>,
    tau_end: f64,
    dx: f64,
    out_type: OutputType,
    options: &SolverOptions,
) -> (Result<SolverStats, OdeError>, Vec<f64>, Vec<DVector<f64>>) {
    let system = MassActionSystem::new(rate_const_tensors);
    let h_max = options.max_step.unwrap_or(tau_end);
    let h = options.first_step.unwrap_or(0.0);
    match options.solver {
        SolverKind::Dopri5 => {
            let mut stepper = Dopri5::from_param(
                system,
                0.0,
                tau_end,
                dx,
                y0,
                options.rtol,
                options.atol,
                0.9,
                0.04,
                0.2,
                10.0,
                h_max,
                h,
                options.max_iterations,
                1000,
                out_type,
            );
            let result = stepper.integrate().map(SolverStats::from);
            (result, stepper.x_out().clone(), stepper.y_out().clone())
        }
        SolverKind::Dop853 => {
            let mut stepper = Dop853::from_param(
                system,
                0.0,
                tau_end,
                dx,
                y0,
                options.rtol,
                options.atol,
                0.9,
                0.0,
                0.333,
                6.0,
                h_max,
                h,
                options.max_iterations,
                1000,
                out_type,
            );
            let result = stepper.integrate().map(SolverStats::from);
            (result, stepper.x_out().clone(), stepper.y_out().clone())
        }
    }
}

/////////////////////////////////TASK STRUCT///////////////////////////////////////////////

/// Compiles a reaction network and solves its initial value problem
///
/// # Examples
/// ```rust, ignore
/// let mut ivp = ReactionNetworkIVP::new(reactions);
/// ivp.set_initial_concentrations(HashMap::from([("A".to_string(), 1.0)]));
/// ivp.set_time_span(0.0, 100.0)?;
/// ivp.set_solver_params(HashMap::from([("rtol".to_owned(), SolverParam::Float(1e-8))]))?;
/// ivp.solve()?;
/// ivp.pretty_print(10);
/// ```
#[derive(Debug)]
pub struct ReactionNetworkIVP {
    reactions: Vec<ElementaryReaction>,
    scaling_groups: ScalingGroups,
    policy: CellPolicy,
    initial_concentrations: HashMap<String, f64>,
    t0: f64,
    tf: f64,
    options: SolverOptions,
    /// compiled network (initialized after solve() is called)
    network: Option<ReactionNetwork>,
    result: Option<ReactionTrajectory>,
}

impl ReactionNetworkIVP {
    pub fn new(reactions: Vec<ElementaryReaction>) -> Self {
        Self {
            reactions,
            scaling_groups: ScalingGroups::new(),
            policy: CellPolicy::default(),
            initial_concentrations: HashMap::new(),
            t0: 0.0,
            tf: 10.0,
            options: SolverOptions::default(),
            network: None,
            result: None,
        }
    }

    pub fn set_scaling_groups(&mut self, scaling_groups: ScalingGroups) {
        self.scaling_groups = scaling_groups;
    }

    pub fn set_cell_policy(&mut self, policy: CellPolicy) {
        self.policy = policy;
    }

    pub fn set_initial_concentrations(&mut self, concentrations: HashMap<String, f64>) {
        self.initial_concentrations = concentrations;
    }

    pub fn set_time_span(&mut self, t0: f64, tf: f64) -> Result<(), NetworkIVPError> {
        if !t0.is_finite() || !tf.is_finite() || tf < t0 {
            return Err(IntegrationError::InvalidTimeSpan { t0, tf }.into());
        }
        self.t0 = t0;
        self.tf = tf;
        Ok(())
    }

    pub fn set_solver_options(&mut self, options: SolverOptions) {
        self.options = options;
    }

    pub fn set_solver_params(
        &mut self,
        params: HashMap<String, SolverParam>,
    ) -> Result<(), NetworkIVPError> {
        self.options.set_params(params)?;
        Ok(())
    }

    /// Validates the task before solve()
    pub fn check_task(&self) -> Result<(), NetworkIVPError> {
        if self.reactions.is_empty() {
            return Err(NetworkIVPError::IncompleteTask(
                "no reactions set".to_string(),
            ));
        }
        if self.initial_concentrations.is_empty() {
            warn!("no initial concentrations set, all species start at 0");
        }
        self.options.validate()?;
        Ok(())
    }

    pub fn solve(&mut self) -> Result<(), NetworkIVPError> {
        self.check_task()?;
        info!("task checked!");
        let network = ReactionNetwork::compile_with_policy(
            self.reactions.clone(),
            self.scaling_groups.clone(),
            self.policy,
        )?;
        info!("network compiled!");
        for species in network.species_without_tensor_terms() {
            warn!("species '{}' takes part only in skipped reactions", species);
        }
        let trajectory = integrate_reaction_network(
            &self.initial_concentrations,
            &network.tensors,
            &network.species_index,
            self.t0,
            self.tf,
            &self.options,
        )?;
        info!("IVP solved!");
        self.network = Some(network);
        self.result = Some(trajectory);
        Ok(())
    }

    pub fn network(&self) -> Option<&ReactionNetwork> {
        self.network.as_ref()
    }

    pub fn get_result(&self) -> Option<&ReactionTrajectory> {
        self.result.as_ref()
    }

    pub fn pretty_print(&self, every: usize) -> Result<(), NetworkIVPError> {
        let network = self.network.as_ref().ok_or_else(|| {
            NetworkIVPError::IncompleteTask("Solver not initialized. Call solve() first.".to_string())
        })?;
        network.pretty_print()?;
        if let Some(result) = &self.result {
            result.pretty_print(every);
        }
        Ok(())
    }

    pub fn save_result<P: AsRef<Path>>(&self, path: P) -> Result<(), NetworkIVPError> {
        let result = self.result.as_ref().ok_or_else(|| {
            NetworkIVPError::IncompleteTask("Solver not initialized. Call solve() first.".to_string())
        })?;
        result.save_result(path)?;
        Ok(())
    }
}
