/// eng
/// Representation of a single irreversible elementary reaction: reactants, products, rate constant value and key,
/// optional name and scaling group. Provides reverse reactions, rate and reaction expression strings,
/// parsing of equation strings and JSON file I/O.
///  # Examples
/// ```
/// use KiNet::Kinetics::elementary_reaction::ElementaryReaction;
/// let rxn = ElementaryReaction::from_equation("2A + B -> C", 1e3, "k1").unwrap();
/// assert_eq!(rxn.order(), 3);
/// assert_eq!(rxn.rate_expression(), "k1*A*A*B");
/// println!("{}", rxn);
/// ```
pub mod elementary_reaction;
/// per-species bookkeeping of generating and consuming reactions
pub mod stoich_balance;
/// eng
/// The module takes as input a vector of elementary reactions and produces the following data:
/// 1) a HashMap of rate constant values keyed by rate constant names
/// 2) a HashMap of stoichiometric balance terms keyed by species
/// 3) the index of every species in concentration vectors
/// 4) dense tensors of rate constants for first-order (rank 2) and second-order (rank 3) reactions
///
/// Note:
/// reactions of other orders are skipped when building the tensors; they are reported in the result
/// and with a warning in the log
///  # Examples
/// ```
/// use KiNet::Kinetics::elementary_reaction::ElementaryReaction;
/// use KiNet::Kinetics::network_compiler::{ReactionNetwork, ScalingGroups};
/// let forward = ElementaryReaction::from_equation("A -> B", 2.0, "k1").unwrap();
/// let backward = forward.create_reverse_reaction(1.0, None, None);
/// let network = ReactionNetwork::compile(vec![forward, backward], ScalingGroups::new()).unwrap();
/// let (a, b) = (network.species_index.get("A").unwrap(), network.species_index.get("B").unwrap());
/// assert_eq!(network.tensors.first_order_entry(b, a), 2.0);
/// assert_eq!(network.tensors.first_order_entry(a, b), 1.0);
/// ```
pub mod network_compiler;
