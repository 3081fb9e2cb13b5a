//! # Reaction Network Compiler
//!
//! Turns a collection of elementary reactions into the data structures needed to integrate
//! the law-of-mass-action rate equations.
//!
//! ## Main Components
//! - [`compile_reaction_network`]: rate constants by key + [`StoichBalanceTerms`] by species
//! - [`SpeciesIndex`]: fixed bijection between species identifiers and vector/tensor positions
//! - [`compute_rate_const_tensors`]: dense rate constant tensors by reaction order
//! - [`ReactionNetwork`]: all of the above bundled for one network
//!
//! ## Tensor Layout
//! For `n` species:
//! - order 1: `K1` of shape `(n, n)`, `K1[i, j]` multiplies `C_j` in `dC_i/dt`
//! - order 2: `K2` of shape `(n, n, n)` stored as `n` slices of `(n, n)`, `K2[i][(j, k)]` multiplies `C_j*C_k` in `dC_i/dt`
//!
//! Each entry is `sign * scale_factor * rate_const_value`, with sign +1 for generation and -1 for consumption.
//! A reaction is registered at most once per role per species, so `A + A -> B` contributes `-k` (not `-2k`)
//! to `K2[A][(A, A)]`.
//!
//! ## Non-Obvious Features
//! - Reactions of order other than 1 and 2 are skipped with a warning and listed in [`TensorCompilation::skipped`]
//! - Two contributions landing in the same tensor cell are summed by default ([`CellPolicy::Accumulate`]);
//!   [`CellPolicy::Overwrite`] keeps only the last write
//! - Scale factors of reactions without a scaling group, or with a group absent from the map, are 1.0
use crate::Kinetics::elementary_reaction::ElementaryReaction;
use crate::Kinetics::stoich_balance::{ReactionId, StoichBalanceTerms};
use log::{info, warn};
use nalgebra::DMatrix;
use prettytable::{Cell, Row, Table};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// scale factor by scaling group id
pub type ScalingGroups = HashMap<i32, f64>;
/// reaction orders with a rate constant tensor
pub const SUPPORTED_ORDERS: [usize; 2] = [1, 2];

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Duplicate rate constant \"{key}={value}\" defined in reaction: {reaction}")]
    DuplicateRateConstant {
        key: String,
        value: f64,
        reaction: String,
    },
    #[error("Species '{0}' has no index in the species index map")]
    UnindexedSpecies(String),
    #[error("Invalid species index map: {0}")]
    InvalidIndexMap(String),
    #[error("Invalid sign {0}, expected 1 or -1")]
    InvalidSign(i32),
}

/////////////////////////////////COMPILING REACTIONS///////////////////////////////////////////

/// Collects unique rate constants and the stoichiometric contributions of every species.
///
/// Fails on the first rate constant key defined twice; no partial result is returned.
pub fn compile_reaction_network(
    rxns: &[ElementaryReaction],
) -> Result<(HashMap<String, f64>, HashMap<String, StoichBalanceTerms>), CompileError> {
    let mut rate_consts: HashMap<String, f64> = HashMap::new();
    let mut contributing_terms: HashMap<String, StoichBalanceTerms> = HashMap::new();

    for (position, rxn) in rxns.iter().enumerate() {
        if rate_consts.contains_key(&rxn.rate_const_key) {
            return Err(CompileError::DuplicateRateConstant {
                key: rxn.rate_const_key.clone(),
                value: rxn.rate_const_value,
                reaction: rxn.to_string(),
            });
        }
        rate_consts.insert(rxn.rate_const_key.clone(), rxn.rate_const_value);

        let id = ReactionId(position);
        let shared = Arc::new(rxn.clone());
        // generated if among the products, consumed if among the reactants
        for species in rxn.products.iter() {
            terms_for(&mut contributing_terms, species).add_generation(id, &shared);
        }
        for species in rxn.reactants.iter() {
            terms_for(&mut contributing_terms, species).add_consumption(id, &shared);
        }
    }
    info!(
        "compiled {} reactions with {} species",
        rxns.len(),
        contributing_terms.len()
    );
    Ok((rate_consts, contributing_terms))
}

/// get-or-create accessor of the balance terms of one species
fn terms_for<'a>(
    contributing_terms: &'a mut HashMap<String, StoichBalanceTerms>,
    species: &str,
) -> &'a mut StoichBalanceTerms {
    contributing_terms
        .entry(species.to_string())
        .or_insert_with(StoichBalanceTerms::new)
}

/////////////////////////////////SPECIES INDEX///////////////////////////////////////////////

/// zero-based, stable bijection between species identifiers and positions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesIndex {
    names: Vec<String>,
    idxs: HashMap<String, usize>,
}

impl SpeciesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// indexes species by first appearance: reactants then products, reaction by reaction
    pub fn from_reactions(rxns: &[ElementaryReaction]) -> Self {
        let mut index = Self::new();
        for rxn in rxns {
            for species in rxn.reactants.iter().chain(rxn.products.iter()) {
                index.insert(species);
            }
        }
        index
    }

    /// builds an index from a caller-supplied mapping, which must be a bijection onto `0..n`
    pub fn from_map(map: HashMap<String, usize>) -> Result<Self, CompileError> {
        let n = map.len();
        let mut names: Vec<Option<String>> = vec![None; n];
        for (species, &i) in map.iter() {
            if i >= n {
                return Err(CompileError::InvalidIndexMap(format!(
                    "index {} of '{}' is out of range 0..{}",
                    i, species, n
                )));
            }
            if let Some(other) = &names[i] {
                return Err(CompileError::InvalidIndexMap(format!(
                    "'{}' and '{}' share index {}",
                    other, species, i
                )));
            }
            names[i] = Some(species.clone());
        }
        Ok(Self {
            names: names.into_iter().flatten().collect(),
            idxs: map,
        })
    }

    /// returns the index of the species, assigning the next free one if it is new
    pub fn insert(&mut self, species: &str) -> usize {
        if let Some(&i) = self.idxs.get(species) {
            return i;
        }
        let i = self.names.len();
        self.names.push(species.to_string());
        self.idxs.insert(species.to_string(), i);
        i
    }

    pub fn get(&self, species: &str) -> Option<usize> {
        self.idxs.get(species).copied()
    }

    pub fn index_of(&self, species: &str) -> Result<usize, CompileError> {
        self.get(species)
            .ok_or_else(|| CompileError::UnindexedSpecies(species.to_string()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// species names in index order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn as_map(&self) -> &HashMap<String, usize> {
        &self.idxs
    }
}

/////////////////////////////////RATE CONSTANT TENSORS///////////////////////////////////////

/// Dense rate constant tensors for first- and second-order reactions
#[derive(Debug, Clone, PartialEq)]
pub struct RateConstTensors {
    /// rank 2, shape (n, n)
    pub first_order: DMatrix<f64>,
    /// rank 3, one (n, n) slice per species the rate of change belongs to
    pub second_order: Vec<DMatrix<f64>>,
}

impl RateConstTensors {
    pub fn zeros(n_species: usize) -> Self {
        Self {
            first_order: DMatrix::zeros(n_species, n_species),
            second_order: vec![DMatrix::zeros(n_species, n_species); n_species],
        }
    }

    pub fn n_species(&self) -> usize {
        self.first_order.nrows()
    }

    pub fn first_order_entry(&self, i: usize, j: usize) -> f64 {
        self.first_order[(i, j)]
    }

    pub fn second_order_entry(&self, i: usize, j: usize, k: usize) -> f64 {
        self.second_order[i][(j, k)]
    }

    /// true if no entry of the tensor of this order is nonzero (unsupported orders are always empty)
    pub fn is_empty_order(&self, order: usize) -> bool {
        match order {
            1 => self.first_order.iter().all(|v| *v == 0.0),
            2 => self
                .second_order
                .iter()
                .all(|slice| slice.iter().all(|v| *v == 0.0)),
            _ => true,
        }
    }

    /// checks that the rank-2 tensor is square and the rank-3 tensor is n slices of (n, n)
    pub fn is_consistent(&self) -> bool {
        let n = self.n_species();
        self.first_order.ncols() == n
            && self.second_order.len() == n
            && self
                .second_order
                .iter()
                .all(|slice| slice.nrows() == n && slice.ncols() == n)
    }

    fn cell_mut(&mut self, row: usize, reactant_idxs: &[usize]) -> Option<&mut f64> {
        match *reactant_idxs {
            [j] => self.first_order.get_mut((row, j)),
            [j, k] => self.second_order.get_mut(row)?.get_mut((j, k)),
            _ => None,
        }
    }
}

/// What happens when two contributions target the same tensor cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellPolicy {
    /// contributions are summed
    #[default]
    Accumulate,
    /// the last processed contribution replaces earlier ones
    Overwrite,
}

/// a reaction left out of the tensors because its order is unsupported
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedReaction {
    pub id: ReactionId,
    pub rate_const_key: String,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TensorCompilation {
    pub tensors: RateConstTensors,
    /// each skipped reaction is listed once, in ascending id order
    pub skipped: Vec<SkippedReaction>,
}

/// Generates rate constant tensors by reaction order, summing colliding contributions
pub fn compute_rate_const_tensors(
    contributing_terms: &HashMap<String, StoichBalanceTerms>,
    species_index: &SpeciesIndex,
    scaling_groups: &ScalingGroups,
) -> Result<TensorCompilation, CompileError> {
    compute_rate_const_tensors_with_policy(
        contributing_terms,
        species_index,
        scaling_groups,
        CellPolicy::default(),
    )
}

pub fn compute_rate_const_tensors_with_policy(
    contributing_terms: &HashMap<String, StoichBalanceTerms>,
    species_index: &SpeciesIndex,
    scaling_groups: &ScalingGroups,
    policy: CellPolicy,
) -> Result<TensorCompilation, CompileError> {
    let mut tensors = RateConstTensors::zeros(species_index.len());
    let mut skipped_ids: BTreeSet<ReactionId> = BTreeSet::new();
    let mut skipped: Vec<SkippedReaction> = Vec::new();

    // species rows are filled in index order so that logs and skip lists are reproducible
    let mut rows: Vec<(usize, &String, &StoichBalanceTerms)> = contributing_terms
        .iter()
        .map(|(species, sbt)| Ok((species_index.index_of(species)?, species, sbt)))
        .collect::<Result<_, CompileError>>()?;
    rows.sort_by_key(|(i, _, _)| *i);

    for (curr_spec_idx, species, sbt) in rows {
        info!("{} : {}", species, sbt.rate_expression()?);

        for (sign, id, rxn) in sbt.signed_rxns() {
            let order = rxn.order();
            if !SUPPORTED_ORDERS.contains(&order) {
                if skipped_ids.insert(id) {
                    warn!(
                        "Reactions of order={} are currently unsupported, reaction {} ({}) will be skipped when building system of rate equations",
                        order, id, rxn
                    );
                    skipped.push(SkippedReaction {
                        id,
                        rate_const_key: rxn.rate_const_key.clone(),
                        order,
                    });
                }
                continue;
            }

            let reactant_idxs = rxn
                .reactants
                .iter()
                .map(|s| species_index.index_of(s))
                .collect::<Result<Vec<usize>, CompileError>>()?;
            let scale_factor = rxn
                .scaling_group_id
                .and_then(|group| scaling_groups.get(&group))
                .copied()
                .unwrap_or(1.0);
            let contribution = f64::from(sign) * scale_factor * rxn.rate_const_value;

            if let Some(cell) = tensors.cell_mut(curr_spec_idx, &reactant_idxs) {
                match policy {
                    CellPolicy::Accumulate => *cell += contribution,
                    CellPolicy::Overwrite => *cell = contribution,
                }
            }
        }
    }
    skipped.sort_by_key(|s| s.id);
    Ok(TensorCompilation { tensors, skipped })
}

/////////////////////////////////COMPILED NETWORK////////////////////////////////////////////

/// One compiled reaction network: everything an integration needs
#[derive(Debug, Clone)]
pub struct ReactionNetwork {
    pub reactions: Vec<ElementaryReaction>,
    pub rate_consts: HashMap<String, f64>,
    pub contributing_terms: HashMap<String, StoichBalanceTerms>,
    pub species_index: SpeciesIndex,
    pub scaling_groups: ScalingGroups,
    pub tensors: RateConstTensors,
    pub skipped: Vec<SkippedReaction>,
    pub policy: CellPolicy,
}

impl ReactionNetwork {
    pub fn compile(
        reactions: Vec<ElementaryReaction>,
        scaling_groups: ScalingGroups,
    ) -> Result<Self, CompileError> {
        Self::compile_with_policy(reactions, scaling_groups, CellPolicy::default())
    }

    pub fn compile_with_policy(
        reactions: Vec<ElementaryReaction>,
        scaling_groups: ScalingGroups,
        policy: CellPolicy,
    ) -> Result<Self, CompileError> {
        let (rate_consts, contributing_terms) = compile_reaction_network(&reactions)?;
        let species_index = SpeciesIndex::from_reactions(&reactions);
        let TensorCompilation { tensors, skipped } = compute_rate_const_tensors_with_policy(
            &contributing_terms,
            &species_index,
            &scaling_groups,
            policy,
        )?;
        Ok(Self {
            reactions,
            rate_consts,
            contributing_terms,
            species_index,
            scaling_groups,
            tensors,
            skipped,
            policy,
        })
    }

    pub fn n_species(&self) -> usize {
        self.species_index.len()
    }

    /// rebuilds the tensors after the scale factors changed
    pub fn rescale(&mut self, scaling_groups: ScalingGroups) -> Result<(), CompileError> {
        let TensorCompilation { tensors, skipped } = compute_rate_const_tensors_with_policy(
            &self.contributing_terms,
            &self.species_index,
            &scaling_groups,
            self.policy,
        )?;
        self.scaling_groups = scaling_groups;
        self.tensors = tensors;
        self.skipped = skipped;
        Ok(())
    }

    /// species which appear in one of the reactions but never in the tensors
    pub fn species_without_tensor_terms(&self) -> Vec<String> {
        let skipped: HashSet<ReactionId> = self.skipped.iter().map(|s| s.id).collect();
        self.species_index
            .names()
            .iter()
            .filter(|species| {
                self.contributing_terms.get(*species).map_or(true, |sbt| {
                    sbt.signed_rxns()
                        .iter()
                        .all(|(_, id, _)| skipped.contains(id))
                })
            })
            .cloned()
            .collect()
    }

    pub fn balance_table(&self) -> Result<Table, CompileError> {
        let mut table = Table::new();
        table.add_row(Row::new(vec![
            Cell::new("species"),
            Cell::new("index"),
            Cell::new("generation"),
            Cell::new("consumption"),
            Cell::new("rate expression"),
        ]));
        for (i, species) in self.species_index.names().iter().enumerate() {
            let (generation, consumption, expression) = match self.contributing_terms.get(species) {
                Some(sbt) => (
                    sbt.generation.len(),
                    sbt.consumption.len(),
                    sbt.rate_expression()?,
                ),
                None => (0, 0, String::new()),
            };
            table.add_row(Row::new(vec![
                Cell::new(species),
                Cell::new(&i.to_string()),
                Cell::new(&generation.to_string()),
                Cell::new(&consumption.to_string()),
                Cell::new(&expression),
            ]));
        }
        Ok(table)
    }

    pub fn pretty_print(&self) -> Result<(), CompileError> {
        self.balance_table()?.printstd();
        for s in self.skipped.iter() {
            println!("skipped {} ({}) of order {}", s.id, s.rate_const_key, s.order);
        }
        Ok(())
    }
}
