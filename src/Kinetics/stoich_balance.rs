//! Per-species bookkeeping of the reactions which generate and consume a species.
//!
//! Reactions are keyed by [`ReactionId`] (position of the reaction in the compiled input)
//! so a reaction is registered at most once per role per species, no matter how many times
//! the species occurs on one side of the reaction.
use crate::Kinetics::elementary_reaction::ElementaryReaction;
use crate::Kinetics::network_compiler::CompileError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// stable identity of a reaction within one compiled network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReactionId(pub usize);

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Which material balance terms a transformation occurs in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoichBalanceTerms {
    /// reactions in which the species appears as a product
    pub generation: BTreeMap<ReactionId, Arc<ElementaryReaction>>,
    /// reactions in which the species appears as a reactant
    pub consumption: BTreeMap<ReactionId, Arc<ElementaryReaction>>,
}

impl StoichBalanceTerms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_generation(&mut self, id: ReactionId, rxn: &Arc<ElementaryReaction>) {
        self.generation.entry(id).or_insert_with(|| Arc::clone(rxn));
    }

    pub fn add_consumption(&mut self, id: ReactionId, rxn: &Arc<ElementaryReaction>) {
        self.consumption.entry(id).or_insert_with(|| Arc::clone(rxn));
    }

    pub fn is_empty(&self) -> bool {
        self.generation.is_empty() && self.consumption.is_empty()
    }

    /// All contributing reactions with their sign in the rate expression:
    /// generation terms (+1) first, then consumption terms (-1), each in ascending id order
    pub fn signed_rxns(&self) -> Vec<(i32, ReactionId, &ElementaryReaction)> {
        self.generation
            .iter()
            .map(|(id, rxn)| (1, *id, rxn.as_ref()))
            .chain(
                self.consumption
                    .iter()
                    .map(|(id, rxn)| (-1, *id, rxn.as_ref())),
            )
            .collect()
    }

    /// symbolic rate equation of the species balance, e.g. `k1*A + -k2*B*B`
    pub fn rate_expression(&self) -> Result<String, CompileError> {
        let terms = self
            .signed_rxns()
            .into_iter()
            .map(|(sign, _, rxn)| Ok(format!("{}{}", sign_to_str(sign)?, rxn.rate_expression())))
            .collect::<Result<Vec<String>, CompileError>>()?;
        Ok(terms.join(" + "))
    }
}

pub fn sign_to_str(sign: i32) -> Result<&'static str, CompileError> {
    match sign {
        1 => Ok(""),
        -1 => Ok("-"),
        other => Err(CompileError::InvalidSign(other)),
    }
}
