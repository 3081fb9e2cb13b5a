//! Loading reaction networks and integration tasks from JSON documents.
//!
//! A network file is a JSON array of reaction records (see
//! [`ElementaryReaction`](crate::Kinetics::elementary_reaction::ElementaryReaction)). A task file is an object:
//! ```text
//! {
//!   "reactions": [ {"reactants": ["A"], "products": ["B"], "rate_const_value": 1.0, "rate_const_key": "k1"} ],
//!   "initial_concentrations": {"A": 1.0},
//!   "scaling_groups": {"1": 3.0},
//!   "t0": 0.0,
//!   "tf": 10.0,
//!   "solver": {"rtol": 1e-6}
//! }
//! ```
//! Everything but `reactions` and `initial_concentrations` is optional.
use crate::Kinetics::elementary_reaction::ElementaryReaction;
use crate::Kinetics::network_compiler::{SUPPORTED_ORDERS, ScalingGroups};
use crate::NetworkIVP::integrator::{NetworkIVPError, ReactionNetworkIVP};
use crate::NetworkIVP::solver_settings::SolverOptions;
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File '{0}' does not exist")]
    FileNotFound(PathBuf),
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error parsing '{file}' at line {line}, column {column}: {message}")]
    Parse {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("Failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Task(#[from] NetworkIVPError),
}

fn default_t0() -> f64 {
    0.0
}

fn default_tf() -> f64 {
    10.0
}

/// integration task as stored on disc
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkTask {
    pub reactions: Vec<ElementaryReaction>,
    pub initial_concentrations: HashMap<String, f64>,
    #[serde(default)]
    pub scaling_groups: ScalingGroups,
    #[serde(default = "default_t0")]
    pub t0: f64,
    #[serde(default = "default_tf")]
    pub tf: f64,
    #[serde(default)]
    pub solver: SolverOptions,
}

impl NetworkTask {
    pub fn into_ivp(self) -> Result<ReactionNetworkIVP, LoadError> {
        self.solver.validate().map_err(NetworkIVPError::from)?;
        let mut ivp = ReactionNetworkIVP::new(self.reactions);
        ivp.set_initial_concentrations(self.initial_concentrations);
        ivp.set_scaling_groups(self.scaling_groups);
        ivp.set_time_span(self.t0, self.tf)?;
        ivp.set_solver_options(self.solver);
        Ok(ivp)
    }
}

/// reads and parses a JSON file, logging the offending line of a parse error
fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    match serde_json::from_str(&content) {
        Ok(data) => {
            info!("Successfully parsed data from file '{}'", path.display());
            Ok(data)
        }
        Err(e) => {
            let (line, column) = (e.line(), e.column());
            error!(
                "Error parsing '{}' at line {}, column {}: {}",
                path.display(),
                line,
                column,
                e
            );
            // show the problematic line with a pointer to the error position
            if let Some(problem_line) = content.lines().nth(line.saturating_sub(1)) {
                error!("Problematic line: {}", problem_line);
                if column >= 1 && column <= problem_line.len() {
                    error!("{}", " ".repeat(column - 1) + "^");
                }
            }
            Err(LoadError::Parse {
                file: path.to_path_buf(),
                line,
                column,
                message: e.to_string(),
            })
        }
    }
}

/// Loads a JSON array of reactions and warns about suspicious content
pub fn load_reactions_from_file<P: AsRef<Path>>(
    file_name: P,
) -> Result<Vec<ElementaryReaction>, LoadError> {
    let path = file_name.as_ref();
    let reactions: Vec<ElementaryReaction> = load_json(path)?;
    validate_reactions(&reactions);
    info!(
        "Loaded {} reactions from file '{}'",
        reactions.len(),
        path.display()
    );
    Ok(reactions)
}

pub fn save_reactions_to_file<P: AsRef<Path>>(
    reactions: &[ElementaryReaction],
    file_name: P,
) -> Result<(), LoadError> {
    fs::write(file_name.as_ref(), serde_json::to_string_pretty(reactions)?)?;
    Ok(())
}

pub fn load_task_from_file<P: AsRef<Path>>(file_name: P) -> Result<NetworkTask, LoadError> {
    let path = file_name.as_ref();
    let task: NetworkTask = load_json(path)?;
    validate_reactions(&task.reactions);
    for species in task.initial_concentrations.keys() {
        let known = task
            .reactions
            .iter()
            .any(|r| r.reactants.contains(species) || r.products.contains(species));
        if !known {
            warn!("Initial concentration of '{}' given, but no reaction involves it", species);
        }
    }
    Ok(task)
}

pub fn load_solver_options<P: AsRef<Path>>(file_name: P) -> Result<SolverOptions, LoadError> {
    let options: SolverOptions = load_json(file_name.as_ref())?;
    options.validate().map_err(NetworkIVPError::from)?;
    Ok(options)
}

/// Checks that are not errors at load time but will most likely surprise later on
fn validate_reactions(reactions: &[ElementaryReaction]) {
    if reactions.is_empty() {
        warn!("Loaded reaction data is empty");
    }
    let mut keys = HashSet::new();
    for rxn in reactions {
        if rxn.rate_const_key.is_empty() {
            warn!("Reaction '{}' has an empty rate constant key", rxn);
        }
        if !keys.insert(rxn.rate_const_key.as_str()) {
            warn!(
                "Rate constant key '{}' is defined more than once, the network will not compile",
                rxn.rate_const_key
            );
        }
        if !SUPPORTED_ORDERS.contains(&rxn.order()) {
            warn!(
                "Reaction '{}' has order {} and will be skipped in the rate equations",
                rxn,
                rxn.order()
            );
        }
        if rxn.rate_const_value < 0.0 {
            warn!("Reaction '{}' has a negative rate constant", rxn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    #[test]
    fn test_reactions_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("network.json");
        let reactions = vec![
            ElementaryReaction::from_equation("A -> B", 1.0, "k1").unwrap(),
            ElementaryReaction::from_equation("2B -> C", 0.3, "k2")
                .unwrap()
                .with_scaling_group(4),
        ];
        save_reactions_to_file(&reactions, &path).unwrap();
        let loaded = load_reactions_from_file(&path).unwrap();
        assert_eq!(loaded, reactions);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let result = load_reactions_from_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_error_reports_position() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "[\n  {\"reactants\": [\"A\"],\n   \"products\": [\"B\"] \"rate_const_value\": 1.0}\n]").unwrap();
        match load_reactions_from_file(&path) {
            Err(LoadError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_task_and_solve() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("task.json");
        fs::write(
            &path,
            r#"{
                "reactions": [
                    {"reactants": ["A"], "products": ["B"], "rate_const_value": 2.0, "rate_const_key": "k1", "scaling_group_id": 1}
                ],
                "initial_concentrations": {"A": 1.0},
                "scaling_groups": {"1": 0.5},
                "tf": 5.0,
                "solver": {"rtol": 1e-8, "atol": 1e-10}
            }"#,
        )
        .unwrap();
        let task = load_task_from_file(&path).unwrap();
        assert_relative_eq!(task.t0, 0.0);
        assert_relative_eq!(task.tf, 5.0);
        assert_relative_eq!(task.scaling_groups[&1], 0.5);
        assert_relative_eq!(task.solver.rtol, 1e-8);

        let mut ivp = task.into_ivp().unwrap();
        ivp.solve().unwrap();
        let last = ivp.get_result().unwrap().final_concentrations();
        assert_relative_eq!(last["A"], (-5.0f64).exp(), epsilon = 1e-6);
    }

    #[test]
    fn test_load_solver_options() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("solver.json");
        fs::write(&path, r#"{"solver": "Dop853", "max_step": 0.1}"#).unwrap();
        let options = load_solver_options(&path).unwrap();
        assert_eq!(options.max_step, Some(0.1));

        fs::write(&path, r#"{"atol": -1.0}"#).unwrap();
        assert!(matches!(load_solver_options(&path), Err(LoadError::Task(_))));
    }
}
