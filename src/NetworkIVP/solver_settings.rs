//! Configuration of the adaptive ODE solver used to integrate reaction networks.
//!
//! Options can be set field by field, from a map of named parameters in the same style as
//! the other task structs of the crate (`"rtol" => SolverParam::Float(1e-6)`), or deserialized from JSON.
use crate::NetworkIVP::integrator::IntegrationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// explicit Runge-Kutta methods with adaptive step size control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolverKind {
    /// Dormand-Prince 5(4)
    #[default]
    Dopri5,
    /// Dormand-Prince 8(5,3)
    Dop853,
}

impl FromStr for SolverKind {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dopri5" | "rk45" => Ok(SolverKind::Dopri5),
            "dop853" => Ok(SolverKind::Dop853),
            _ => Err(IntegrationError::InvalidSolverParam(format!(
                "unknown solver '{}'",
                s
            ))),
        }
    }
}

/// value of a named solver parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SolverParam {
    Float(f64),
    Int(usize),
    OptionalFloat(Option<f64>),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverOptions {
    pub solver: SolverKind,
    /// relative tolerance
    pub rtol: f64,
    /// absolute tolerance
    pub atol: f64,
    /// maximal step size, the whole time span if None
    pub max_step: Option<f64>,
    /// initial step size, estimated by the solver if None
    pub first_step: Option<f64>,
    /// maximal number of steps
    pub max_iterations: u32,
    /// interval of dense output; every accepted step is reported if None
    pub output_step: Option<f64>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            solver: SolverKind::Dopri5,
            rtol: 1e-6,
            atol: 1e-9,
            max_step: None,
            first_step: None,
            max_iterations: 100000,
            output_step: None,
        }
    }
}

impl SolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets options from named parameters. Recognised names: `solver`, `rtol`, `atol`, `max_step`,
    /// `first_step`, `max_iterations`, `output_step`. Unknown names are rejected.
    pub fn set_params(&mut self, params: HashMap<String, SolverParam>) -> Result<(), IntegrationError> {
        let mut updated = self.clone();
        for (name, value) in params {
            match (name.as_str(), value) {
                ("solver", SolverParam::Str(s)) => updated.solver = s.parse()?,
                ("rtol", SolverParam::Float(v)) => updated.rtol = v,
                ("atol", SolverParam::Float(v)) => updated.atol = v,
                ("max_step", SolverParam::Float(v)) => updated.max_step = Some(v),
                ("max_step", SolverParam::OptionalFloat(v)) => updated.max_step = v,
                ("first_step", SolverParam::Float(v)) => updated.first_step = Some(v),
                ("first_step", SolverParam::OptionalFloat(v)) => updated.first_step = v,
                ("output_step", SolverParam::Float(v)) => updated.output_step = Some(v),
                ("output_step", SolverParam::OptionalFloat(v)) => updated.output_step = v,
                ("max_iterations", SolverParam::Int(n)) => {
                    updated.max_iterations = u32::try_from(n).map_err(|_| {
                        IntegrationError::InvalidSolverParam(format!(
                            "max_iterations={} is too large",
                            n
                        ))
                    })?
                }
                (name, value) => {
                    return Err(IntegrationError::InvalidSolverParam(format!(
                        "unsupported parameter {}={:?}",
                        name, value
                    )));
                }
            }
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), IntegrationError> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(IntegrationError::InvalidSolverParam(format!(
                    "{} must be positive, got {}",
                    name, v
                )))
            }
        };
        positive("rtol", self.rtol)?;
        positive("atol", self.atol)?;
        if let Some(v) = self.max_step {
            positive("max_step", v)?;
        }
        if let Some(v) = self.first_step {
            positive("first_step", v)?;
        }
        if let Some(v) = self.output_step {
            positive("output_step", v)?;
        }
        if self.max_iterations == 0 {
            return Err(IntegrationError::InvalidSolverParam(
                "max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, IntegrationError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_options_are_valid() {
        let options = SolverOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.solver, SolverKind::Dopri5);
        assert_eq!(options.max_step, None);
    }

    #[test]
    fn test_set_params() {
        let mut options = SolverOptions::new();
        let params = HashMap::from([
            ("rtol".to_owned(), SolverParam::Float(1e-4)),
            ("atol".to_owned(), SolverParam::Float(1e-7)),
            ("max_step".to_owned(), SolverParam::Float(0.1)),
            ("first_step".to_owned(), SolverParam::OptionalFloat(None)),
            ("max_iterations".to_owned(), SolverParam::Int(500)),
            ("solver".to_owned(), SolverParam::Str("DOP853".to_owned())),
        ]);
        options.set_params(params).unwrap();
        assert_relative_eq!(options.rtol, 1e-4);
        assert_relative_eq!(options.atol, 1e-7);
        assert_eq!(options.max_step, Some(0.1));
        assert_eq!(options.first_step, None);
        assert_eq!(options.max_iterations, 500);
        assert_eq!(options.solver, SolverKind::Dop853);
    }

    #[test]
    fn test_set_params_rejects_unknown_and_invalid() {
        let mut options = SolverOptions::new();
        let unknown = HashMap::from([("jac_sparsity".to_owned(), SolverParam::Float(1.0))]);
        assert!(matches!(
            options.set_params(unknown),
            Err(IntegrationError::InvalidSolverParam(_))
        ));
        let wrong_kind = HashMap::from([("rtol".to_owned(), SolverParam::Int(1))]);
        assert!(options.set_params(wrong_kind).is_err());
        let negative = HashMap::from([("atol".to_owned(), SolverParam::Float(-1.0))]);
        assert!(options.set_params(negative).is_err());
        // failed updates leave the options untouched
        assert_eq!(options, SolverOptions::default());
    }

    #[test]
    fn test_from_json_str() {
        let options =
            SolverOptions::from_json_str(r#"{"solver": "Dop853", "rtol": 1e-8, "output_step": 0.5}"#)
                .unwrap();
        assert_eq!(options.solver, SolverKind::Dop853);
        assert_relative_eq!(options.rtol, 1e-8);
        assert_relative_eq!(options.atol, 1e-9);
        assert_eq!(options.output_step, Some(0.5));
        assert!(SolverOptions::from_json_str(r#"{"tolerance": 1e-3}"#).is_err());
        assert!(SolverOptions::from_json_str(r#"{"rtol": 0.0}"#).is_err());
    }
}
