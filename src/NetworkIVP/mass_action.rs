//! Law-of-mass-action right-hand side of the network rate equations
//!
//! ```text
//! dC_i/dt = Σ_j K1[i, j]·C_j + Σ_jk K2[i][(j, k)]·C_j·C_k
//! ```
//! The system is autonomous: time does not enter the rates.
use crate::Kinetics::network_compiler::RateConstTensors;
use nalgebra::DVector;
use ode_solvers::dop_shared::System;

/// dC/dt for concentration vector `c` in species index order
pub fn law_of_mass_action(_t: f64, c: &DVector<f64>, tensors: &RateConstTensors) -> DVector<f64> {
    let mut dc = &tensors.first_order * c;
    // contraction of K2 with the outer product C⊗C, one output species at a time
    for (i, k2) in tensors.second_order.iter().enumerate() {
        dc[i] += c.dot(&(k2 * c));
    }
    dc
}

/// adapter exposing the rate equations of a compiled network to the ODE solvers
pub struct MassActionSystem<'a> {
    tensors: &'a RateConstTensors,
}

impl<'a> MassActionSystem<'a> {
    pub fn new(tensors: &'a RateConstTensors) -> Self {
        Self { tensors }
    }
}

impl System<f64, DVector<f64>> for MassActionSystem<'_> {
    fn system(&self, t: f64, y: &DVector<f64>, dy: &mut DVector<f64>) {
        dy.copy_from(&law_of_mass_action(t, y, self.tensors));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_order_contribution() {
        // A -> B with k = 2
        let mut tensors = RateConstTensors::zeros(2);
        tensors.first_order[(0, 0)] = -2.0;
        tensors.first_order[(1, 0)] = 2.0;
        let c = DVector::from_vec(vec![3.0, 1.0]);
        let dc = law_of_mass_action(0.0, &c, &tensors);
        assert_relative_eq!(dc[0], -6.0);
        assert_relative_eq!(dc[1], 6.0);
    }

    #[test]
    fn test_second_order_contribution() {
        // A + B -> C with k = 0.5
        let mut tensors = RateConstTensors::zeros(3);
        tensors.second_order[0][(0, 1)] = -0.5;
        tensors.second_order[1][(0, 1)] = -0.5;
        tensors.second_order[2][(0, 1)] = 0.5;
        let c = DVector::from_vec(vec![2.0, 4.0, 0.0]);
        let dc = law_of_mass_action(0.0, &c, &tensors);
        assert_relative_eq!(dc[0], -4.0);
        assert_relative_eq!(dc[1], -4.0);
        assert_relative_eq!(dc[2], 4.0);
    }

    #[test]
    fn test_system_adapter_matches_rhs() {
        let mut tensors = RateConstTensors::zeros(2);
        tensors.first_order[(1, 0)] = 1.0;
        tensors.second_order[0][(0, 0)] = -3.0;
        let c = DVector::from_vec(vec![2.0, 0.0]);
        let system = MassActionSystem::new(&tensors);
        let mut dy = DVector::zeros(2);
        system.system(1.0, &c, &mut dy);
        assert_eq!(dy, law_of_mass_action(5.0, &c, &tensors));
        assert_relative_eq!(dy[0], -12.0);
        assert_relative_eq!(dy[1], 2.0);
    }

    #[test]
    fn test_empty_network() {
        let tensors = RateConstTensors::zeros(0);
        let c = DVector::<f64>::zeros(0);
        assert_eq!(law_of_mass_action(0.0, &c, &tensors).len(), 0);
    }
}
