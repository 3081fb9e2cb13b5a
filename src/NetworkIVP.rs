//! # Reaction Network Initial Value Problem (IVP) Module
//!
//! Integrates the rate equations of a compiled reaction network forward in time.
//!
//! ## Mathematical Model
//!
//! For the concentration vector `C` of `n` species (ordered by the species index of the network):
//! ```text
//! dC/dt = K1·C + K2:(C⊗C)
//! ```
//! where `K1` (n×n) collects the signed, scaled first-order rate constants and `K2` (n×n×n) the
//! second-order ones. Species without an initial concentration start at 0.
//!
//! ## Numerical Solution
//!
//! Explicit adaptive Runge-Kutta methods (Dormand-Prince 5(4) and 8(5,3)) from the
//! [ode_solvers](https://crates.io/crates/ode_solvers) package. Tolerances, step limits and the
//! output mode are configured with [`solver_settings::SolverOptions`].

/// right-hand side of the law of mass action
pub mod mass_action;
pub mod solver_settings;
/// integration of compiled networks and the task struct
pub mod integrator;
