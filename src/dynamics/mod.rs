//! Simulation dynamics: velocity/position integration and the contact solver.

pub mod integrator;
pub mod solver;

pub use integrator::{Integrator, SolverBody};
pub use solver::ContactSolver;
