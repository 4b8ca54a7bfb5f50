pub mod basis_evaluation;
pub mod coarsening;
pub mod hierarchisation;
pub mod integration;
pub mod operations;
pub mod refinement;
pub mod sweep;
pub mod updown;
