pub mod flat_rate;
pub mod simulation;
