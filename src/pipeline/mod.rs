// Data preparation pipeline: cleaning stages and their orchestration

pub mod orchestrator;
pub mod processing;

pub use orchestrator::{Pipeline, PreparedData};
