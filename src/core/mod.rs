pub mod analyzer;
pub mod enrich;
pub mod fixer;
pub mod generator;
pub mod pipeline;
pub mod progress;
pub mod prose;
pub mod report;
pub mod simulator;
pub mod validator;
