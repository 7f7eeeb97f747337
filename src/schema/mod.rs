pub mod catalog;
pub mod config;
pub mod graph;
pub mod ids;
pub mod prerequisite;
pub mod task;
pub mod template;
pub mod world;
