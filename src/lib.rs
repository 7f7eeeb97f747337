//! Scenario Forge — procedural task graphs for cooperative heist games.
//!
//! Generates a scenario graph of roles, locations, items, NPCs and
//! interlocking tasks, repairs what deterministic fixes can repair, then
//! proves the result playable with static graph analysis and a turn-based
//! dry run.

pub mod core;
pub mod schema;
