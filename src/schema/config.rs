//! Generator configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::graph::location_band;
use super::task::TaskType;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid range for {field}: ({min}, {max})")]
    InvalidRange {
        field: &'static str,
        min: usize,
        max: usize,
    },
    #[error("hidden_item_ratio must be within [0, 1], got {0}")]
    InvalidRatio(f64),
    #[error("task type weights must be non-negative with a positive total")]
    InvalidWeights,
}

/// Relative likelihood of each task type for non-starting tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTypeWeights {
    pub minigame: f64,
    pub conversation: f64,
    pub search: f64,
    pub handoff: f64,
    pub info_share: f64,
}

impl Default for TaskTypeWeights {
    fn default() -> Self {
        Self {
            minigame: 0.30,
            conversation: 0.30,
            search: 0.20,
            handoff: 0.10,
            info_share: 0.10,
        }
    }
}

impl TaskTypeWeights {
    pub fn weight(&self, task_type: TaskType) -> f64 {
        match task_type {
            TaskType::Minigame => self.minigame,
            TaskType::Conversation => self.conversation,
            TaskType::Search => self.search,
            TaskType::Handoff => self.handoff,
            TaskType::InfoShare => self.info_share,
        }
    }

    /// Weights in `TaskType::ALL` order.
    pub fn as_array(&self) -> [f64; 5] {
        TaskType::ALL.map(|t| self.weight(t))
    }

    fn is_valid(&self) -> bool {
        let weights = self.as_array();
        weights.iter().all(|w| w.is_finite() && *w >= 0.0) && weights.iter().sum::<f64>() > 0.0
    }
}

/// Numeric knobs for the procedural generator. Ranges are inclusive
/// `(min, max)` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub location_count: (usize, usize),
    pub items_per_location: (usize, usize),
    pub npc_count: (usize, usize),
    pub tasks_per_role: (usize, usize),
    pub hidden_item_ratio: f64,
    pub task_type_weights: TaskTypeWeights,
    pub timeline_minutes: u32,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            location_count: (4, 8),
            items_per_location: (1, 3),
            npc_count: (2, 4),
            tasks_per_role: (3, 6),
            hidden_item_ratio: 0.3,
            task_type_weights: TaskTypeWeights::default(),
            timeline_minutes: 120,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Default knobs with the location range clamped into the band for
    /// `players` players.
    pub fn for_player_count(players: usize) -> Self {
        let band = location_band(players);
        Self {
            location_count: (*band.start(), *band.end()),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ranges = [
            ("location_count", self.location_count, 1),
            ("items_per_location", self.items_per_location, 0),
            ("npc_count", self.npc_count, 0),
            ("tasks_per_role", self.tasks_per_role, 1),
        ];
        for (field, (min, max), floor) in ranges {
            if min > max || min < floor {
                return Err(ConfigError::InvalidRange { field, min, max });
            }
        }
        if !(0.0..=1.0).contains(&self.hidden_item_ratio) {
            return Err(ConfigError::InvalidRatio(self.hidden_item_ratio));
        }
        if !self.task_type_weights.is_valid() {
            return Err(ConfigError::InvalidWeights);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(GeneratorConfig::default().validate().is_ok());
    }

    #[test]
    fn player_count_config_stays_in_band() {
        let config = GeneratorConfig::for_player_count(5);
        assert_eq!(config.location_count, (6, 9));
        assert_eq!(config.tasks_per_role, (3, 6));
    }

    #[test]
    fn rejects_inverted_range() {
        let config = GeneratorConfig {
            npc_count: (4, 2),
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { field: "npc_count", .. })
        ));
    }

    #[test]
    fn rejects_bad_ratio_and_weights() {
        let config = GeneratorConfig {
            hidden_item_ratio: 1.5,
            ..GeneratorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRatio(_))));

        let config = GeneratorConfig {
            task_type_weights: TaskTypeWeights {
                minigame: 0.0,
                conversation: 0.0,
                search: 0.0,
                handoff: 0.0,
                info_share: 0.0,
            },
            ..GeneratorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWeights)));
    }

    #[test]
    fn parse_partial_ron_uses_defaults() {
        let config = GeneratorConfig::parse_ron("(tasks_per_role: (4, 5), seed: Some(7))").unwrap();
        assert_eq!(config.tasks_per_role, (4, 5));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.npc_count, (2, 4));
    }

    #[test]
    fn bundled_config_parses() {
        let config =
            GeneratorConfig::load_from_ron(Path::new("scenario_data/heist/generator.ron")).unwrap();
        assert!(config.validate().is_ok());
    }
}
