use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::ids::{ItemId, OutcomeId, TaskId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrerequisiteParseError {
    #[error("expected '<type>:<id>', got '{0}'")]
    MissingSeparator(String),
    #[error("unknown prerequisite type '{0}' (expected task, outcome or item)")]
    UnknownType(String),
    #[error("empty id in prerequisite '{0}'")]
    EmptyId(String),
}

/// A single condition that must hold before a task can be played or a
/// hidden item can be discovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prerequisite {
    /// Another task has been completed.
    Task(TaskId),
    /// Some conversation has yielded this outcome.
    Outcome(OutcomeId),
    /// Some search has turned up this item.
    Item(ItemId),
}

impl Prerequisite {
    pub fn task(id: impl Into<String>) -> Self {
        Self::Task(TaskId::new(id))
    }

    pub fn outcome(id: impl Into<String>) -> Self {
        Self::Outcome(OutcomeId::new(id))
    }

    pub fn item(id: impl Into<String>) -> Self {
        Self::Item(ItemId::new(id))
    }

    /// Returns the task id if this is a task prerequisite.
    pub fn as_task(&self) -> Option<&TaskId> {
        match self {
            Self::Task(id) => Some(id),
            _ => None,
        }
    }

    /// The `type` half of the `type:id` text form.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Task(_) => "task",
            Self::Outcome(_) => "outcome",
            Self::Item(_) => "item",
        }
    }

    pub fn id_str(&self) -> &str {
        match self {
            Self::Task(id) => id.as_str(),
            Self::Outcome(id) => id.as_str(),
            Self::Item(id) => id.as_str(),
        }
    }
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind_label(), self.id_str())
    }
}

impl FromStr for Prerequisite {
    type Err = PrerequisiteParseError;

    /// Parses the `task:MM1` / `outcome:janitor_info_1` / `item:item_3` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| PrerequisiteParseError::MissingSeparator(s.to_string()))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(PrerequisiteParseError::EmptyId(s.to_string()));
        }
        match kind.trim() {
            "task" => Ok(Self::task(id)),
            "outcome" => Ok(Self::outcome(id)),
            "item" => Ok(Self::item(id)),
            other => Err(PrerequisiteParseError::UnknownType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_each_kind() {
        assert_eq!("task:MM1".parse(), Ok(Prerequisite::task("MM1")));
        assert_eq!(
            "outcome:janitor_info_1".parse(),
            Ok(Prerequisite::outcome("janitor_info_1"))
        );
        assert_eq!("item:item_3".parse(), Ok(Prerequisite::item("item_3")));
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            "MM1".parse::<Prerequisite>(),
            Err(PrerequisiteParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            "npc:guard".parse::<Prerequisite>(),
            Err(PrerequisiteParseError::UnknownType(_))
        ));
        assert!(matches!(
            "task:".parse::<Prerequisite>(),
            Err(PrerequisiteParseError::EmptyId(_))
        ));
    }

    #[test]
    fn display_matches_text_form() {
        assert_eq!(Prerequisite::outcome("guard_action_2").to_string(), "outcome:guard_action_2");
        assert_eq!(Prerequisite::task("SC4").as_task(), Some(&TaskId::from("SC4")));
        assert_eq!(Prerequisite::item("item_1").as_task(), None);
    }
}
