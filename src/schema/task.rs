//! Tasks, the playable nodes of a scenario graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ItemId, LocationId, MinigameId, NpcId, OutcomeId, RoleId, TaskId};
use super::prerequisite::Prerequisite;

/// Type-specific payload of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskKind {
    /// A skill game drawn from the role's catalog entry.
    Minigame { minigame: MinigameId },
    /// Talk to an NPC to obtain some of its outcomes.
    Conversation {
        npc: NpcId,
        target_outcomes: Vec<OutcomeId>,
    },
    /// Search the task's location for items.
    Search { items: Vec<ItemId> },
    /// Physically pass an item to another role.
    Handoff {
        item: Option<ItemId>,
        to_role: RoleId,
    },
    /// Relay something learned to the rest of the crew.
    InfoShare { outcome: Option<OutcomeId> },
}

/// Discriminant of [`TaskKind`], used for weights, reporting and conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Minigame,
    Conversation,
    Search,
    Handoff,
    InfoShare,
}

impl TaskType {
    pub const ALL: [TaskType; 5] = [
        TaskType::Minigame,
        TaskType::Conversation,
        TaskType::Search,
        TaskType::Handoff,
        TaskType::InfoShare,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Minigame => "minigame",
            Self::Conversation => "npc_llm",
            Self::Search => "search",
            Self::Handoff => "item_handoff",
            Self::InfoShare => "info_share",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TaskKind {
    pub fn task_type(&self) -> TaskType {
        match self {
            Self::Minigame { .. } => TaskType::Minigame,
            Self::Conversation { .. } => TaskType::Conversation,
            Self::Search { .. } => TaskType::Search,
            Self::Handoff { .. } => TaskType::Handoff,
            Self::InfoShare { .. } => TaskType::InfoShare,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub role: RoleId,
    pub location: LocationId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prerequisites: Vec<Prerequisite>,
    pub kind: TaskKind,
}

impl Task {
    pub fn task_type(&self) -> TaskType {
        self.kind.task_type()
    }

    /// A task with no prerequisites can be played at the start of a run.
    pub fn is_starting(&self) -> bool {
        self.prerequisites.is_empty()
    }

    /// Outcomes that become achieved once this task completes.
    pub fn provided_outcomes(&self) -> &[OutcomeId] {
        match &self.kind {
            TaskKind::Conversation {
                target_outcomes, ..
            } => target_outcomes,
            _ => &[],
        }
    }

    /// Items that become collected once this task completes.
    pub fn found_items(&self) -> &[ItemId] {
        match &self.kind {
            TaskKind::Search { items } => items,
            _ => &[],
        }
    }

    pub fn searches_for(&self, item: &ItemId) -> bool {
        self.found_items().contains(item)
    }

    /// True if completing this task satisfies `prereq`.
    pub fn satisfies(&self, prereq: &Prerequisite) -> bool {
        match prereq {
            Prerequisite::Task(id) => &self.id == id,
            Prerequisite::Outcome(outcome) => self.provided_outcomes().contains(outcome),
            Prerequisite::Item(item) => self.searches_for(item),
        }
    }
}

/// Why a task was turned into a different kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionReason {
    /// A search task's location had nothing left to find.
    NoUnclaimedItems,
    /// No NPC with tracked outcomes existed for a conversation.
    NoNpcOutcomes,
    /// A handoff had no other role or no found item to pass.
    NoHandoffItem,
    /// An info-share had no achieved outcome to relay.
    NoSharedInfo,
    /// The fixer found a handoff pointing at an item that does not exist.
    HandoffItemMissing,
}

impl ConversionReason {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::NoUnclaimedItems => "no unclaimed items at location",
            Self::NoNpcOutcomes => "no NPC outcomes available",
            Self::NoHandoffItem => "no item or recipient for handoff",
            Self::NoSharedInfo => "no achieved outcome to share",
            Self::HandoffItemMissing => "handoff item does not exist",
        }
    }
}

/// A recorded `TaskKind` change made during generation or repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindConversion {
    pub task: TaskId,
    pub from: TaskType,
    pub to: TaskType,
    pub reason: ConversionReason,
}

impl fmt::Display for KindConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {} ({})",
            self.task,
            self.from,
            self.to,
            self.reason.describe()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(kind: TaskKind, prerequisites: Vec<Prerequisite>) -> Task {
        Task {
            id: TaskId::from("H2"),
            role: RoleId::from("hacker"),
            location: LocationId::from("server_room"),
            description: String::new(),
            prerequisites,
            kind,
        }
    }

    #[test]
    fn conversation_provides_target_outcomes() {
        let task = make_task(
            TaskKind::Conversation {
                npc: NpcId::from("janitor"),
                target_outcomes: vec![OutcomeId::from("janitor_info_1")],
            },
            vec![Prerequisite::task("H1")],
        );
        assert!(!task.is_starting());
        assert!(task.satisfies(&Prerequisite::outcome("janitor_info_1")));
        assert!(task.satisfies(&Prerequisite::task("H2")));
        assert!(!task.satisfies(&Prerequisite::item("item_1")));
        assert!(task.found_items().is_empty());
    }

    #[test]
    fn search_provides_found_items() {
        let task = make_task(
            TaskKind::Search {
                items: vec![ItemId::from("item_1"), ItemId::from("item_2")],
            },
            Vec::new(),
        );
        assert!(task.is_starting());
        assert!(task.searches_for(&ItemId::from("item_2")));
        assert!(task.satisfies(&Prerequisite::item("item_1")));
        assert!(task.provided_outcomes().is_empty());
    }

    #[test]
    fn conversion_display() {
        let conversion = KindConversion {
            task: TaskId::from("SC3"),
            from: TaskType::Search,
            to: TaskType::Minigame,
            reason: ConversionReason::NoUnclaimedItems,
        };
        assert_eq!(
            conversion.to_string(),
            "SC3: search -> minigame (no unclaimed items at location)"
        );
    }
}
