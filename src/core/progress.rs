//! Accumulated play state used to resolve prerequisites.
//!
//! The analyzer, the simulator and any live game tracker share these
//! satisfaction rules, so they live in one place.

use rustc_hash::FxHashSet;

use crate::schema::ids::{ItemId, OutcomeId, TaskId};
use crate::schema::prerequisite::Prerequisite;
use crate::schema::task::Task;

#[derive(Debug, Clone, Default)]
pub struct Progress {
    pub completed: FxHashSet<TaskId>,
    pub outcomes: FxHashSet<OutcomeId>,
    pub items: FxHashSet<ItemId>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_satisfied(&self, prereq: &Prerequisite) -> bool {
        match prereq {
            Prerequisite::Task(id) => self.completed.contains(id),
            Prerequisite::Outcome(id) => self.outcomes.contains(id),
            Prerequisite::Item(id) => self.items.contains(id),
        }
    }

    /// Conjunctive: every prerequisite must hold.
    pub fn all_satisfied(&self, prereqs: &[Prerequisite]) -> bool {
        prereqs.iter().all(|p| self.is_satisfied(p))
    }

    /// True if `task` is not yet done and all of its prerequisites hold.
    pub fn is_available(&self, task: &Task) -> bool {
        !self.completed.contains(&task.id) && self.all_satisfied(&task.prerequisites)
    }

    /// Marks `task` done and records what it yields. Returns false if it
    /// was already complete.
    pub fn complete(&mut self, task: &Task) -> bool {
        if !self.completed.insert(task.id.clone()) {
            return false;
        }
        self.outcomes.extend(task.provided_outcomes().iter().cloned());
        self.items.extend(task.found_items().iter().cloned());
        true
    }

    pub fn is_complete(&self, task: &TaskId) -> bool {
        self.completed.contains(task)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ids::{LocationId, NpcId, RoleId};
    use crate::schema::task::TaskKind;

    fn talk_task() -> Task {
        Task {
            id: TaskId::from("G1"),
            role: RoleId::from("grifter"),
            location: LocationId::from("lobby"),
            description: String::new(),
            prerequisites: Vec::new(),
            kind: TaskKind::Conversation {
                npc: NpcId::from("manager"),
                target_outcomes: vec![OutcomeId::from("manager_action_1")],
            },
        }
    }

    #[test]
    fn completing_records_outcomes() {
        let mut progress = Progress::new();
        let task = talk_task();
        assert!(progress.is_available(&task));
        assert!(progress.complete(&task));
        assert!(!progress.complete(&task));
        assert!(!progress.is_available(&task));
        assert!(progress.is_satisfied(&Prerequisite::task("G1")));
        assert!(progress.is_satisfied(&Prerequisite::outcome("manager_action_1")));
        assert_eq!(progress.completed_count(), 1);
    }

    #[test]
    fn all_satisfied_is_conjunctive() {
        let mut progress = Progress::new();
        progress.complete(&talk_task());
        let prereqs = vec![Prerequisite::task("G1"), Prerequisite::item("item_2")];
        assert!(!progress.all_satisfied(&prereqs));
        progress.items.insert(ItemId::from("item_2"));
        assert!(progress.all_satisfied(&prereqs));
        assert!(progress.all_satisfied(&[]));
    }
}
