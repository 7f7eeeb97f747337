//! The scenario graph aggregate.
//!
//! `ScenarioGraph` owns every entity of one generated scenario. All
//! cross-references are typed ids resolved through the lookups here.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use super::ids::{ItemId, LocationId, NpcId, OutcomeId, RoleId, TaskId};
use super::task::{KindConversion, Task};
use super::world::{Item, Location, Npc};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioGraph {
    pub scenario_id: String,
    pub objective: String,
    /// The roster, in the order the scenario was requested with.
    pub roles: Vec<RoleId>,
    pub locations: Vec<Location>,
    pub items: Vec<Item>,
    pub npcs: Vec<Npc>,
    pub tasks: Vec<Task>,
    pub timeline_minutes: u32,
    /// Kind changes made by the generator or fixer.
    #[serde(default)]
    pub conversions: Vec<KindConversion>,
}

/// Allowed location count for a given number of players.
pub fn location_band(player_count: usize) -> RangeInclusive<usize> {
    match player_count {
        2..=3 => 4..=6,
        4..=5 => 6..=9,
        6..=8 => 8..=12,
        9..=12 => 10..=15,
        _ => 4..=15,
    }
}

/// Allowed task count for a given number of players.
pub fn task_band(player_count: usize) -> RangeInclusive<usize> {
    let p = player_count.max(1);
    (3 * p).max(6)..=(12 * p)
}

impl ScenarioGraph {
    pub fn player_count(&self) -> usize {
        self.roles.len()
    }

    pub fn location_band(&self) -> RangeInclusive<usize> {
        location_band(self.player_count())
    }

    pub fn task_band(&self) -> RangeInclusive<usize> {
        task_band(self.player_count())
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }

    pub fn location(&self, id: &LocationId) -> Option<&Location> {
        self.locations.iter().find(|l| &l.id == id)
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|i| &i.id == id)
    }

    pub fn item_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| &i.id == id)
    }

    pub fn npc(&self, id: &NpcId) -> Option<&Npc> {
        self.npcs.iter().find(|n| &n.id == id)
    }

    pub fn has_task(&self, id: &TaskId) -> bool {
        self.task(id).is_some()
    }

    pub fn has_location(&self, id: &LocationId) -> bool {
        self.location(id).is_some()
    }

    pub fn has_item(&self, id: &ItemId) -> bool {
        self.item(id).is_some()
    }

    /// True if any NPC lists this outcome.
    pub fn has_outcome(&self, id: &OutcomeId) -> bool {
        self.outcome_owner(id).is_some()
    }

    /// The NPC whose outcome set contains `id`.
    pub fn outcome_owner(&self, id: &OutcomeId) -> Option<&Npc> {
        self.npcs.iter().find(|n| n.provides(id))
    }

    /// Tasks assigned to `role`, in graph order.
    pub fn tasks_for_role<'a>(&'a self, role: &'a RoleId) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| &t.role == role)
    }

    pub fn starting_tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter().filter(|t| t.is_starting())
    }

    /// Roles that own at least one task, in order of first appearance.
    pub fn assigned_roles(&self) -> Vec<RoleId> {
        let mut roles: Vec<RoleId> = Vec::new();
        for task in &self.tasks {
            if !roles.contains(&task.role) {
                roles.push(task.role.clone());
            }
        }
        roles
    }

    /// Roster roles first, then any role that only appears on tasks.
    pub fn all_roles(&self) -> Vec<RoleId> {
        let mut roles = self.roles.clone();
        for role in self.assigned_roles() {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ids::MinigameId;
    use crate::schema::prerequisite::Prerequisite;
    use crate::schema::task::TaskKind;

    fn minigame_task(id: &str, role: &str, prerequisites: Vec<Prerequisite>) -> Task {
        Task {
            id: TaskId::from(id),
            role: RoleId::from(role),
            location: LocationId::from("vault"),
            description: String::new(),
            prerequisites,
            kind: TaskKind::Minigame {
                minigame: MinigameId::from("safe_cracking"),
            },
        }
    }

    fn make_graph() -> ScenarioGraph {
        ScenarioGraph {
            scenario_id: "test".to_string(),
            objective: "Crack the vault".to_string(),
            roles: vec![RoleId::from("safe_cracker"), RoleId::from("hacker")],
            locations: Vec::new(),
            items: Vec::new(),
            npcs: Vec::new(),
            tasks: vec![
                minigame_task("SC1", "safe_cracker", Vec::new()),
                minigame_task("SC2", "safe_cracker", vec![Prerequisite::task("SC1")]),
                minigame_task("M1", "muscle", Vec::new()),
            ],
            timeline_minutes: 120,
            conversions: Vec::new(),
        }
    }

    #[test]
    fn bands_widen_with_players() {
        assert_eq!(location_band(2), 4..=6);
        assert_eq!(location_band(5), 6..=9);
        assert_eq!(location_band(8), 8..=12);
        assert_eq!(location_band(12), 10..=15);
        assert_eq!(task_band(3), 9..=36);
    }

    #[test]
    fn bands_outside_the_supported_crew_sizes() {
        assert_eq!(location_band(1), 4..=15);
        assert_eq!(location_band(13), 4..=15);
        assert_eq!(task_band(1), 6..=12);
        assert_eq!(task_band(2), 6..=24);
    }

    #[test]
    fn role_queries() {
        let graph = make_graph();
        let sc = RoleId::from("safe_cracker");
        assert_eq!(graph.tasks_for_role(&sc).count(), 2);
        assert_eq!(graph.starting_tasks().count(), 2);
        assert_eq!(
            graph.all_roles(),
            vec![
                RoleId::from("safe_cracker"),
                RoleId::from("hacker"),
                RoleId::from("muscle"),
            ]
        );
    }

    #[test]
    fn lookups() {
        let graph = make_graph();
        assert!(graph.has_task(&TaskId::from("SC2")));
        assert!(!graph.has_task(&TaskId::from("H1")));
        assert!(!graph.has_outcome(&OutcomeId::from("guard_info_1")));
    }
}
