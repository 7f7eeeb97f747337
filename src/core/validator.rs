//! Structural checks over a scenario graph.
//!
//! Violations are values, not errors: the fixer consumes them and the
//! report turns whatever is left into issues.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::catalog::RoleCatalog;
use crate::schema::graph::ScenarioGraph;
use crate::schema::ids::{ItemId, LocationId, MinigameId, NpcId, OutcomeId, RoleId, TaskId};
use crate::schema::prerequisite::Prerequisite;
use crate::schema::task::TaskKind;

/// Roles with fewer tasks than this are flagged.
pub const MIN_TASKS_PER_ROLE: usize = 2;
/// Roles with more tasks than this are flagged.
pub const MAX_TASKS_PER_ROLE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Blocks use of the graph.
    Critical,
    /// Usable but degraded.
    Important,
    /// Polish.
    Advisory,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Important => "IMPORTANT",
            Self::Advisory => "ADVISORY",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// A dangling id.
    Reference,
    /// An out-of-band count.
    Count,
    /// Entities that exist but disagree with each other.
    Consistency,
    /// Cycles, orphans and dead ends. Found by the analyzer only.
    Graph,
    /// Deadlock, idling and skew. Found by the simulator only.
    Playability,
}

impl ErrorClass {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Count => "count",
            Self::Consistency => "consistency",
            Self::Graph => "graph",
            Self::Playability => "playability",
        }
    }
}

/// Who holds a prerequisite list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrereqOwner {
    Task(TaskId),
    /// The item's unlock list.
    Item(ItemId),
}

impl fmt::Display for PrereqOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(id) => write!(f, "task {id}"),
            Self::Item(id) => write!(f, "item {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Violation {
    LocationCount { found: usize, min: usize, max: usize },
    TaskCount { found: usize, min: usize, max: usize },
    MalformedTaskId { task: TaskId },
    DuplicateTaskId { task: TaskId },
    TaskLocationMissing { task: TaskId, location: LocationId },
    ItemLocationMissing { item: ItemId, location: LocationId },
    NpcLocationMissing { npc: NpcId, location: LocationId },
    TaskNpcMissing { task: TaskId, npc: NpcId },
    TargetOutcomeMismatch { task: TaskId, npc: NpcId, outcome: OutcomeId },
    DanglingPrerequisite { owner: PrereqOwner, prereq: Prerequisite },
    SearchItemMissing { task: TaskId, item: ItemId },
    HandoffItemMissing { task: TaskId, item: Option<ItemId> },
    InfoShareOutcomeMissing { task: TaskId, outcome: OutcomeId },
    HiddenItemWithoutUnlock { item: ItemId },
    HiddenItemSelfUnlock { item: ItemId, task: TaskId },
    RoleWithoutStartingTask { role: RoleId },
    RoleTooFewTasks { role: RoleId, count: usize },
    RoleTooManyTasks { role: RoleId, count: usize },
    InvalidMinigame { task: TaskId, role: RoleId, minigame: MinigameId },
}

impl Violation {
    pub fn severity(&self) -> Severity {
        match self {
            Self::TaskCount { .. } | Self::RoleTooFewTasks { .. } => Severity::Important,
            Self::RoleTooManyTasks { .. } => Severity::Advisory,
            _ => Severity::Critical,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity() == Severity::Critical
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::LocationCount { .. }
            | Self::TaskCount { .. }
            | Self::RoleTooFewTasks { .. }
            | Self::RoleTooManyTasks { .. } => ErrorClass::Count,
            Self::TargetOutcomeMismatch { .. }
            | Self::HiddenItemWithoutUnlock { .. }
            | Self::HiddenItemSelfUnlock { .. }
            | Self::RoleWithoutStartingTask { .. }
            | Self::MalformedTaskId { .. }
            | Self::DuplicateTaskId { .. } => ErrorClass::Consistency,
            _ => ErrorClass::Reference,
        }
    }

    /// Rule number used when the violation is reported.
    pub fn rule(&self) -> u32 {
        match self {
            Self::InvalidMinigame { .. } => 1,
            Self::MalformedTaskId { .. } | Self::DuplicateTaskId { .. } => 2,
            Self::TaskCount { .. } => 4,
            Self::LocationCount { .. } => 5,
            Self::TaskNpcMissing { .. } => 10,
            Self::SearchItemMissing { .. } => 11,
            Self::TaskLocationMissing { .. }
            | Self::ItemLocationMissing { .. }
            | Self::NpcLocationMissing { .. } => 12,
            Self::TargetOutcomeMismatch { .. } | Self::InfoShareOutcomeMissing { .. } => 13,
            Self::DanglingPrerequisite { prereq, .. } => match prereq {
                Prerequisite::Task(_) => 25,
                Prerequisite::Outcome(_) => 13,
                Prerequisite::Item(_) => 11,
            },
            Self::RoleTooFewTasks { .. } | Self::RoleTooManyTasks { .. } => 14,
            Self::HiddenItemWithoutUnlock { .. } | Self::HiddenItemSelfUnlock { .. } => 25,
            Self::RoleWithoutStartingTask { .. } => 29,
            Self::HandoffItemMissing { .. } => 40,
        }
    }

    /// Short heading shared by all violations of the same kind.
    pub fn title(&self) -> &'static str {
        match self {
            Self::LocationCount { .. } => "Location Count Out of Range",
            Self::TaskCount { .. } => "Task Count Out of Range",
            Self::MalformedTaskId { .. } => "Invalid Task ID Format",
            Self::DuplicateTaskId { .. } => "Duplicate Task IDs",
            Self::TaskLocationMissing { .. }
            | Self::ItemLocationMissing { .. }
            | Self::NpcLocationMissing { .. } => "Invalid Location References",
            Self::TaskNpcMissing { .. } => "Invalid NPC References",
            Self::TargetOutcomeMismatch { .. } => "Invalid Target Outcomes in NPC Tasks",
            Self::DanglingPrerequisite { .. } => "Dangling Prerequisites",
            Self::SearchItemMissing { .. } => "Invalid Item References",
            Self::HandoffItemMissing { .. } => "Handoff Task Missing Item",
            Self::InfoShareOutcomeMissing { .. } => "Invalid Shared Outcomes",
            Self::HiddenItemWithoutUnlock { .. } => "Hidden Items Without Unlock Conditions",
            Self::HiddenItemSelfUnlock { .. } => "Hidden Items Unlocked By Their Own Search",
            Self::RoleWithoutStartingTask { .. } => "Roles Without Starting Tasks",
            Self::RoleTooFewTasks { .. } | Self::RoleTooManyTasks { .. } => {
                "Unbalanced Role Distribution"
            }
            Self::InvalidMinigame { .. } => "Invalid Minigame IDs",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocationCount { found, min, max } => {
                write!(f, "expected {min}-{max} locations, found {found}")
            }
            Self::TaskCount { found, min, max } => {
                write!(f, "expected {min}-{max} tasks, found {found}")
            }
            Self::MalformedTaskId { task } => {
                write!(f, "{task}: id must be 1-3 capitals, digits, optional lowercase letter")
            }
            Self::DuplicateTaskId { task } => write!(f, "{task}: id used by more than one task"),
            Self::TaskLocationMissing { task, location } => {
                write!(f, "{task}: unknown location '{location}'")
            }
            Self::ItemLocationMissing { item, location } => {
                write!(f, "item {item}: unknown location '{location}'")
            }
            Self::NpcLocationMissing { npc, location } => {
                write!(f, "npc {npc}: unknown location '{location}'")
            }
            Self::TaskNpcMissing { task, npc } => write!(f, "{task}: references unknown NPC '{npc}'"),
            Self::TargetOutcomeMismatch { task, npc, outcome } => {
                write!(f, "{task}: target outcome '{outcome}' not provided by NPC '{npc}'")
            }
            Self::DanglingPrerequisite { owner, prereq } => {
                write!(f, "{owner}: prerequisite '{prereq}' does not resolve")
            }
            Self::SearchItemMissing { task, item } => {
                write!(f, "{task}: searches for unknown item '{item}'")
            }
            Self::HandoffItemMissing { task, item: Some(item) } => {
                write!(f, "{task}: hands off unknown item '{item}'")
            }
            Self::HandoffItemMissing { task, item: None } => {
                write!(f, "{task}: handoff has no item")
            }
            Self::InfoShareOutcomeMissing { task, outcome } => {
                write!(f, "{task}: shares unknown outcome '{outcome}'")
            }
            Self::HiddenItemWithoutUnlock { item } => {
                write!(f, "item {item} is hidden but has no unlock prerequisites")
            }
            Self::HiddenItemSelfUnlock { item, task } => {
                write!(f, "item {item} is unlocked by {task}, which searches for it")
            }
            Self::RoleWithoutStartingTask { role } => {
                write!(f, "role '{role}' has no task without prerequisites")
            }
            Self::RoleTooFewTasks { role, count } => {
                write!(f, "{role}: only {count} task(s) (minimum {MIN_TASKS_PER_ROLE})")
            }
            Self::RoleTooManyTasks { role, count } => {
                write!(f, "{role}: {count} tasks (maximum {MAX_TASKS_PER_ROLE})")
            }
            Self::InvalidMinigame { task, role, minigame } => {
                write!(f, "{task}: '{minigame}' is not a minigame for {role}")
            }
        }
    }
}

/// Runs every structural check against a role catalog.
pub struct Validator<'a> {
    catalog: &'a RoleCatalog,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a RoleCatalog) -> Self {
        Self { catalog }
    }

    pub fn validate(&self, graph: &ScenarioGraph) -> Vec<Violation> {
        let mut out = Vec::new();
        check_counts(graph, &mut out);
        check_task_ids(graph, &mut out);
        check_locations(graph, &mut out);
        check_tasks(graph, self.catalog, &mut out);
        check_items(graph, &mut out);
        check_roles(graph, &mut out);
        out
    }
}

/// True if any violation blocks use of the graph.
pub fn has_blocking(violations: &[Violation]) -> bool {
    violations.iter().any(Violation::is_blocking)
}

fn check_counts(graph: &ScenarioGraph, out: &mut Vec<Violation>) {
    let band = graph.location_band();
    let found = graph.locations.len();
    if !band.contains(&found) {
        out.push(Violation::LocationCount {
            found,
            min: *band.start(),
            max: *band.end(),
        });
    }

    let band = graph.task_band();
    let found = graph.tasks.len();
    if !band.contains(&found) {
        out.push(Violation::TaskCount {
            found,
            min: *band.start(),
            max: *band.end(),
        });
    }
}

fn check_task_ids(graph: &ScenarioGraph, out: &mut Vec<Violation>) {
    for (i, task) in graph.tasks.iter().enumerate() {
        if !task.id.is_well_formed() {
            out.push(Violation::MalformedTaskId { task: task.id.clone() });
        }
        if graph.tasks[..i].iter().any(|t| t.id == task.id) {
            out.push(Violation::DuplicateTaskId { task: task.id.clone() });
        }
    }
}

fn check_locations(graph: &ScenarioGraph, out: &mut Vec<Violation>) {
    for task in &graph.tasks {
        if !graph.has_location(&task.location) {
            out.push(Violation::TaskLocationMissing {
                task: task.id.clone(),
                location: task.location.clone(),
            });
        }
    }
    for item in &graph.items {
        if !graph.has_location(&item.location) {
            out.push(Violation::ItemLocationMissing {
                item: item.id.clone(),
                location: item.location.clone(),
            });
        }
    }
    for npc in &graph.npcs {
        if !graph.has_location(&npc.location) {
            out.push(Violation::NpcLocationMissing {
                npc: npc.id.clone(),
                location: npc.location.clone(),
            });
        }
    }
}

fn resolves(graph: &ScenarioGraph, prereq: &Prerequisite) -> bool {
    match prereq {
        Prerequisite::Task(id) => graph.has_task(id),
        Prerequisite::Outcome(id) => graph.has_outcome(id),
        Prerequisite::Item(id) => graph.has_item(id),
    }
}

fn check_tasks(graph: &ScenarioGraph, catalog: &RoleCatalog, out: &mut Vec<Violation>) {
    for task in &graph.tasks {
        for prereq in &task.prerequisites {
            if !resolves(graph, prereq) {
                out.push(Violation::DanglingPrerequisite {
                    owner: PrereqOwner::Task(task.id.clone()),
                    prereq: prereq.clone(),
                });
            }
        }

        match &task.kind {
            TaskKind::Minigame { minigame } => {
                if !catalog.is_valid_minigame(&task.role, minigame) {
                    out.push(Violation::InvalidMinigame {
                        task: task.id.clone(),
                        role: task.role.clone(),
                        minigame: minigame.clone(),
                    });
                }
            }
            TaskKind::Conversation {
                npc,
                target_outcomes,
            } => match graph.npc(npc) {
                None => out.push(Violation::TaskNpcMissing {
                    task: task.id.clone(),
                    npc: npc.clone(),
                }),
                Some(found) => {
                    for outcome in target_outcomes.iter().filter(|o| !found.provides(o)) {
                        out.push(Violation::TargetOutcomeMismatch {
                            task: task.id.clone(),
                            npc: npc.clone(),
                            outcome: outcome.clone(),
                        });
                    }
                }
            },
            TaskKind::Search { items } => {
                for item in items.iter().filter(|i| !graph.has_item(i)) {
                    out.push(Violation::SearchItemMissing {
                        task: task.id.clone(),
                        item: item.clone(),
                    });
                }
            }
            TaskKind::Handoff { item, .. } => {
                let exists = item.as_ref().is_some_and(|i| graph.has_item(i));
                if !exists {
                    out.push(Violation::HandoffItemMissing {
                        task: task.id.clone(),
                        item: item.clone(),
                    });
                }
            }
            TaskKind::InfoShare { outcome: Some(outcome) } => {
                if !graph.has_outcome(outcome) {
                    out.push(Violation::InfoShareOutcomeMissing {
                        task: task.id.clone(),
                        outcome: outcome.clone(),
                    });
                }
            }
            TaskKind::InfoShare { outcome: None } => {}
        }
    }
}

fn check_items(graph: &ScenarioGraph, out: &mut Vec<Violation>) {
    for item in &graph.items {
        for prereq in &item.unlock_prerequisites {
            if !resolves(graph, prereq) {
                out.push(Violation::DanglingPrerequisite {
                    owner: PrereqOwner::Item(item.id.clone()),
                    prereq: prereq.clone(),
                });
            }
        }
        if !item.hidden {
            continue;
        }
        if item.unlock_prerequisites.is_empty() {
            out.push(Violation::HiddenItemWithoutUnlock { item: item.id.clone() });
            continue;
        }
        for task in item
            .unlock_prerequisites
            .iter()
            .filter_map(Prerequisite::as_task)
            .filter_map(|id| graph.task(id))
            .filter(|t| t.searches_for(&item.id))
        {
            out.push(Violation::HiddenItemSelfUnlock {
                item: item.id.clone(),
                task: task.id.clone(),
            });
        }
    }
}

fn check_roles(graph: &ScenarioGraph, out: &mut Vec<Violation>) {
    for role in graph.all_roles() {
        let count = graph.tasks_for_role(&role).count();
        if count > 0 && !graph.tasks_for_role(&role).any(|t| t.is_starting()) {
            out.push(Violation::RoleWithoutStartingTask { role: role.clone() });
        }
        if count < MIN_TASKS_PER_ROLE {
            out.push(Violation::RoleTooFewTasks { role, count });
        } else if count > MAX_TASKS_PER_ROLE {
            out.push(Violation::RoleTooManyTasks { role, count });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::task::Task;
    use crate::schema::world::{Confidence, Item, Location, Npc, NpcAction};

    fn location(id: &str) -> Location {
        Location {
            id: LocationId::from(id),
            name: id.to_string(),
            description: String::new(),
            category: "Interior".to_string(),
        }
    }

    fn task(id: &str, role: &str, prerequisites: Vec<Prerequisite>, kind: TaskKind) -> Task {
        Task {
            id: TaskId::from(id),
            role: RoleId::from(role),
            location: LocationId::from("lobby"),
            description: String::new(),
            prerequisites,
            kind,
        }
    }

    fn lock_picking() -> TaskKind {
        TaskKind::Minigame {
            minigame: MinigameId::from("lock_picking"),
        }
    }

    /// A small clean graph for two players.
    fn clean_graph() -> ScenarioGraph {
        ScenarioGraph {
            scenario_id: "bank_test".to_string(),
            objective: "Open the vault".to_string(),
            roles: vec![RoleId::from("safe_cracker"), RoleId::from("muscle")],
            locations: ["lobby", "vault", "garage", "office"].map(location).to_vec(),
            items: vec![Item {
                id: ItemId::from("item_1"),
                name: "Keycard".to_string(),
                description: String::new(),
                location: LocationId::from("lobby"),
                hidden: false,
                unlock_prerequisites: Vec::new(),
            }],
            npcs: vec![Npc {
                id: NpcId::from("manager"),
                name: "Manager".to_string(),
                occupation: "manager".to_string(),
                personality: String::new(),
                location: LocationId::from("office"),
                information_known: Vec::new(),
                actions_available: vec![NpcAction {
                    outcome: OutcomeId::from("manager_action_1"),
                    confidence: Confidence::High,
                    description: String::new(),
                }],
            }],
            tasks: vec![
                task("SC1", "safe_cracker", vec![], lock_picking()),
                task(
                    "SC2",
                    "safe_cracker",
                    vec![Prerequisite::task("SC1")],
                    TaskKind::Search {
                        items: vec![ItemId::from("item_1")],
                    },
                ),
                task("SC3", "safe_cracker", vec![Prerequisite::item("item_1")], lock_picking()),
                task(
                    "M1",
                    "muscle",
                    vec![],
                    TaskKind::Conversation {
                        npc: NpcId::from("manager"),
                        target_outcomes: vec![OutcomeId::from("manager_action_1")],
                    },
                ),
                task(
                    "M2",
                    "muscle",
                    vec![Prerequisite::outcome("manager_action_1")],
                    TaskKind::Handoff {
                        item: Some(ItemId::from("item_1")),
                        to_role: RoleId::from("safe_cracker"),
                    },
                ),
                task(
                    "M3",
                    "muscle",
                    vec![Prerequisite::task("M2")],
                    TaskKind::InfoShare {
                        outcome: Some(OutcomeId::from("manager_action_1")),
                    },
                ),
            ],
            timeline_minutes: 120,
            conversions: Vec::new(),
        }
    }

    fn validate(graph: &ScenarioGraph) -> Vec<Violation> {
        Validator::new(&RoleCatalog::heist_default()).validate(graph)
    }

    #[test]
    fn clean_graph_has_no_violations() {
        assert_eq!(validate(&clean_graph()), Vec::new());
    }

    #[test]
    fn dangling_references_are_reported() {
        let mut graph = clean_graph();
        graph.tasks[2].prerequisites.push(Prerequisite::outcome("ghost_info_1"));
        graph.tasks[0].location = LocationId::from("moon");
        graph.tasks[3].kind = TaskKind::Conversation {
            npc: NpcId::from("ghost"),
            target_outcomes: Vec::new(),
        };
        let found = validate(&graph);
        assert!(found.contains(&Violation::DanglingPrerequisite {
            owner: PrereqOwner::Task(TaskId::from("SC3")),
            prereq: Prerequisite::outcome("ghost_info_1"),
        }));
        assert!(found.contains(&Violation::TaskLocationMissing {
            task: TaskId::from("SC1"),
            location: LocationId::from("moon"),
        }));
        assert!(found.contains(&Violation::TaskNpcMissing {
            task: TaskId::from("M1"),
            npc: NpcId::from("ghost"),
        }));
        assert!(found.iter().all(|v| v.class() == ErrorClass::Reference));
    }

    #[test]
    fn outcome_mismatch_and_bad_minigame() {
        let mut graph = clean_graph();
        graph.tasks[3].kind = TaskKind::Conversation {
            npc: NpcId::from("manager"),
            target_outcomes: vec![OutcomeId::from("janitor_info_1")],
        };
        graph.tasks[0].kind = TaskKind::Minigame {
            minigame: MinigameId::from("camera_bypass"),
        };
        let found = validate(&graph);
        assert!(found.iter().any(|v| matches!(v, Violation::TargetOutcomeMismatch { .. })));
        assert!(found.iter().any(|v| matches!(v, Violation::InvalidMinigame { .. })));
    }

    #[test]
    fn hidden_item_rules() {
        let mut graph = clean_graph();
        graph.items[0].hidden = true;
        assert_eq!(
            validate(&graph),
            vec![Violation::HiddenItemWithoutUnlock {
                item: ItemId::from("item_1")
            }]
        );

        graph.items[0].unlock_prerequisites = vec![Prerequisite::task("SC2")];
        let found = validate(&graph);
        assert_eq!(
            found,
            vec![Violation::HiddenItemSelfUnlock {
                item: ItemId::from("item_1"),
                task: TaskId::from("SC2"),
            }]
        );
        assert_eq!(found[0].class(), ErrorClass::Consistency);
    }

    #[test]
    fn handoff_without_item_is_critical() {
        let mut graph = clean_graph();
        graph.tasks[4].kind = TaskKind::Handoff {
            item: None,
            to_role: RoleId::from("safe_cracker"),
        };
        let found = validate(&graph);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule(), 40);
        assert!(has_blocking(&found));
    }

    #[test]
    fn role_checks() {
        let mut graph = clean_graph();
        graph.tasks[3].prerequisites.push(Prerequisite::task("SC1"));
        graph.tasks.retain(|t| t.id.as_str() != "M3" && t.id.as_str() != "M2");
        let found = validate(&graph);
        assert!(found.contains(&Violation::RoleWithoutStartingTask {
            role: RoleId::from("muscle")
        }));
        let few = Violation::RoleTooFewTasks {
            role: RoleId::from("muscle"),
            count: 1,
        };
        assert!(found.contains(&few));
        assert_eq!(few.severity(), Severity::Important);
    }

    #[test]
    fn counts_follow_player_bands() {
        let mut graph = clean_graph();
        graph.locations.truncate(3);
        let found = validate(&graph);
        assert!(found.contains(&Violation::LocationCount {
            found: 3,
            min: 4,
            max: 6
        }));
        // Every task sat in the lobby, which is still present.
        assert!(!found.iter().any(|v| matches!(v, Violation::TaskLocationMissing { .. })));

        let mut graph = clean_graph();
        graph.tasks.truncate(5);
        let found = validate(&graph);
        assert_eq!(found[0].severity(), Severity::Important);
        assert!(!has_blocking(&found));
    }

    #[test]
    fn malformed_and_duplicate_ids() {
        let mut graph = clean_graph();
        graph.tasks[5].id = TaskId::from("muscle-3");
        let dup = graph.tasks[0].clone();
        graph.tasks.push(dup);
        let found = validate(&graph);
        assert!(found.contains(&Violation::MalformedTaskId {
            task: TaskId::from("muscle-3")
        }));
        assert!(found.contains(&Violation::DuplicateTaskId {
            task: TaskId::from("SC1")
        }));
    }
}
