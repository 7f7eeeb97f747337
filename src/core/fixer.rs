//! Deterministic repairs and the bounded validate-and-fix loop.
//!
//! Each sweep validates the graph and applies at most one repair per
//! blocking violation. Non-blocking violations are reported as warnings
//! and never repaired. Cycles, orphans and playability problems are out
//! of reach here: fixing those needs a judgement about which content to
//! drop.

use log::{debug, info};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::core::validator::{PrereqOwner, Validator, Violation};
use crate::schema::catalog::RoleCatalog;
use crate::schema::graph::ScenarioGraph;
use crate::schema::ids::{LocationId, OutcomeId, RoleId, TaskId};
use crate::schema::prerequisite::Prerequisite;
use crate::schema::task::{ConversionReason, KindConversion, TaskKind, TaskType};
use crate::schema::world::Location;

/// Outcome of [`Fixer::validate_and_fix`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixReport {
    /// No blocking violation remains.
    pub valid: bool,
    /// Repair sweeps performed.
    pub iterations: usize,
    /// Blocking violations left unresolved.
    pub violations: Vec<Violation>,
    /// Non-blocking violations from the final validation.
    pub warnings: Vec<Violation>,
    /// Human-readable log of every repair applied, in order.
    pub fixes: Vec<String>,
}

pub struct Fixer<'a> {
    catalog: &'a RoleCatalog,
}

impl<'a> Fixer<'a> {
    pub fn new(catalog: &'a RoleCatalog) -> Self {
        Self { catalog }
    }

    pub fn validate_and_fix(&self, graph: &mut ScenarioGraph, max_iterations: usize) -> FixReport {
        let validator = Validator::new(self.catalog);
        let mut fixes = Vec::new();
        let mut iterations = 0;

        loop {
            let (violations, warnings): (Vec<_>, Vec<_>) = validator
                .validate(graph)
                .into_iter()
                .partition(Violation::is_blocking);

            let stalled = iterations >= max_iterations;
            if violations.is_empty() || stalled {
                let valid = violations.is_empty();
                info!(
                    "fixer on '{}': valid={valid} after {iterations} sweep(s), {} fix(es), {} warning(s)",
                    graph.scenario_id,
                    fixes.len(),
                    warnings.len()
                );
                return FixReport {
                    valid,
                    iterations,
                    violations,
                    warnings,
                    fixes,
                };
            }

            iterations += 1;
            let before = fixes.len();
            for violation in &violations {
                if let Some(fix) = self.repair(graph, violation) {
                    debug!("fixer: {fix}");
                    fixes.push(fix);
                }
            }

            if fixes.len() == before {
                info!(
                    "fixer on '{}': no repair possible for {} violation(s)",
                    graph.scenario_id,
                    violations.len()
                );
                return FixReport {
                    valid: false,
                    iterations,
                    violations,
                    warnings,
                    fixes,
                };
            }
        }
    }

    /// Applies the repair for one violation. Returns a description if the
    /// graph changed.
    fn repair(&self, graph: &mut ScenarioGraph, violation: &Violation) -> Option<String> {
        match violation {
            Violation::LocationCount { min, max, .. } => fix_location_count(graph, *min, *max),
            Violation::DuplicateTaskId { task } => remove_duplicate(graph, task),
            Violation::TaskLocationMissing { task, location } => {
                let first = graph.locations.first()?.id.clone();
                let t = graph.task_mut(task).filter(|t| &t.location == location)?;
                t.location = first.clone();
                Some(format!("Fixed {task} location: {location} -> {first}"))
            }
            Violation::ItemLocationMissing { item, location } => {
                let first = graph.locations.first()?.id.clone();
                let i = graph.item_mut(item).filter(|i| &i.location == location)?;
                i.location = first.clone();
                Some(format!("Fixed {item} location: {location} -> {first}"))
            }
            Violation::NpcLocationMissing { npc, location } => {
                let first = graph.locations.first()?.id.clone();
                let n = graph
                    .npcs
                    .iter_mut()
                    .find(|n| &n.id == npc && &n.location == location)?;
                n.location = first.clone();
                Some(format!("Fixed {npc} location: {location} -> {first}"))
            }
            Violation::TaskNpcMissing { task, npc } => {
                remove_task(graph, task)?;
                Some(format!("Removed task {task} (referenced non-existent NPC: {npc})"))
            }
            Violation::TargetOutcomeMismatch { task, npc, outcome } => {
                repoint_outcome(graph, task, npc.as_str(), outcome)
            }
            Violation::DanglingPrerequisite { owner, prereq } => {
                strip_prerequisite(graph, owner, prereq)
            }
            Violation::SearchItemMissing { task, item } => {
                let t = graph.task_mut(task)?;
                match &mut t.kind {
                    TaskKind::Search { items } if items.contains(item) => {
                        items.retain(|i| i != item);
                        Some(format!("Removed unknown item {item} from search {task}"))
                    }
                    _ => None,
                }
            }
            Violation::HandoffItemMissing { task, .. } => self.convert_handoff(graph, task),
            Violation::InfoShareOutcomeMissing { task, outcome } => {
                let t = graph.task_mut(task)?;
                match &mut t.kind {
                    TaskKind::InfoShare { outcome: shared } if shared.as_ref() == Some(outcome) => {
                        *shared = None;
                        Some(format!("Cleared unknown shared outcome {outcome} from {task}"))
                    }
                    _ => None,
                }
            }
            Violation::HiddenItemWithoutUnlock { item } => {
                let i = graph.item_mut(item).filter(|i| i.is_undiscoverable())?;
                i.hidden = false;
                Some(format!("Set {item}.hidden = false (was hidden with no unlock)"))
            }
            Violation::HiddenItemSelfUnlock { item, task } => {
                let i = graph.item_mut(item)?;
                let prereq = Prerequisite::Task(task.clone());
                let before = i.unlock_prerequisites.len();
                i.unlock_prerequisites.retain(|p| p != &prereq);
                (i.unlock_prerequisites.len() < before)
                    .then(|| format!("Removed self-unlock {task} from {item}"))
            }
            Violation::RoleWithoutStartingTask { role } => make_starting_task(graph, role),
            Violation::InvalidMinigame { task, role, minigame } => {
                let replacement = self.catalog.minigames_for(role).first()?.clone();
                let t = graph.task_mut(task)?;
                match &mut t.kind {
                    TaskKind::Minigame { minigame: current } if current == minigame => {
                        *current = replacement.clone();
                        Some(format!("Replaced minigame {minigame} on {task} with {replacement}"))
                    }
                    _ => None,
                }
            }
            Violation::MalformedTaskId { .. }
            | Violation::TaskCount { .. }
            | Violation::RoleTooFewTasks { .. }
            | Violation::RoleTooManyTasks { .. } => None,
        }
    }

    fn convert_handoff(&self, graph: &mut ScenarioGraph, task: &TaskId) -> Option<String> {
        let t = graph.task_mut(task)?;
        if !matches!(t.kind, TaskKind::Handoff { .. }) {
            return None;
        }
        let minigame = self.catalog.minigames_for(&t.role).first()?.clone();
        t.description = format!("Complete {}", minigame.as_str().replace('_', " "));
        t.kind = TaskKind::Minigame { minigame };
        graph.conversions.push(KindConversion {
            task: task.clone(),
            from: TaskType::Handoff,
            to: TaskType::Minigame,
            reason: ConversionReason::HandoffItemMissing,
        });
        Some(format!("Converted handoff {task} to a minigame (item missing)"))
    }
}

fn fix_location_count(graph: &mut ScenarioGraph, min: usize, max: usize) -> Option<String> {
    let current = graph.locations.len();
    if current > max {
        let used: FxHashSet<LocationId> = graph
            .tasks
            .iter()
            .map(|t| t.location.clone())
            .chain(graph.items.iter().map(|i| i.location.clone()))
            .chain(graph.npcs.iter().map(|n| n.location.clone()))
            .collect();
        // Stable: used locations first, each group in original order.
        graph.locations.sort_by_key(|l| !used.contains(&l.id));
        graph.locations.truncate(max);
        Some(format!(
            "Kept {max} most important locations, removed {} unused",
            current - max
        ))
    } else if current < min {
        let mut n = 1;
        while graph.locations.len() < min {
            let id = LocationId::new(format!("extra_location_{n}"));
            if !graph.has_location(&id) {
                graph.locations.push(Location {
                    id,
                    name: format!("Extra Location {n}"),
                    description: "Additional location for scenario".to_string(),
                    category: "Extra".to_string(),
                });
            }
            n += 1;
        }
        Some(format!("Added {} locations to reach minimum", min - current))
    } else {
        None
    }
}

fn remove_duplicate(graph: &mut ScenarioGraph, task: &TaskId) -> Option<String> {
    let positions: Vec<usize> = graph
        .tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| &t.id == task)
        .map(|(i, _)| i)
        .collect();
    if positions.len() < 2 {
        return None;
    }
    let last = *positions.last()?;
    graph.tasks.remove(last);
    Some(format!("Removed duplicate task {task}"))
}

fn remove_task(graph: &mut ScenarioGraph, task: &TaskId) -> Option<()> {
    let index = graph.tasks.iter().position(|t| &t.id == task)?;
    graph.tasks.remove(index);
    Some(())
}

fn repoint_outcome(
    graph: &mut ScenarioGraph,
    task: &TaskId,
    npc: &str,
    outcome: &OutcomeId,
) -> Option<String> {
    let first = graph
        .npcs
        .iter()
        .find(|n| n.id.as_str() == npc)
        .and_then(|n| n.first_outcome().cloned());

    let Some(first) = first else {
        remove_task(graph, task)?;
        return Some(format!("Removed task {task} (NPC {npc} has no outcomes)"));
    };

    let t = graph.task_mut(task)?;
    let TaskKind::Conversation {
        target_outcomes, ..
    } = &mut t.kind
    else {
        return None;
    };
    let slot = target_outcomes.iter().position(|o| o == outcome)?;
    if target_outcomes.contains(&first) {
        target_outcomes.remove(slot);
    } else {
        target_outcomes[slot] = first.clone();
    }
    Some(format!("Fixed {task} target outcome to match NPC {npc}: {outcome} -> {first}"))
}

fn strip_prerequisite(
    graph: &mut ScenarioGraph,
    owner: &PrereqOwner,
    prereq: &Prerequisite,
) -> Option<String> {
    let (list, label): (&mut Vec<Prerequisite>, String) = match owner {
        PrereqOwner::Task(id) => (&mut graph.task_mut(id)?.prerequisites, id.to_string()),
        PrereqOwner::Item(id) => (&mut graph.item_mut(id)?.unlock_prerequisites, id.to_string()),
    };
    let before = list.len();
    list.retain(|p| p != prereq);
    (list.len() < before).then(|| format!("Removed invalid prerequisite {prereq} from {label}"))
}

/// Clears the prerequisites of the role's first task that does not sit on a
/// `task:` cycle. Cycle edges are left for the analyzer to report.
fn make_starting_task(graph: &mut ScenarioGraph, role: &RoleId) -> Option<String> {
    let id = graph
        .tasks
        .iter()
        .filter(|t| &t.role == role && !t.prerequisites.is_empty())
        .find(|t| !on_task_cycle(graph, &t.id))
        .map(|t| t.id.clone())?;
    let task = graph.tasks.iter_mut().find(|t| t.id == id)?;
    task.prerequisites.clear();
    Some(format!("Made {id} a starting task for {role}"))
}

/// Whether `start` can reach itself by following `task:` prerequisites.
fn on_task_cycle(graph: &ScenarioGraph, start: &TaskId) -> bool {
    let mut seen: FxHashSet<&TaskId> = FxHashSet::default();
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        let Some(task) = graph.task(id) else {
            continue;
        };
        for prereq in &task.prerequisites {
            if let Prerequisite::Task(next) = prereq {
                if next == start {
                    return true;
                }
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
    }
    false
}
