//! Read-only graph analysis: cycles, reachability, dead ends, critical
//! path and parallel work.
//!
//! Two edge sets are used. Cycle detection only follows `task:` prerequisite
//! edges. Everything else follows the derived unlock relation, where task
//! `A` unlocks task `B` if completing `A` satisfies any prerequisite of `B`
//! (its id, an outcome it earns, or an item it finds).

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::progress::Progress;
use crate::schema::graph::ScenarioGraph;
use crate::schema::ids::TaskId;
use crate::schema::prerequisite::Prerequisite;
use crate::schema::task::Task;

/// Everything [`GraphAnalyzer::analyze_all`] finds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub start_tasks: Vec<TaskId>,
    pub cycles: Vec<Vec<TaskId>>,
    pub orphans: Vec<TaskId>,
    pub dead_ends: Vec<TaskId>,
    pub critical_path: Vec<TaskId>,
    pub parallel_groups: Vec<Vec<TaskId>>,
}

impl Analysis {
    /// No cycles and no orphans.
    pub fn is_sound(&self) -> bool {
        self.cycles.is_empty() && self.orphans.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    OnStack,
    Done,
}

pub struct GraphAnalyzer<'a> {
    tasks: &'a [Task],
    /// task index -> indices of tasks named by its `task:` prerequisites.
    requires: Vec<Vec<usize>>,
    /// task index -> indices of tasks it unlocks.
    unlocks: Vec<Vec<usize>>,
    /// prerequisite -> indices of tasks that list it.
    waiting: FxHashMap<&'a Prerequisite, Vec<usize>>,
    /// BFS layer at which each task becomes available, `None` if never.
    depths: Vec<Option<usize>>,
}

impl<'a> GraphAnalyzer<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        let mut index: FxHashMap<&TaskId, usize> = FxHashMap::default();
        for (i, task) in tasks.iter().enumerate() {
            index.entry(&task.id).or_insert(i);
        }

        let mut waiting: FxHashMap<&Prerequisite, Vec<usize>> = FxHashMap::default();
        let mut requires = vec![Vec::new(); tasks.len()];
        for (i, task) in tasks.iter().enumerate() {
            for prereq in &task.prerequisites {
                let list = waiting.entry(prereq).or_default();
                if !list.contains(&i) {
                    list.push(i);
                }
                if let Some(&j) = prereq.as_task().and_then(|id| index.get(id)) {
                    if !requires[i].contains(&j) {
                        requires[i].push(j);
                    }
                }
            }
        }

        let mut unlocks = vec![Vec::new(); tasks.len()];
        for (i, task) in tasks.iter().enumerate() {
            for key in yields(task) {
                for &j in waiting.get(&key).map(Vec::as_slice).unwrap_or(&[]) {
                    if j != i && !unlocks[i].contains(&j) {
                        unlocks[i].push(j);
                    }
                }
            }
        }

        let mut analyzer = Self {
            tasks,
            requires,
            unlocks,
            waiting,
            depths: Vec::new(),
        };
        analyzer.depths = analyzer.reachability();
        analyzer
    }

    pub fn from_graph(graph: &'a ScenarioGraph) -> Self {
        Self::new(&graph.tasks)
    }

    /// Conjunctive BFS from the tasks with no prerequisites. A task is
    /// reached once every one of its prerequisites has been satisfied by
    /// tasks reached before it.
    fn reachability(&self) -> Vec<Option<usize>> {
        let mut depths = vec![None; self.tasks.len()];
        let mut queue = VecDeque::new();
        for (i, task) in self.tasks.iter().enumerate() {
            if task.is_starting() {
                depths[i] = Some(0);
                queue.push_back(i);
            }
        }

        let mut progress = Progress::new();
        while let Some(i) = queue.pop_front() {
            let task = &self.tasks[i];
            progress.complete(task);
            let depth = depths[i].unwrap_or(0);
            for key in yields(task) {
                for &j in self.waiting.get(&key).map(Vec::as_slice).unwrap_or(&[]) {
                    if depths[j].is_none() && progress.all_satisfied(&self.tasks[j].prerequisites) {
                        depths[j] = Some(depth + 1);
                        queue.push_back(j);
                    }
                }
            }
        }
        depths
    }

    pub fn start_tasks(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| t.is_starting())
            .map(|t| t.id.clone())
            .collect()
    }

    /// Every cycle over `task:` prerequisite edges, each as the path from
    /// the first repeated task back to itself. A task requiring itself
    /// yields `[X, X]`.
    pub fn find_cycles(&self) -> Vec<Vec<TaskId>> {
        let mut marks = vec![Mark::New; self.tasks.len()];
        let mut path = Vec::new();
        let mut cycles = Vec::new();
        for start in 0..self.tasks.len() {
            if marks[start] == Mark::New {
                self.visit(start, &mut marks, &mut path, &mut cycles);
            }
        }
        cycles
    }

    fn visit(
        &self,
        node: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        cycles: &mut Vec<Vec<TaskId>>,
    ) {
        marks[node] = Mark::OnStack;
        path.push(node);
        for &next in &self.requires[node] {
            match marks[next] {
                Mark::New => self.visit(next, marks, path, cycles),
                Mark::OnStack => {
                    if let Some(start) = path.iter().position(|&n| n == next) {
                        let mut cycle: Vec<TaskId> =
                            path[start..].iter().map(|&n| self.tasks[n].id.clone()).collect();
                        cycle.push(self.tasks[next].id.clone());
                        cycles.push(cycle);
                    }
                }
                Mark::Done => {}
            }
        }
        path.pop();
        marks[node] = Mark::Done;
    }

    /// Tasks never reached from the starting set.
    pub fn find_orphans(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .zip(&self.depths)
            .filter(|(_, depth)| depth.is_none())
            .map(|(t, _)| t.id.clone())
            .collect()
    }

    pub fn is_reachable(&self, task: &TaskId) -> bool {
        self.task_depth(task).is_some()
    }

    /// Tasks that unlock nothing. Each role's last task is its finish
    /// line and is never reported.
    pub fn find_dead_ends(&self) -> Vec<TaskId> {
        let mut last_of_role: FxHashMap<&str, usize> = FxHashMap::default();
        for (i, task) in self.tasks.iter().enumerate() {
            last_of_role.insert(task.role.as_str(), i);
        }
        self.tasks
            .iter()
            .enumerate()
            .filter(|(i, task)| {
                self.unlocks[*i].is_empty() && last_of_role.get(task.role.as_str()) != Some(i)
            })
            .map(|(_, t)| t.id.clone())
            .collect()
    }

    /// Longest chain through the unlock relation starting at any start
    /// task. Ties keep the earliest task in graph order.
    pub fn critical_path(&self) -> Vec<TaskId> {
        let mut memo: Vec<Option<Vec<usize>>> = vec![None; self.tasks.len()];
        let mut visiting = vec![false; self.tasks.len()];
        let mut best: Vec<usize> = Vec::new();
        for (i, task) in self.tasks.iter().enumerate() {
            if task.is_starting() {
                let path = self.longest_from(i, &mut memo, &mut visiting);
                if path.len() > best.len() {
                    best = path;
                }
            }
        }
        best.into_iter().map(|i| self.tasks[i].id.clone()).collect()
    }

    fn longest_from(
        &self,
        node: usize,
        memo: &mut [Option<Vec<usize>>],
        visiting: &mut [bool],
    ) -> Vec<usize> {
        if let Some(path) = &memo[node] {
            return path.clone();
        }
        visiting[node] = true;
        let mut tail: Vec<usize> = Vec::new();
        for &next in &self.unlocks[node] {
            if visiting[next] {
                continue;
            }
            let candidate = self.longest_from(next, memo, visiting);
            if candidate.len() > tail.len() {
                tail = candidate;
            }
        }
        visiting[node] = false;
        let mut path = Vec::with_capacity(tail.len() + 1);
        path.push(node);
        path.extend(tail);
        memo[node] = Some(path.clone());
        path
    }

    /// Reachable tasks grouped by the BFS layer they become available in.
    /// Only layers with at least two tasks are returned.
    pub fn parallel_groups(&self) -> Vec<Vec<TaskId>> {
        let deepest = self.depths.iter().flatten().copied().max();
        let Some(deepest) = deepest else {
            return Vec::new();
        };
        let mut layers: Vec<Vec<TaskId>> = vec![Vec::new(); deepest + 1];
        for (task, depth) in self.tasks.iter().zip(&self.depths) {
            if let Some(d) = depth {
                layers[*d].push(task.id.clone());
            }
        }
        layers.into_iter().filter(|l| l.len() >= 2).collect()
    }

    /// 0 for start tasks, `None` if the task is unknown or unreachable.
    pub fn task_depth(&self, task: &TaskId) -> Option<usize> {
        let i = self.tasks.iter().position(|t| &t.id == task)?;
        self.depths[i]
    }

    pub fn analyze_all(&self) -> Analysis {
        Analysis {
            start_tasks: self.start_tasks(),
            cycles: self.find_cycles(),
            orphans: self.find_orphans(),
            dead_ends: self.find_dead_ends(),
            critical_path: self.critical_path(),
            parallel_groups: self.parallel_groups(),
        }
    }
}

/// The prerequisites completing `task` satisfies.
fn yields(task: &Task) -> Vec<Prerequisite> {
    let mut out = vec![Prerequisite::Task(task.id.clone())];
    out.extend(task.provided_outcomes().iter().cloned().map(Prerequisite::Outcome));
    out.extend(task.found_items().iter().cloned().map(Prerequisite::Item));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ids::{ItemId, LocationId, MinigameId, NpcId, OutcomeId, RoleId};
    use crate::schema::task::TaskKind;

    fn task(id: &str, role: &str, prerequisites: Vec<Prerequisite>) -> Task {
        Task {
            id: TaskId::from(id),
            role: RoleId::from(role),
            location: LocationId::from("lobby"),
            description: String::new(),
            prerequisites,
            kind: TaskKind::Minigame {
                minigame: MinigameId::from("lock_picking"),
            },
        }
    }

    fn ids(list: &[&str]) -> Vec<TaskId> {
        list.iter().map(|s| TaskId::from(*s)).collect()
    }

    #[test]
    fn two_task_cycle() {
        let tasks = vec![
            task("A1", "a", vec![Prerequisite::task("A2")]),
            task("A2", "a", vec![Prerequisite::task("A1")]),
            task("B1", "b", vec![]),
        ];
        let analyzer = GraphAnalyzer::new(&tasks);
        assert_eq!(analyzer.find_cycles(), vec![ids(&["A1", "A2", "A1"])]);
        assert_eq!(analyzer.find_orphans(), ids(&["A1", "A2"]));
    }

    #[test]
    fn reachability_is_conjunctive() {
        let mut talk = task("G1", "g", vec![]);
        talk.kind = TaskKind::Conversation {
            npc: NpcId::from("guard"),
            target_outcomes: vec![OutcomeId::from("guard_info_1")],
        };
        let mut search = task("S1", "s", vec![]);
        search.kind = TaskKind::Search {
            items: vec![ItemId::from("item_1")],
        };
        let tasks = vec![
            talk,
            search,
            task(
                "S2",
                "s",
                vec![Prerequisite::outcome("guard_info_1"), Prerequisite::item("item_1")],
            ),
            task(
                "S3",
                "s",
                vec![Prerequisite::task("S2"), Prerequisite::item("item_9")],
            ),
        ];
        let analyzer = GraphAnalyzer::new(&tasks);
        assert_eq!(analyzer.find_orphans(), ids(&["S3"]));
        assert_eq!(analyzer.task_depth(&TaskId::from("S2")), Some(1));
        assert_eq!(analyzer.task_depth(&TaskId::from("S3")), None);
        assert!(analyzer.find_cycles().is_empty());
    }

    #[test]
    fn dead_ends_skip_each_roles_last_task() {
        let tasks = vec![
            task("A1", "a", vec![]),
            task("A2", "a", vec![]),
            task("A3", "a", vec![Prerequisite::task("A1")]),
            task("B1", "b", vec![]),
            task("B2", "b", vec![Prerequisite::task("B1")]),
        ];
        let analyzer = GraphAnalyzer::new(&tasks);
        assert_eq!(analyzer.find_dead_ends(), ids(&["A2"]));
    }

    #[test]
    fn critical_path_and_parallel_groups() {
        let tasks = vec![
            task("A1", "a", vec![]),
            task("B1", "b", vec![]),
            task("A2", "a", vec![Prerequisite::task("A1")]),
            task("B2", "b", vec![Prerequisite::task("B1")]),
            task("A3", "a", vec![Prerequisite::task("A2"), Prerequisite::task("B2")]),
            task("A4", "a", vec![Prerequisite::task("A3")]),
        ];
        let analyzer = GraphAnalyzer::new(&tasks);
        assert_eq!(analyzer.critical_path(), ids(&["A1", "A2", "A3", "A4"]));
        assert_eq!(
            analyzer.parallel_groups(),
            vec![ids(&["A1", "B1"]), ids(&["A2", "B2"])]
        );
        assert_eq!(analyzer.task_depth(&TaskId::from("A4")), Some(3));
        assert_eq!(analyzer.task_depth(&TaskId::from("Z9")), None);
    }

    #[test]
    fn analyze_all_on_sound_graph() {
        let tasks = vec![
            task("A1", "a", vec![]),
            task("A2", "a", vec![Prerequisite::task("A1")]),
        ];
        let analysis = GraphAnalyzer::new(&tasks).analyze_all();
        assert!(analysis.is_sound());
        assert_eq!(analysis.start_tasks, ids(&["A1"]));
        assert!(analysis.dead_ends.is_empty());
        assert_eq!(analysis.critical_path, ids(&["A1", "A2"]));
    }
}
