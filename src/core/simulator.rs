//! Turn-based dry run of a scenario.
//!
//! Each turn one role with available work completes one task. The loop is
//! a scheduling model, not real concurrency: it estimates how a group
//! might progress and catches deadlocks and pacing problems that static
//! analysis cannot see.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::progress::Progress;
use crate::core::validator::Severity;
use crate::schema::graph::ScenarioGraph;
use crate::schema::ids::{RoleId, TaskId};
use crate::schema::task::Task;

/// Turns in a row with nobody able to act before the run is a deadlock.
pub const STALL_LIMIT: usize = 3;
/// Longest acceptable stretch a role spends waiting.
pub const IDLE_LIMIT: usize = 3;
/// Every role should have finished something by this turn.
pub const EARLY_TURNS: usize = 3;

/// Which role acts when several have work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStrategy {
    /// Cycle through the roles that have work.
    #[default]
    RoundRobin,
    /// Pick uniformly among roles with work.
    Random { seed: u64 },
    /// Pick the role with the most available tasks. Ties go to roster order.
    Greedy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimOutcome {
    Win,
    Deadlock,
    Timeout,
}

impl fmt::Display for SimOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Win => "WIN",
            Self::Deadlock => "DEADLOCK",
            Self::Timeout => "TIMEOUT",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: usize,
    pub task: TaskId,
    pub role: RoleId,
    /// Roles that had at least one available task this turn.
    pub active_roles: Vec<RoleId>,
    /// Roles with unfinished tasks but nothing available.
    pub idle_roles: Vec<RoleId>,
    pub available_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleStats {
    pub role: RoleId,
    pub completed: usize,
    pub max_idle_streak: usize,
    /// Turns on which this role completed a task.
    pub completion_turns: Vec<usize>,
}

impl RoleStats {
    fn new(role: RoleId) -> Self {
        Self {
            role,
            completed: 0,
            max_idle_streak: 0,
            completion_turns: Vec::new(),
        }
    }

    pub fn first_completion(&self) -> Option<usize> {
        self.completion_turns.first().copied()
    }
}

/// Which playability concern a [`SimIssue`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimRule {
    Deadlock,
    Timeout,
    EarlyEngagement,
    IdleStreak,
    WorkloadSkew,
    Concurrency,
}

impl SimRule {
    pub fn number(&self) -> u32 {
        match self {
            Self::EarlyEngagement => 19,
            Self::IdleStreak => 20,
            Self::WorkloadSkew => 21,
            Self::Concurrency => 22,
            Self::Deadlock | Self::Timeout => 30,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Deadlock => "Simulation deadlocked",
            Self::Timeout => "Simulation timed out",
            Self::EarlyEngagement => "Early game engagement",
            Self::IdleStreak => "Extended dead time",
            Self::WorkloadSkew => "Uneven pacing",
            Self::Concurrency => "Low concurrency",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimIssue {
    pub rule: SimRule,
    pub severity: Severity,
    pub role: Option<RoleId>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub outcome: SimOutcome,
    /// Turns elapsed, stalled turns included.
    pub total_turns: usize,
    pub remaining_tasks: usize,
    pub turns: Vec<TurnRecord>,
    pub roles: Vec<RoleStats>,
    pub issues: Vec<SimIssue>,
}

impl SimulationResult {
    pub fn is_win(&self) -> bool {
        self.outcome == SimOutcome::Win
    }

    pub fn has_critical(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    pub fn role(&self, role: &RoleId) -> Option<&RoleStats> {
        self.roles.iter().find(|s| &s.role == role)
    }

    /// Mean number of roles with work per recorded turn.
    pub fn average_active(&self) -> f64 {
        if self.turns.is_empty() {
            return 0.0;
        }
        let total: usize = self.turns.iter().map(|t| t.active_roles.len()).sum();
        total as f64 / self.turns.len() as f64
    }
}

/// Runs `tasks` to completion, deadlock or `max_turns`.
///
/// Tasks whose role is not in `roles` never become available to anyone.
pub fn simulate(
    tasks: &[Task],
    roles: &[RoleId],
    strategy: SelectionStrategy,
    max_turns: usize,
) -> SimulationResult {
    let mut roster: Vec<RoleId> = Vec::with_capacity(roles.len());
    for role in roles {
        if !roster.contains(role) {
            roster.push(role.clone());
        }
    }
    let by_role: Vec<Vec<usize>> = roster
        .iter()
        .map(|role| {
            tasks
                .iter()
                .enumerate()
                .filter(|(_, t)| &t.role == role)
                .map(|(i, _)| i)
                .collect()
        })
        .collect();

    let mut rng = match strategy {
        SelectionStrategy::Random { seed } => Some(StdRng::seed_from_u64(seed)),
        _ => None,
    };

    let mut progress = Progress::new();
    let mut done = vec![false; tasks.len()];
    let mut done_count = 0;
    let mut stats: Vec<RoleStats> = roster.iter().cloned().map(RoleStats::new).collect();
    let mut idle_streak = vec![0usize; roster.len()];
    let mut records = Vec::new();
    let mut stalled = 0;
    let mut turn = 0;
    let mut outcome = SimOutcome::Win;

    while done_count < tasks.len() {
        if turn >= max_turns {
            outcome = SimOutcome::Timeout;
            break;
        }
        turn += 1;

        let available: Vec<Vec<usize>> = by_role
            .iter()
            .map(|indices| {
                indices
                    .iter()
                    .copied()
                    .filter(|&i| !done[i] && progress.all_satisfied(&tasks[i].prerequisites))
                    .collect()
            })
            .collect();
        let active: Vec<usize> = (0..roster.len()).filter(|&r| !available[r].is_empty()).collect();

        if active.is_empty() {
            stalled += 1;
            if stalled > STALL_LIMIT {
                outcome = SimOutcome::Deadlock;
                break;
            }
            continue;
        }
        stalled = 0;

        let pick = match (strategy, rng.as_mut()) {
            (SelectionStrategy::Random { .. }, Some(rng)) => {
                active.choose(rng).copied().unwrap_or(active[0])
            }
            (SelectionStrategy::Greedy, _) => {
                let mut best = active[0];
                for &r in &active[1..] {
                    if available[r].len() > available[best].len() {
                        best = r;
                    }
                }
                best
            }
            _ => active[turn % active.len()],
        };

        let index = available[pick][0];
        let task = &tasks[index];
        done[index] = true;
        done_count += 1;
        progress.complete(task);
        stats[pick].completed += 1;
        stats[pick].completion_turns.push(turn);
        debug!("turn {}: {} completes {}", turn, roster[pick], task.id);

        let mut idle_roles = Vec::new();
        for r in 0..roster.len() {
            let unfinished = by_role[r].iter().any(|&i| !done[i]);
            if r == pick || !available[r].is_empty() || !unfinished {
                idle_streak[r] = 0;
                continue;
            }
            idle_streak[r] += 1;
            stats[r].max_idle_streak = stats[r].max_idle_streak.max(idle_streak[r]);
            idle_roles.push(roster[r].clone());
        }

        records.push(TurnRecord {
            turn,
            task: task.id.clone(),
            role: roster[pick].clone(),
            active_roles: active.iter().map(|&r| roster[r].clone()).collect(),
            idle_roles,
            available_tasks: available.iter().map(Vec::len).sum(),
        });
    }

    let mut result = SimulationResult {
        outcome,
        total_turns: turn,
        remaining_tasks: tasks.len() - done_count,
        turns: records,
        roles: stats,
        issues: Vec::new(),
    };
    result.issues = assess(&result);
    info!(
        "simulation: {} after {} turns, {} task(s) left, {} issue(s)",
        result.outcome,
        result.total_turns,
        result.remaining_tasks,
        result.issues.len()
    );
    result
}

/// Simulates every role that appears in the graph's roster or tasks.
pub fn simulate_graph(
    graph: &ScenarioGraph,
    strategy: SelectionStrategy,
    max_turns: usize,
) -> SimulationResult {
    simulate(&graph.tasks, &graph.all_roles(), strategy, max_turns)
}

fn assess(result: &SimulationResult) -> Vec<SimIssue> {
    let mut issues = Vec::new();

    match result.outcome {
        SimOutcome::Deadlock => issues.push(SimIssue {
            rule: SimRule::Deadlock,
            severity: Severity::Critical,
            role: None,
            message: format!(
                "Deadlock at turn {}: no role has an available task but {} task(s) remain",
                result.total_turns, result.remaining_tasks
            ),
        }),
        SimOutcome::Timeout => issues.push(SimIssue {
            rule: SimRule::Timeout,
            severity: Severity::Critical,
            role: None,
            message: format!(
                "Stopped after {} turns with {} task(s) remaining",
                result.total_turns, result.remaining_tasks
            ),
        }),
        SimOutcome::Win => {}
    }

    for stats in &result.roles {
        match stats.first_completion() {
            None => issues.push(SimIssue {
                rule: SimRule::EarlyEngagement,
                severity: Severity::Critical,
                role: Some(stats.role.clone()),
                message: format!("{} never completes a task", stats.role),
            }),
            Some(first) if first > EARLY_TURNS => issues.push(SimIssue {
                rule: SimRule::EarlyEngagement,
                severity: Severity::Important,
                role: Some(stats.role.clone()),
                message: format!(
                    "{}'s first task is at turn {} (should be within the first {})",
                    stats.role, first, EARLY_TURNS
                ),
            }),
            Some(_) => {}
        }

        if stats.max_idle_streak > IDLE_LIMIT {
            issues.push(SimIssue {
                rule: SimRule::IdleStreak,
                severity: Severity::Important,
                role: Some(stats.role.clone()),
                message: format!(
                    "{} waited {} consecutive turns with nothing to do (max {})",
                    stats.role, stats.max_idle_streak, IDLE_LIMIT
                ),
            });
        }

        let count = stats.completion_turns.len();
        if count > 0 {
            let final_quarter = result.total_turns * 3 / 4;
            let late = stats.completion_turns.iter().filter(|&&t| t >= final_quarter).count();
            if late * 2 > count {
                issues.push(SimIssue {
                    rule: SimRule::WorkloadSkew,
                    severity: Severity::Advisory,
                    role: Some(stats.role.clone()),
                    message: format!(
                        "{} has {}% of its tasks in the final quarter of the game",
                        stats.role,
                        late * 100 / count
                    ),
                });
            }
        }
    }

    let role_count = result.roles.len();
    if role_count > 1 && !result.turns.is_empty() {
        let busy = result
            .turns
            .iter()
            .filter(|t| t.active_roles.len() * 2 >= role_count)
            .count();
        let pct = busy * 100 / result.turns.len();
        if pct < 50 {
            issues.push(SimIssue {
                rule: SimRule::Concurrency,
                severity: Severity::Advisory,
                role: None,
                message: format!(
                    "Only {}% of turns had at least half the roles with available tasks",
                    pct
                ),
            });
        }
    }

    issues
}
