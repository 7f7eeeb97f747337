//! Three-tier scenario report.
//!
//! Collects what is left after fixing, what the analyzer found and what the
//! simulator found into numbered issues. Violations of the same kind are
//! grouped into one issue with a detail line each.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::analyzer::Analysis;
use crate::core::fixer::FixReport;
use crate::core::simulator::{SimulationResult, SimRule};
use crate::core::validator::{ErrorClass, Severity, Violation};
use crate::schema::ids::TaskId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub rule: u32,
    pub severity: Severity,
    pub class: ErrorClass,
    pub title: String,
    pub message: String,
    pub details: Vec<String>,
    pub fix_suggestion: Option<String>,
}

impl Issue {
    fn new(rule: u32, severity: Severity, class: ErrorClass, title: &str) -> Self {
        Self {
            rule,
            severity,
            class,
            title: title.to_string(),
            message: String::new(),
            details: Vec::new(),
            fix_suggestion: None,
        }
    }

    fn suggest(mut self, text: &str) -> Self {
        self.fix_suggestion = Some(text.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario_id: String,
    pub issues: Vec<Issue>,
    /// Repairs applied by the fixer, in order.
    pub fixes: Vec<String>,
}

impl ScenarioReport {
    /// Builds the report. Issues are ordered by severity, then rule.
    pub fn build(
        scenario_id: &str,
        fix: &FixReport,
        analysis: Option<&Analysis>,
        simulation: Option<&SimulationResult>,
    ) -> Self {
        let mut issues: Vec<Issue> = Vec::new();

        for violation in fix.violations.iter().chain(&fix.warnings) {
            let detail = violation.to_string();
            match issues.iter_mut().find(|i| {
                i.rule == violation.rule()
                    && i.severity == violation.severity()
                    && i.title == violation.title()
            }) {
                Some(issue) => issue.details.push(detail),
                None => {
                    let mut issue = Issue::new(
                        violation.rule(),
                        violation.severity(),
                        violation.class(),
                        violation.title(),
                    );
                    if let Some(text) = suggestion(violation) {
                        issue = issue.suggest(text);
                    }
                    issue.details.push(detail);
                    issues.push(issue);
                }
            }
        }

        if let Some(analysis) = analysis {
            graph_issues(analysis, &mut issues);
        }
        if let Some(simulation) = simulation {
            simulation_issues(simulation, &mut issues);
        }

        for issue in &mut issues {
            if issue.message.is_empty() {
                issue.message = match issue.details.as_slice() {
                    [only] => only.clone(),
                    many => format!("{} occurrences", many.len()),
                };
            }
        }
        issues.sort_by_key(|i| (i.severity, i.rule));

        Self {
            scenario_id: scenario_id.to_string(),
            issues,
            fixes: fix.fixes.clone(),
        }
    }

    /// True if no CRITICAL issue remains.
    pub fn passed(&self) -> bool {
        self.count(Severity::Critical) == 0
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Issue> + '_ {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    pub fn has_rule(&self, rule: u32) -> bool {
        self.issues.iter().any(|i| i.rule == rule)
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} ({} critical, {} important, {} advisory, {} fix(es) applied)",
            self.scenario_id,
            if self.passed() { "PASSED" } else { "FAILED" },
            self.count(Severity::Critical),
            self.count(Severity::Important),
            self.count(Severity::Advisory),
            self.fixes.len()
        )
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for severity in [Severity::Critical, Severity::Important, Severity::Advisory] {
            let count = self.count(severity);
            if count == 0 {
                continue;
            }
            writeln!(f, "\n{severity} ({count}):")?;
            for issue in self.with_severity(severity) {
                writeln!(f, "  [rule {}] {}: {}", issue.rule, issue.title, issue.message)?;
                if issue.details.len() > 1 {
                    for detail in &issue.details {
                        writeln!(f, "    - {detail}")?;
                    }
                }
                if let Some(fix) = &issue.fix_suggestion {
                    writeln!(f, "    fix: {fix}")?;
                }
            }
        }
        if !self.fixes.is_empty() {
            writeln!(f, "\nFixes applied ({}):", self.fixes.len())?;
            for fix in &self.fixes {
                writeln!(f, "  - {fix}")?;
            }
        }
        Ok(())
    }
}

fn suggestion(violation: &Violation) -> Option<&'static str> {
    Some(match violation {
        Violation::MalformedTaskId { .. } => "Rename the task to a role code plus number, e.g. MM1 or SC2a",
        Violation::TaskCount { .. } => "Regenerate with a different tasks_per_role range",
        Violation::RoleTooFewTasks { .. } => "Give the role at least two tasks",
        Violation::RoleTooManyTasks { .. } => "Move some of the role's tasks to other roles",
        Violation::LocationCount { .. } => "Add or remove locations to fit the player count",
        Violation::DanglingPrerequisite { .. } => "Point the prerequisite at an existing task, outcome or item",
        Violation::HiddenItemWithoutUnlock { .. } => "Add an unlock prerequisite or make the item visible",
        Violation::RoleWithoutStartingTask { .. } => "Clear the prerequisites of the role's first task",
        _ => return None,
    })
}

fn chain(ids: &[TaskId]) -> String {
    ids.iter().map(TaskId::as_str).collect::<Vec<_>>().join(" -> ")
}

fn graph_issues(analysis: &Analysis, issues: &mut Vec<Issue>) {
    if !analysis.cycles.is_empty() {
        let mut issue = Issue::new(26, Severity::Critical, ErrorClass::Graph, "Circular Dependencies")
            .suggest("Remove one task prerequisite from each cycle");
        issue.details = analysis.cycles.iter().map(|c| chain(c)).collect();
        issues.push(issue);
    }
    if !analysis.orphans.is_empty() {
        let mut issue = Issue::new(27, Severity::Critical, ErrorClass::Graph, "Unreachable Tasks")
            .suggest("Make sure every prerequisite is provided by a reachable task");
        issue.details = analysis
            .orphans
            .iter()
            .map(|t| format!("{t} can never become available"))
            .collect();
        issues.push(issue);
    }
    if !analysis.dead_ends.is_empty() {
        let mut issue = Issue::new(28, Severity::Important, ErrorClass::Graph, "Dead-End Tasks")
            .suggest("Use the task's id, outcome or item as a prerequisite of a later task");
        issue.details = analysis
            .dead_ends
            .iter()
            .map(|t| format!("{t} unlocks nothing"))
            .collect();
        issues.push(issue);
    }
}

fn simulation_issues(simulation: &SimulationResult, issues: &mut Vec<Issue>) {
    for found in &simulation.issues {
        let rule = found.rule.number();
        match issues
            .iter_mut()
            .find(|i| i.rule == rule && i.severity == found.severity && i.title == found.rule.title())
        {
            Some(issue) => issue.details.push(found.message.clone()),
            None => {
                let mut issue = Issue::new(rule, found.severity, ErrorClass::Playability, found.rule.title());
                let text = match found.rule {
                    SimRule::Deadlock | SimRule::Timeout => {
                        "Check the analyzer's unreachable tasks and cycles"
                    }
                    SimRule::EarlyEngagement => "Give the role a starting task with no prerequisites",
                    SimRule::IdleStreak => "Add independent tasks for the role mid-game",
                    SimRule::WorkloadSkew => "Move some of the role's tasks earlier in the chain",
                    SimRule::Concurrency => "Reduce cross-role prerequisites so roles can work in parallel",
                };
                issue = issue.suggest(text);
                issue.details.push(found.message.clone());
                issues.push(issue);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ids::{ItemId, RoleId};

    fn fix_report(violations: Vec<Violation>, warnings: Vec<Violation>) -> FixReport {
        FixReport {
            valid: violations.is_empty(),
            iterations: 1,
            violations,
            warnings,
            fixes: vec!["Set item_1.hidden = false (was hidden with no unlock)".to_string()],
        }
    }

    #[test]
    fn clean_run_passes() {
        let report = ScenarioReport::build("bank_job", &fix_report(vec![], vec![]), None, None);
        assert!(report.passed());
        assert!(report.issues.is_empty());
        assert!(report.summary().contains("PASSED"));
        assert!(report.summary().contains("1 fix(es)"));
    }

    #[test]
    fn violations_of_one_kind_are_grouped() {
        let violations = vec![
            Violation::HiddenItemWithoutUnlock { item: ItemId::from("item_1") },
            Violation::HiddenItemWithoutUnlock { item: ItemId::from("item_2") },
        ];
        let warnings = vec![Violation::RoleTooFewTasks {
            role: RoleId::from("driver"),
            count: 1,
        }];
        let report = ScenarioReport::build("x", &fix_report(violations, warnings), None, None);
        assert!(!report.passed());
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].rule, 25);
        assert_eq!(report.issues[0].details.len(), 2);
        assert_eq!(report.issues[0].message, "2 occurrences");
        assert_eq!(report.issues[1].severity, Severity::Important);
        assert_eq!(report.count(Severity::Important), 1);
    }

    #[test]
    fn graph_findings_become_numbered_issues() {
        let analysis = Analysis {
            cycles: vec![vec![TaskId::from("H2"), TaskId::from("H2")]],
            dead_ends: vec![TaskId::from("H1")],
            ..Analysis::default()
        };
        let report = ScenarioReport::build("x", &fix_report(vec![], vec![]), Some(&analysis), None);
        assert!(report.has_rule(26));
        assert!(report.has_rule(28));
        assert!(!report.has_rule(27));
        assert_eq!(report.issues[0].message, "H2 -> H2");
        assert!(!report.passed());
        assert!(report.to_string().contains("CRITICAL (1):"));
    }
}
