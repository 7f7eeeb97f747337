/// Scenario checks over hand-written fixture graphs.

use scenario_forge::core::analyzer::GraphAnalyzer;
use scenario_forge::core::fixer::Fixer;
use scenario_forge::core::simulator::{simulate, SelectionStrategy, SimOutcome};
use scenario_forge::core::validator::{Validator, Violation};
use scenario_forge::schema::catalog::RoleCatalog;
use scenario_forge::schema::graph::ScenarioGraph;
use scenario_forge::schema::ids::{ItemId, RoleId, TaskId};
use std::path::Path;

fn load(name: &str) -> ScenarioGraph {
    let path = Path::new("tests/fixtures").join(name);
    let contents = std::fs::read_to_string(path).unwrap();
    ron::from_str(&contents).unwrap()
}

fn ids(list: &[&str]) -> Vec<TaskId> {
    list.iter().map(|s| TaskId::from(*s)).collect()
}

#[test]
fn self_prerequisite_is_a_one_cycle_the_fixer_leaves_alone() {
    let mut graph = load("self_loop.ron");
    let catalog = RoleCatalog::heist_default();

    let report = Fixer::new(&catalog).validate_and_fix(&mut graph, 10);
    assert!(report.valid);
    assert!(report.fixes.is_empty());

    let analyzer = GraphAnalyzer::from_graph(&graph);
    assert_eq!(analyzer.find_cycles(), vec![ids(&["H2", "H2"])]);
    assert_eq!(analyzer.find_orphans(), ids(&["H2"]));

    let task = graph.task(&TaskId::from("H2")).unwrap();
    assert_eq!(task.prerequisites.len(), 1);
}

#[test]
fn hidden_item_without_unlock_is_revealed_after_one_pass() {
    let mut graph = load("hidden_no_unlock.ron");
    let catalog = RoleCatalog::heist_default();
    let validator = Validator::new(&catalog);

    let before = validator.validate(&graph);
    assert_eq!(
        before,
        vec![Violation::HiddenItemWithoutUnlock {
            item: ItemId::from("item_3")
        }]
    );

    let report = Fixer::new(&catalog).validate_and_fix(&mut graph, 1);
    assert!(report.valid);
    assert_eq!(report.iterations, 1);
    let item = graph.item(&ItemId::from("item_3")).unwrap();
    assert!(!item.hidden);
    assert!(validator.validate(&graph).is_empty());
}

#[test]
fn role_stuck_behind_unreachable_task_is_orphaned() {
    let graph = load("unreachable_role.ron");
    let analyzer = GraphAnalyzer::from_graph(&graph);
    let orphans = analyzer.find_orphans();

    let driver = RoleId::from("driver");
    let driver_orphans: Vec<&TaskId> = graph
        .tasks_for_role(&driver)
        .map(|t| &t.id)
        .filter(|id| orphans.contains(id))
        .collect();
    assert_eq!(driver_orphans.len(), 5);
    assert!(orphans.contains(&TaskId::from("T0")));
    assert!(!orphans.contains(&TaskId::from("H1")));
    assert!(analyzer.find_cycles().is_empty());
}

#[test]
fn two_step_relay_wins_in_two_turns() {
    let graph = load("two_step_relay.ron");
    let result = simulate(
        &graph.tasks,
        &graph.roles,
        SelectionStrategy::RoundRobin,
        100,
    );
    assert_eq!(result.outcome, SimOutcome::Win);
    assert_eq!(result.total_turns, 2);
    assert_eq!(result.turns[0].task, TaskId::from("H1"));
    assert_eq!(result.turns[1].task, TaskId::from("D1"));
}

#[test]
fn unreachable_role_deadlocks_in_simulation() {
    let graph = load("unreachable_role.ron");
    let result = simulate(&graph.tasks, &graph.roles, SelectionStrategy::Greedy, 100);
    assert_eq!(result.outcome, SimOutcome::Deadlock);
    assert_eq!(result.remaining_tasks, 6);
    assert!(result.has_critical());
}

#[test]
fn clean_fixture_passes_every_stage() {
    let mut graph = load("bank_two_roles.ron");
    let catalog = RoleCatalog::heist_default();
    let report = Fixer::new(&catalog).validate_and_fix(&mut graph, 10);
    assert!(report.valid);
    assert_eq!(report.iterations, 0);

    let analysis = GraphAnalyzer::from_graph(&graph).analyze_all();
    assert!(analysis.is_sound());

    for strategy in [
        SelectionStrategy::RoundRobin,
        SelectionStrategy::Greedy,
        SelectionStrategy::Random { seed: 17 },
    ] {
        let result = simulate(&graph.tasks, &graph.roles, strategy, 100);
        assert_eq!(result.outcome, SimOutcome::Win);
        assert_eq!(result.total_turns, graph.tasks.len());
    }
}
