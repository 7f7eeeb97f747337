/// Scenario Linter — repairs, analyzes and simulates a RON scenario graph.
///
/// Usage: scenario_linter <scenario.ron> [--catalog <file>] [--strategy <round_robin|greedy|random>]
///                        [--seed <n>] [--max-turns <n>] [--write <file>]
///
/// Exits with status 1 if any CRITICAL issue remains.

use ron::ser::PrettyConfig;
use scenario_forge::core::pipeline::ScenarioForge;
use scenario_forge::core::simulator::SelectionStrategy;
use scenario_forge::schema::catalog::RoleCatalog;
use scenario_forge::schema::graph::ScenarioGraph;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!(
            "Usage: scenario_linter <scenario.ron> [--catalog <file>] \
             [--strategy <round_robin|greedy|random>] [--seed <n>] [--max-turns <n>] [--write <file>]"
        );
        process::exit(0);
    }

    let scenario_path = &args[1];
    let mut catalog_path = None;
    let mut strategy_name = "round_robin".to_string();
    let mut seed = 42u64;
    let mut max_turns = 500usize;
    let mut write_path = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" if i + 1 < args.len() => {
                i += 1;
                catalog_path = Some(args[i].clone());
            }
            "--strategy" if i + 1 < args.len() => {
                i += 1;
                strategy_name = args[i].clone();
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--max-turns" if i + 1 < args.len() => {
                i += 1;
                max_turns = args[i].parse().unwrap_or(500);
            }
            "--write" if i + 1 < args.len() => {
                i += 1;
                write_path = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let strategy = match strategy_name.as_str() {
        "round_robin" => SelectionStrategy::RoundRobin,
        "greedy" => SelectionStrategy::Greedy,
        "random" => SelectionStrategy::Random { seed },
        other => {
            eprintln!("ERROR: unknown strategy '{}'", other);
            process::exit(1);
        }
    };

    let mut graph: ScenarioGraph = match std::fs::read_to_string(scenario_path)
        .map_err(|e| e.to_string())
        .and_then(|text| ron::from_str(&text).map_err(|e| e.to_string()))
    {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("ERROR: Failed to load scenario '{}': {}", scenario_path, e);
            process::exit(1);
        }
    };

    let catalog = match catalog_path {
        Some(ref path) => match RoleCatalog::load_from_ron(Path::new(path)) {
            Ok(catalog) => catalog,
            Err(e) => {
                eprintln!("ERROR: Failed to load catalog: {}", e);
                process::exit(1);
            }
        },
        None => RoleCatalog::heist_default(),
    };

    let forge = match ScenarioForge::builder()
        .with_catalog(catalog)
        .strategy(strategy)
        .max_turns(max_turns)
        .build()
    {
        Ok(forge) => forge,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    println!(
        "Loaded '{}': {} roles, {} locations, {} items, {} NPCs, {} tasks",
        graph.scenario_id,
        graph.roles.len(),
        graph.locations.len(),
        graph.items.len(),
        graph.npcs.len(),
        graph.tasks.len()
    );

    let assessment = forge.check(&mut graph);
    let simulation = &assessment.simulation;

    println!("\n=== Scenario Report ===\n");
    print!("{}", assessment.report);

    println!("\n=== Simulation ===\n");
    println!("Outcome: {} after {} turns", simulation.outcome, simulation.total_turns);
    println!("{:<16} {:<8} {:<10} Timeline", "Role", "Tasks", "Max Idle");
    for stats in &simulation.roles {
        let mut timeline: Vec<String> = stats
            .completion_turns
            .iter()
            .take(10)
            .map(|t| t.to_string())
            .collect();
        if stats.completion_turns.len() > 10 {
            timeline.push(format!("... ({} total)", stats.completion_turns.len()));
        }
        println!(
            "{:<16} {:<8} {:<10} {}",
            stats.role.as_str(),
            stats.completed,
            stats.max_idle_streak,
            timeline.join(", ")
        );
    }
    println!(
        "Average roles with work: {:.1} / {}",
        simulation.average_active(),
        simulation.roles.len()
    );

    let critical_path = &assessment.analysis.critical_path;
    if !critical_path.is_empty() {
        let path: Vec<&str> = critical_path.iter().map(|t| t.as_str()).collect();
        println!("Critical path ({}): {}", path.len(), path.join(" -> "));
    }

    if let Some(path) = write_path {
        match ron::ser::to_string_pretty(&graph, PrettyConfig::default()) {
            Ok(text) => {
                if let Err(e) = std::fs::write(&path, text) {
                    eprintln!("ERROR: failed to write '{}': {}", path, e);
                    process::exit(1);
                }
                println!("\nWrote repaired scenario to {}", path);
            }
            Err(e) => {
                eprintln!("ERROR: failed to serialize scenario: {}", e);
                process::exit(1);
            }
        }
    }

    if !assessment.report.passed() {
        process::exit(1);
    }
}
