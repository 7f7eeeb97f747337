/// Scenario Generator — forges a playable scenario and writes it as RON.
///
/// Usage: generate_scenario <scenario_id> <role>... [--seed <n>] [--template <name>]
///                          [--attempts <n>] [--out <file>]

use ron::ser::PrettyConfig;
use scenario_forge::core::pipeline::{PipelineError, ScenarioForge};
use scenario_forge::schema::ids::RoleId;
use std::process;

fn usage() -> ! {
    println!(
        "Usage: generate_scenario <scenario_id> <role>... [--seed <n>] [--template <name>] \
         [--attempts <n>] [--out <file>]"
    );
    process::exit(0);
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 || args[1] == "--help" || args[1] == "-h" {
        usage();
    }

    let scenario_id = args[1].clone();
    let mut roles = Vec::new();
    let mut seed = None;
    let mut template = None;
    let mut attempts = 3u32;
    let mut out_path = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().ok();
            }
            "--template" if i + 1 < args.len() => {
                i += 1;
                template = Some(args[i].clone());
            }
            "--attempts" if i + 1 < args.len() => {
                i += 1;
                attempts = args[i].parse().unwrap_or(3);
            }
            "--out" if i + 1 < args.len() => {
                i += 1;
                out_path = Some(args[i].clone());
            }
            flag if flag.starts_with("--") => {
                eprintln!("Unknown argument: {}", flag);
                process::exit(1);
            }
            role => roles.push(RoleId::from(role)),
        }
        i += 1;
    }

    let mut builder = ScenarioForge::builder().max_attempts(attempts);
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }
    if let Some(ref name) = template {
        builder = builder.data_templates(&[name.as_str()]);
    }
    let mut forge = match builder.build() {
        Ok(forge) => forge,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let forged = match forge.forge(&scenario_id, &roles) {
        Ok(forged) => forged,
        Err(PipelineError::Exhausted { attempts, report }) => {
            eprintln!("ERROR: no playable scenario after {} attempt(s)\n", attempts);
            eprintln!("{}", report);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let text = match ron::ser::to_string_pretty(&forged.graph, PrettyConfig::default()) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("ERROR: failed to serialize scenario: {}", e);
            process::exit(1);
        }
    };

    match out_path {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, text) {
                eprintln!("ERROR: failed to write '{}': {}", path, e);
                process::exit(1);
            }
            println!("Wrote {} ({} tasks) to {}", scenario_id, forged.graph.tasks.len(), path);
        }
        None => println!("{}", text),
    }

    eprintln!("{}", forged.report());
}
