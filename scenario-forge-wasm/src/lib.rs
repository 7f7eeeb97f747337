//! WASM bindings for scenario-forge — powers the scenario playground.

use wasm_bindgen::prelude::*;

use scenario_forge::core::analyzer::{Analysis, GraphAnalyzer};
use scenario_forge::core::enrich::GrammarEnricher;
use scenario_forge::core::pipeline::{PipelineError, ScenarioForge};
use scenario_forge::core::prose::ProseGrammar;
use scenario_forge::core::report::ScenarioReport;
use scenario_forge::core::simulator::{simulate_graph, SelectionStrategy, SimulationResult};
use scenario_forge::schema::catalog::RoleCatalog;
use scenario_forge::schema::config::GeneratorConfig;
use scenario_forge::schema::graph::ScenarioGraph;
use scenario_forge::schema::ids::RoleId;
use scenario_forge::schema::template::WorldTemplates;

// ---------------------------------------------------------------------------
// Embedded heist data — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const HEIST_CATALOG: &str = include_str!("../../scenario_data/heist/catalog.ron");
    pub const HEIST_GENERATOR: &str = include_str!("../../scenario_data/heist/generator.ron");
    pub const HEIST_TEMPLATES: &str = include_str!("../../scenario_data/heist/templates.ron");
    pub const HEIST_PROSE: &str = include_str!("../../scenario_data/heist/prose.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Deserialize)]
struct ForgeInput {
    scenario_id: String,
    roles: Vec<String>,
    /// Use the player-count defaults instead of the bundled generator knobs.
    #[serde(default)]
    scaled: bool,
}

#[derive(serde::Serialize)]
struct ForgeOutput<'a> {
    attempt: u32,
    graph: &'a ScenarioGraph,
    report: &'a ScenarioReport,
}

#[derive(serde::Serialize)]
struct CheckOutput<'a> {
    graph: &'a ScenarioGraph,
    report: &'a ScenarioReport,
    analysis: &'a Analysis,
    simulation: &'a SimulationResult,
}

#[derive(serde::Serialize)]
struct RoleInfo {
    id: String,
    code: String,
    minigames: Vec<String>,
}

fn js_err(context: &str, e: impl std::fmt::Display) -> JsError {
    JsError::new(&format!("{context}: {e}"))
}

fn parse_strategy(name: &str, seed: u64) -> Result<SelectionStrategy, JsError> {
    match name.to_lowercase().as_str() {
        "round_robin" | "" => Ok(SelectionStrategy::RoundRobin),
        "greedy" => Ok(SelectionStrategy::Greedy),
        "random" => Ok(SelectionStrategy::Random { seed }),
        other => Err(JsError::new(&format!("Unknown strategy: {other}"))),
    }
}

// ---------------------------------------------------------------------------
// ScenarioDemo — the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct ScenarioDemo {
    catalog: RoleCatalog,
    config: GeneratorConfig,
    templates: WorldTemplates,
    prose: ProseGrammar,
    seed: u64,
}

#[wasm_bindgen]
impl ScenarioDemo {
    /// Create a demo instance backed by the bundled heist data.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> Result<ScenarioDemo, JsError> {
        let catalog = RoleCatalog::parse_ron(data::HEIST_CATALOG)
            .map_err(|e| js_err("Catalog parse error", e))?;
        let config = GeneratorConfig::parse_ron(data::HEIST_GENERATOR)
            .map_err(|e| js_err("Config parse error", e))?;
        let templates = WorldTemplates::parse_ron(data::HEIST_TEMPLATES)
            .map_err(|e| js_err("Template parse error", e))?;
        let prose = ProseGrammar::parse_ron(data::HEIST_PROSE)
            .map_err(|e| js_err("Prose parse error", e))?;
        Ok(ScenarioDemo {
            catalog,
            config,
            templates,
            prose,
            seed,
        })
    }

    /// Forge a playable scenario from a JSON request.
    ///
    /// Expected JSON shape:
    /// ```json
    /// { "scenario_id": "museum_heist", "roles": ["mastermind", "hacker"] }
    /// ```
    pub fn forge(&mut self, request_json: &str) -> Result<String, JsError> {
        let input: ForgeInput = serde_json::from_str(request_json)
            .map_err(|e| js_err("Invalid request JSON", e))?;
        let roles: Vec<RoleId> = input.roles.iter().map(|r| RoleId::from(r.as_str())).collect();

        let mut builder = ScenarioForge::builder()
            .seed(self.seed)
            .with_catalog(self.catalog.clone())
            .with_templates(self.templates.clone())
            .with_enricher(Box::new(GrammarEnricher::new(self.prose.clone(), self.seed)));
        if !input.scaled {
            builder = builder.with_config(self.config.clone());
        }
        let mut forge = builder.build().map_err(|e| js_err("Pipeline build error", e))?;

        let forged = match forge.forge(&input.scenario_id, &roles) {
            Ok(forged) => forged,
            Err(PipelineError::Exhausted { report, .. }) => {
                return Err(JsError::new(&report.to_string()));
            }
            Err(e) => return Err(js_err("Forge error", e)),
        };
        self.seed = self.seed.wrapping_add(1);

        let output = ForgeOutput {
            attempt: forged.attempt,
            graph: &forged.graph,
            report: forged.report(),
        };
        serde_json::to_string(&output).map_err(|e| js_err("Serialization error", e))
    }

    /// Repair, analyze and simulate a scenario graph given as JSON.
    /// Returns the repaired graph with its report, analysis and simulation.
    pub fn check(&self, graph_json: &str, strategy: &str) -> Result<String, JsError> {
        let mut graph: ScenarioGraph =
            serde_json::from_str(graph_json).map_err(|e| js_err("Invalid graph JSON", e))?;
        let forge = ScenarioForge::builder()
            .with_catalog(self.catalog.clone())
            .strategy(parse_strategy(strategy, self.seed)?)
            .build()
            .map_err(|e| js_err("Pipeline build error", e))?;
        let assessment = forge.check(&mut graph);

        let output = CheckOutput {
            graph: &graph,
            report: &assessment.report,
            analysis: &assessment.analysis,
            simulation: &assessment.simulation,
        };
        serde_json::to_string(&output).map_err(|e| js_err("Serialization error", e))
    }

    /// Simulate a scenario graph as-is, without repairs.
    pub fn simulate(&self, graph_json: &str, strategy: &str, max_turns: usize) -> Result<String, JsError> {
        let graph: ScenarioGraph =
            serde_json::from_str(graph_json).map_err(|e| js_err("Invalid graph JSON", e))?;
        let result = simulate_graph(&graph, parse_strategy(strategy, self.seed)?, max_turns);
        serde_json::to_string(&result).map_err(|e| js_err("Serialization error", e))
    }

    /// Graph analysis of a scenario given as JSON.
    pub fn analyze(&self, graph_json: &str) -> Result<String, JsError> {
        let graph: ScenarioGraph =
            serde_json::from_str(graph_json).map_err(|e| js_err("Invalid graph JSON", e))?;
        let analysis = GraphAnalyzer::from_graph(&graph).analyze_all();
        serde_json::to_string(&analysis).map_err(|e| js_err("Serialization error", e))
    }

    /// Return JSON array of the catalog's roles with codes and minigames.
    pub fn roles(&self) -> String {
        let roles: Vec<RoleInfo> = self
            .catalog
            .roles
            .iter()
            .map(|r| RoleInfo {
                id: r.id.to_string(),
                code: r.code.clone(),
                minigames: r.minigames.iter().map(|m| m.to_string()).collect(),
            })
            .collect();
        serde_json::to_string(&roles).unwrap_or_else(|_| "[]".to_string())
    }

    /// Return JSON array of the simulator strategies.
    pub fn strategies() -> String {
        serde_json::to_string(&["round_robin", "greedy", "random"])
            .unwrap_or_else(|_| "[]".to_string())
    }

    /// Reset the demo seed.
    pub fn reset(&mut self, seed: u64) {
        self.seed = seed;
    }
}
