/// The scenario pipeline: generate, fix, analyze, simulate, enrich.
///
/// Each attempt generates a fresh graph from a derived seed. The first
/// graph whose report has no CRITICAL issue is enriched and returned.

use log::{info, warn};
use std::path::Path;
use thiserror::Error;

use crate::core::analyzer::{Analysis, GraphAnalyzer};
use crate::core::enrich::{apply_enrichment, ContentEnricher, GrammarEnricher};
use crate::core::fixer::Fixer;
use crate::core::generator::{GeneratorError, ScenarioGenerator};
use crate::core::prose::{ProseError, ProseGrammar};
use crate::core::report::ScenarioReport;
use crate::core::simulator::{simulate_graph, SelectionStrategy, SimulationResult};
use crate::schema::catalog::{CatalogError, RoleCatalog};
use crate::schema::config::{ConfigError, GeneratorConfig};
use crate::schema::graph::ScenarioGraph;
use crate::schema::ids::RoleId;
use crate::schema::template::{TemplateError, WorldTemplates};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("generator error: {0}")]
    Generator(#[from] GeneratorError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("prose error: {0}")]
    Prose(#[from] ProseError),
    #[error("no playable scenario after {attempts} attempt(s): {}", .report.summary())]
    Exhausted {
        attempts: u32,
        /// Report of the last rejected attempt, fix history included.
        report: Box<ScenarioReport>,
    },
}

/// Everything the checking stages found for one graph.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub report: ScenarioReport,
    pub analysis: Analysis,
    pub simulation: SimulationResult,
}

/// An accepted scenario.
#[derive(Debug, Clone)]
pub struct Forged {
    pub graph: ScenarioGraph,
    pub assessment: Assessment,
    /// 1-based attempt that produced the graph.
    pub attempt: u32,
}

impl Forged {
    pub fn report(&self) -> &ScenarioReport {
        &self.assessment.report
    }
}

/// The top-level scenario pipeline. Built via `ScenarioForge::builder()`.
pub struct ScenarioForge {
    catalog: RoleCatalog,
    templates: WorldTemplates,
    config: Option<GeneratorConfig>,
    enricher: Option<Box<dyn ContentEnricher>>,
    max_fix_iterations: usize,
    max_attempts: u32,
    strategy: SelectionStrategy,
    max_turns: usize,
    seed: Option<u64>,
}

/// Builder for constructing a `ScenarioForge`.
pub struct ScenarioForgeBuilder {
    data_dir: String,
    data_templates: Vec<String>,
    catalog: Option<RoleCatalog>,
    config: Option<GeneratorConfig>,
    templates: Option<WorldTemplates>,
    prose: Option<ProseGrammar>,
    enricher: Option<Box<dyn ContentEnricher>>,
    max_fix_iterations: usize,
    max_attempts: u32,
    strategy: SelectionStrategy,
    max_turns: usize,
    seed: Option<u64>,
}

impl ScenarioForge {
    pub fn builder() -> ScenarioForgeBuilder {
        ScenarioForgeBuilder {
            data_dir: "scenario_data".to_string(),
            data_templates: Vec::new(),
            catalog: None,
            config: None,
            templates: None,
            prose: None,
            enricher: None,
            max_fix_iterations: 10,
            max_attempts: 3,
            strategy: SelectionStrategy::RoundRobin,
            max_turns: 500,
            seed: None,
        }
    }

    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    /// Generates scenarios until one passes or the attempt budget runs out.
    pub fn forge(&mut self, scenario_id: &str, roles: &[RoleId]) -> Result<Forged, PipelineError> {
        let config = self
            .config
            .clone()
            .unwrap_or_else(|| GeneratorConfig::for_player_count(roles.len()));
        let base = config.seed.or(self.seed).unwrap_or_else(rand::random);
        let mut last = None;

        for attempt in 0..self.max_attempts {
            // prime offset per attempt
            let seed = base.wrapping_add(attempt as u64 * 7919);
            let mut generator = ScenarioGenerator::new(
                config.clone().with_seed(seed),
                self.catalog.clone(),
                self.templates.clone(),
            )?;
            let mut graph = generator.generate(scenario_id, roles)?;
            let assessment = self.check(&mut graph);

            if assessment.report.passed() {
                if let Some(enricher) = self.enricher.as_mut() {
                    apply_enrichment(&mut graph, &mut **enricher);
                }
                info!(
                    "forged '{}' on attempt {} (seed {seed}): {}",
                    scenario_id,
                    attempt + 1,
                    assessment.report.summary()
                );
                return Ok(Forged {
                    graph,
                    assessment,
                    attempt: attempt + 1,
                });
            }

            warn!(
                "attempt {} for '{}' rejected: {}",
                attempt + 1,
                scenario_id,
                assessment.report.summary()
            );
            last = Some(assessment.report);
        }

        Err(PipelineError::Exhausted {
            attempts: self.max_attempts,
            report: Box::new(last.unwrap_or_default()),
        })
    }

    /// Repairs `graph` in place and runs the analyzer and simulator on the
    /// result.
    pub fn check(&self, graph: &mut ScenarioGraph) -> Assessment {
        let fix = Fixer::new(&self.catalog).validate_and_fix(graph, self.max_fix_iterations);
        let analysis = GraphAnalyzer::new(&graph.tasks).analyze_all();
        let simulation = simulate_graph(graph, self.strategy, self.max_turns);
        let report = ScenarioReport::build(&graph.scenario_id, &fix, Some(&analysis), Some(&simulation));
        Assessment {
            report,
            analysis,
            simulation,
        }
    }
}

impl ScenarioForgeBuilder {
    /// Directory holding `<template>/` data folders.
    pub fn data_dir(mut self, path: &str) -> Self {
        self.data_dir = path.to_string();
        self
    }

    /// Load `catalog.ron`, `generator.ron`, `templates.ron` and `prose.ron`
    /// from each named folder. Later templates override earlier ones.
    pub fn data_templates(mut self, templates: &[&str]) -> Self {
        self.data_templates = templates.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn max_fix_iterations(mut self, iterations: usize) -> Self {
        self.max_fix_iterations = iterations;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn max_turns(mut self, turns: usize) -> Self {
        self.max_turns = turns;
        self
    }

    /// Provide a catalog directly (for testing without files).
    pub fn with_catalog(mut self, catalog: RoleCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Provide generator knobs directly. Without this the knobs are
    /// derived from the player count.
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Provide world templates directly (for testing without files).
    pub fn with_templates(mut self, templates: WorldTemplates) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Provide a prose grammar for the built-in enricher.
    pub fn with_prose(mut self, prose: ProseGrammar) -> Self {
        self.prose = Some(prose);
        self
    }

    /// Use a custom enricher instead of the grammar one.
    pub fn with_enricher(mut self, enricher: Box<dyn ContentEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn build(self) -> Result<ScenarioForge, PipelineError> {
        let mut catalog = self.catalog;
        let mut config = self.config;
        let mut templates = self.templates;
        let mut prose = self.prose;

        for name in &self.data_templates {
            let dir = Path::new(&self.data_dir).join(name);

            let path = dir.join("catalog.ron");
            if path.exists() {
                catalog = Some(RoleCatalog::load_from_ron(&path)?);
            }
            let path = dir.join("generator.ron");
            if path.exists() {
                config = Some(GeneratorConfig::load_from_ron(&path)?);
            }
            let path = dir.join("templates.ron");
            if path.exists() {
                templates = Some(WorldTemplates::load_from_ron(&path)?);
            }
            let path = dir.join("prose.ron");
            if path.exists() {
                let loaded = ProseGrammar::load_from_ron(&path)?;
                match prose.as_mut() {
                    Some(existing) => existing.merge(loaded),
                    None => prose = Some(loaded),
                }
            }
        }

        if let Some(config) = &config {
            config.validate()?;
        }

        let enricher = match (self.enricher, prose) {
            (Some(enricher), _) => Some(enricher),
            (None, Some(grammar)) => {
                let seed = self.seed.unwrap_or_else(rand::random);
                Some(Box::new(GrammarEnricher::new(grammar, seed)) as Box<dyn ContentEnricher>)
            }
            (None, None) => None,
        };

        Ok(ScenarioForge {
            catalog: catalog.unwrap_or_else(RoleCatalog::heist_default),
            templates: templates.unwrap_or_else(WorldTemplates::heist_default),
            config,
            enricher,
            max_fix_iterations: self.max_fix_iterations,
            max_attempts: self.max_attempts,
            strategy: self.strategy,
            max_turns: self.max_turns,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::enrich::{ContentPatch, EnrichError, EntityRef};

    fn roster(names: &[&str]) -> Vec<RoleId> {
        names.iter().map(|s| RoleId::from(*s)).collect()
    }

    struct Renamer;

    impl ContentEnricher for Renamer {
        fn enrich(&mut self, graph: &ScenarioGraph) -> Result<Vec<ContentPatch>, EnrichError> {
            Ok(graph
                .locations
                .iter()
                .map(|l| ContentPatch {
                    target: EntityRef::Location(l.id.clone()),
                    name: Some(format!("The {}", l.name)),
                    description: None,
                })
                .collect())
        }
    }

    #[test]
    fn forge_accepts_first_playable_graph() {
        let mut forge = ScenarioForge::builder().seed(42).build().unwrap();
        let forged = forge
            .forge("museum_heist", &roster(&["mastermind", "hacker", "safe_cracker"]))
            .unwrap();
        assert!(forged.report().passed());
        assert!(forged.assessment.analysis.is_sound());
        assert!(forged.assessment.simulation.is_win());
        assert_eq!(forged.graph.roles.len(), 3);
    }

    #[test]
    fn forge_is_deterministic_for_a_seed() {
        let roles = roster(&["insider", "driver"]);
        let mut a = ScenarioForge::builder().seed(7).build().unwrap();
        let mut b = ScenarioForge::builder().seed(7).build().unwrap();
        let first = a.forge("bank_job", &roles).unwrap();
        let second = b.forge("bank_job", &roles).unwrap();
        assert_eq!(first.graph, second.graph);
        assert_eq!(first.attempt, second.attempt);
    }

    #[test]
    fn custom_enricher_runs_on_accepted_graph() {
        let mut forge = ScenarioForge::builder()
            .seed(3)
            .with_enricher(Box::new(Renamer))
            .build()
            .unwrap();
        let forged = forge.forge("office_job", &roster(&["grifter", "muscle"])).unwrap();
        assert!(forged.graph.locations.iter().all(|l| l.name.starts_with("The ")));
    }

    #[test]
    fn heist_data_template_loads() {
        let mut forge = ScenarioForge::builder()
            .data_templates(&["heist"])
            .seed(11)
            .build()
            .unwrap();
        let forged = forge.forge("bank_vault", &roster(&["hacker", "lookout"])).unwrap();
        assert!(forged.report().passed());
    }

    #[test]
    fn bad_roster_is_an_error_not_a_retry() {
        let mut forge = ScenarioForge::builder().seed(1).build().unwrap();
        let err = forge.forge("x", &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Generator(GeneratorError::NoRoles)));
    }

    #[test]
    fn zero_turn_budget_exhausts_attempts() {
        let mut forge = ScenarioForge::builder()
            .seed(5)
            .max_turns(0)
            .max_attempts(2)
            .build()
            .unwrap();
        match forge.forge("museum_heist", &roster(&["hacker", "driver"])) {
            Err(PipelineError::Exhausted { attempts, report }) => {
                assert_eq!(attempts, 2);
                assert!(report.has_rule(30));
            }
            other => panic!("expected exhaustion, got {:?}", other.map(|f| f.attempt)),
        }
    }
}
