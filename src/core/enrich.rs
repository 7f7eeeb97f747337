//! Content enrichment: replacing placeholder display text without
//! touching ids or structure.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::prose::{ProseError, ProseGrammar};
use crate::schema::graph::ScenarioGraph;
use crate::schema::ids::{ItemId, LocationId, NpcId, TaskId};

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("prose error: {0}")]
    Prose(#[from] ProseError),
    #[error("enrichment service failed: {0}")]
    Service(String),
}

/// The entity a patch applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityRef {
    Location(LocationId),
    Item(ItemId),
    Npc(NpcId),
    Task(TaskId),
}

/// New display text for one entity. `None` leaves the field alone.
/// Tasks have no name, so a task patch only uses `description`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPatch {
    pub target: EntityRef,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Something that can propose better names and descriptions for a graph,
/// such as a text-generation service.
pub trait ContentEnricher {
    fn enrich(&mut self, graph: &ScenarioGraph) -> Result<Vec<ContentPatch>, EnrichError>;
}

/// Runs `enricher` and applies its patches. Failures are logged and leave
/// the placeholder text in place. Returns the number of patches applied.
pub fn apply_enrichment(graph: &mut ScenarioGraph, enricher: &mut dyn ContentEnricher) -> usize {
    let patches = match enricher.enrich(graph) {
        Ok(patches) => patches,
        Err(e) => {
            warn!("enrichment of '{}' failed, keeping placeholders: {e}", graph.scenario_id);
            return 0;
        }
    };
    let applied = patches.iter().filter(|p| apply_patch(graph, p)).count();
    debug!("enrichment applied {applied}/{} patches", patches.len());
    applied
}

fn apply_patch(graph: &mut ScenarioGraph, patch: &ContentPatch) -> bool {
    fn set(field: &mut String, value: &Option<String>) {
        if let Some(value) = value {
            field.clone_from(value);
        }
    }

    match &patch.target {
        EntityRef::Location(id) => match graph.locations.iter_mut().find(|l| &l.id == id) {
            Some(location) => {
                set(&mut location.name, &patch.name);
                set(&mut location.description, &patch.description);
                true
            }
            None => false,
        },
        EntityRef::Item(id) => match graph.item_mut(id) {
            Some(item) => {
                set(&mut item.name, &patch.name);
                set(&mut item.description, &patch.description);
                true
            }
            None => false,
        },
        EntityRef::Npc(id) => match graph.npcs.iter_mut().find(|n| &n.id == id) {
            Some(npc) => {
                set(&mut npc.name, &patch.name);
                true
            }
            None => false,
        },
        EntityRef::Task(id) => match graph.task_mut(id) {
            Some(task) => {
                set(&mut task.description, &patch.description);
                true
            }
            None => false,
        },
    }
}

/// Built-in enricher that draws names and descriptions from a
/// [`ProseGrammar`].
pub struct GrammarEnricher {
    grammar: ProseGrammar,
    rng: StdRng,
}

impl GrammarEnricher {
    pub fn new(grammar: ProseGrammar, seed: u64) -> Self {
        Self {
            grammar,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn heist(seed: u64) -> Result<Self, EnrichError> {
        Ok(Self::new(ProseGrammar::heist_default()?, seed))
    }
}

impl ContentEnricher for GrammarEnricher {
    fn enrich(&mut self, graph: &ScenarioGraph) -> Result<Vec<ContentPatch>, EnrichError> {
        let mut patches = Vec::new();

        for location in &graph.locations {
            let description = self.grammar.expand(
                "location_description",
                &[
                    ("name", location.name.as_str()),
                    ("description", location.description.as_str()),
                ],
                &mut self.rng,
            )?;
            patches.push(ContentPatch {
                target: EntityRef::Location(location.id.clone()),
                name: None,
                description: Some(description),
            });
        }

        for item in &graph.items {
            let place = graph
                .location(&item.location)
                .map(|l| l.name.to_lowercase())
                .unwrap_or_else(|| item.location.as_str().replace('_', " "));
            let name = self.grammar.expand("item_name", &[], &mut self.rng)?;
            let description =
                self.grammar
                    .expand("item_description", &[("location", place.as_str())], &mut self.rng)?;
            patches.push(ContentPatch {
                target: EntityRef::Item(item.id.clone()),
                name: Some(name),
                description: Some(description),
            });
        }

        for npc in &graph.npcs {
            let name = self.grammar.expand(
                "npc_name",
                &[("occupation", npc.occupation.as_str())],
                &mut self.rng,
            )?;
            patches.push(ContentPatch {
                target: EntityRef::Npc(npc.id.clone()),
                name: Some(format!("{name} ({})", npc.name)),
                description: None,
            });
        }

        Ok(patches)
    }
}
