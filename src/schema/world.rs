use serde::{Deserialize, Serialize};

use super::ids::{ItemId, LocationId, NpcId, OutcomeId};
use super::prerequisite::Prerequisite;

/// A place tasks, items and NPCs can be found in. Leaf node of the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub description: String,
    pub category: String,
}

/// An object that search tasks can turn up.
///
/// A hidden item only becomes discoverable once every entry in
/// `unlock_prerequisites` holds, so `hidden` with an empty unlock list
/// is an item nobody can ever find.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub location: LocationId,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub unlock_prerequisites: Vec<Prerequisite>,
}

impl Item {
    /// Returns true if the item is hidden with no way to unlock it.
    pub fn is_undiscoverable(&self) -> bool {
        self.hidden && self.unlock_prerequisites.is_empty()
    }
}

/// How sure an NPC is about what it knows or how willing it is to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Confidence {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::VeryHigh => "VERY HIGH",
        }
    }
}

/// Something an NPC knows. Entries without an outcome id are flavor
/// text and are not tracked by the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcInfo {
    pub outcome: Option<OutcomeId>,
    pub confidence: Confidence,
    #[serde(default)]
    pub description: String,
}

/// Something an NPC can be talked into doing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcAction {
    pub outcome: OutcomeId,
    pub confidence: Confidence,
    #[serde(default)]
    pub description: String,
}

/// A non-player character that conversation tasks target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub id: NpcId,
    pub name: String,
    /// In-world occupation ("guard", "curator"), not a player role.
    pub occupation: String,
    pub personality: String,
    pub location: LocationId,
    #[serde(default)]
    pub information_known: Vec<NpcInfo>,
    #[serde(default)]
    pub actions_available: Vec<NpcAction>,
}

impl Npc {
    /// The NPC's outcome set: tracked information first, then actions,
    /// each in declaration order.
    pub fn outcomes(&self) -> impl Iterator<Item = &OutcomeId> + '_ {
        self.information_known
            .iter()
            .filter_map(|info| info.outcome.as_ref())
            .chain(self.actions_available.iter().map(|action| &action.outcome))
    }

    pub fn first_outcome(&self) -> Option<&OutcomeId> {
        self.outcomes().next()
    }

    pub fn provides(&self, outcome: &OutcomeId) -> bool {
        self.outcomes().any(|o| o == outcome)
    }
}
