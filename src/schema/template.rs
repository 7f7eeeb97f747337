//! World templates: the locations, objective and NPC archetypes the
//! generator draws from for each scenario family.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("family '{0}' has no locations")]
    EmptyFamily(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationTemplate {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcTemplate {
    pub id: String,
    pub name: String,
    pub occupation: String,
    pub personality: String,
}

/// A scenario family, matched when its keyword appears in the scenario id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyTemplate {
    pub keyword: String,
    pub objective: String,
    pub locations: Vec<LocationTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldTemplates {
    pub families: Vec<FamilyTemplate>,
    /// Used when no family keyword matches.
    pub fallback: FamilyTemplate,
    pub npcs: Vec<NpcTemplate>,
}

impl WorldTemplates {
    pub fn load_from_ron(path: &Path) -> Result<Self, TemplateError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, TemplateError> {
        let templates: WorldTemplates = ron::from_str(input)?;
        for family in templates.families.iter().chain(std::iter::once(&templates.fallback)) {
            if family.locations.is_empty() {
                return Err(TemplateError::EmptyFamily(family.keyword.clone()));
            }
        }
        Ok(templates)
    }

    /// First family whose keyword is contained in `scenario_id`.
    pub fn family_for(&self, scenario_id: &str) -> &FamilyTemplate {
        self.families
            .iter()
            .find(|f| scenario_id.contains(f.keyword.as_str()))
            .unwrap_or(&self.fallback)
    }

    pub fn heist_default() -> Self {
        let loc = |id: &str, name: &str, category: &str, description: &str| LocationTemplate {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            description: description.to_string(),
        };
        let npc = |id: &str, name: &str, occupation: &str, personality: &str| NpcTemplate {
            id: id.to_string(),
            name: name.to_string(),
            occupation: occupation.to_string(),
            personality: personality.to_string(),
        };
        Self {
            families: vec![
                FamilyTemplate {
                    keyword: "museum".to_string(),
                    objective: "Steal the priceless artifact from the museum vault".to_string(),
                    locations: vec![
                        loc("entrance_hall", "Entrance Hall", "Museum Interior", "Grand entrance with security"),
                        loc("exhibit_floor", "Exhibit Floor", "Museum Interior", "Main gallery with displays"),
                        loc("storage_room", "Storage Room", "Museum Interior", "Back storage area"),
                        loc("security_office", "Security Office", "Museum Interior", "Security monitoring room"),
                        loc("vault_chamber", "Vault Chamber", "Museum Interior", "Secure vault room"),
                        loc("rooftop", "Rooftop Access", "Museum Exterior", "Rooftop entrance point"),
                        loc("loading_dock", "Loading Dock", "Museum Exterior", "Service entrance"),
                    ],
                },
                FamilyTemplate {
                    keyword: "bank".to_string(),
                    objective: "Infiltrate the bank and access the vault".to_string(),
                    locations: vec![
                        loc("lobby", "Bank Lobby", "Bank Interior", "Main customer area"),
                        loc("teller_area", "Teller Area", "Bank Interior", "Transaction stations"),
                        loc("manager_office", "Manager Office", "Bank Interior", "Bank manager workspace"),
                        loc("server_room", "Server Room", "Bank Interior", "IT infrastructure"),
                        loc("vault", "Vault", "Bank Interior", "Main vault"),
                        loc("parking_garage", "Parking Garage", "Bank Exterior", "Underground parking"),
                    ],
                },
                FamilyTemplate {
                    keyword: "office".to_string(),
                    objective: "Steal confidential documents from the executive suite".to_string(),
                    locations: vec![
                        loc("reception", "Reception Area", "Office Interior", "Front desk"),
                        loc("cubicle_farm", "Cubicle Farm", "Office Interior", "Open workspace"),
                        loc("executive_suite", "Executive Suite", "Office Interior", "C-level offices"),
                        loc("server_room", "Server Room", "Office Interior", "Data center"),
                        loc("archive_room", "Archive Room", "Office Interior", "Document storage"),
                        loc("rooftop", "Rooftop", "Office Exterior", "Roof access"),
                    ],
                },
            ],
            fallback: FamilyTemplate {
                keyword: "generic".to_string(),
                objective: "Complete the heist successfully".to_string(),
                locations: vec![
                    loc("entry_point", "Entry Point", "Exterior", "Initial access point"),
                    loc("main_area", "Main Area", "Interior", "Primary area"),
                    loc("secure_area", "Secure Area", "Interior", "Restricted zone"),
                    loc("target_room", "Target Room", "Interior", "Final objective room"),
                ],
            },
            npcs: vec![
                npc("security_guard", "Security Guard", "guard", "Cautious and rule-following"),
                npc("janitor", "Janitor", "maintenance", "Friendly but observant"),
                npc("curator", "Curator", "curator", "Knowledgeable and proud"),
                npc("receptionist", "Receptionist", "receptionist", "Professional and helpful"),
                npc("it_specialist", "IT Specialist", "IT", "Technical and distracted"),
                npc("manager", "Manager", "manager", "Busy and authoritative"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_matches_keyword() {
        let templates = WorldTemplates::heist_default();
        assert_eq!(templates.family_for("midnight_museum_job").keyword, "museum");
        assert_eq!(templates.family_for("first_bank_run").locations.len(), 6);
        assert_eq!(templates.family_for("casino").keyword, "generic");
    }

    #[test]
    fn rejects_empty_family() {
        let input = r#"(
            families: [],
            fallback: (keyword: "generic", objective: "Win", locations: []),
            npcs: [],
        )"#;
        assert!(matches!(
            WorldTemplates::parse_ron(input),
            Err(TemplateError::EmptyFamily(_))
        ));
    }

    #[test]
    fn bundled_templates_match_default() {
        let templates =
            WorldTemplates::load_from_ron(Path::new("scenario_data/heist/templates.ron")).unwrap();
        assert_eq!(templates, WorldTemplates::heist_default());
    }
}
