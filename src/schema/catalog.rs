//! Role catalog: the task-id code and valid minigames for each role.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::ids::{MinigameId, RoleId};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("duplicate catalog entry for role '{0}'")]
    DuplicateRole(RoleId),
    #[error("role '{role}' has code '{code}', expected 1-3 uppercase letters")]
    InvalidCode { role: RoleId, code: String },
    #[error("code '{code}' of role '{role}' is already taken")]
    DuplicateCode { role: RoleId, code: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub id: RoleId,
    /// Prefix used for this role's task ids, e.g. `SC` for `SC3`.
    pub code: String,
    pub minigames: Vec<MinigameId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleCatalog {
    pub roles: Vec<RoleEntry>,
}

impl RoleCatalog {
    pub fn load_from_ron(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, CatalogError> {
        let catalog: RoleCatalog = ron::from_str(input)?;
        for (i, entry) in catalog.roles.iter().enumerate() {
            let earlier = &catalog.roles[..i];
            if earlier.iter().any(|e| e.id == entry.id) {
                return Err(CatalogError::DuplicateRole(entry.id.clone()));
            }
            if !is_valid_code(&entry.code) {
                return Err(CatalogError::InvalidCode {
                    role: entry.id.clone(),
                    code: entry.code.clone(),
                });
            }
            // Task ids are prefixed with the code, so sharing one would merge id spaces.
            if earlier.iter().any(|e| e.code == entry.code) {
                return Err(CatalogError::DuplicateCode {
                    role: entry.id.clone(),
                    code: entry.code.clone(),
                });
            }
        }
        Ok(catalog)
    }

    /// The built-in heist crew.
    pub fn heist_default() -> Self {
        let entry = |id: &str, code: &str, minigames: &[&str]| RoleEntry {
            id: RoleId::from(id),
            code: code.to_string(),
            minigames: minigames.iter().map(|m| MinigameId::from(*m)).collect(),
        };
        Self {
            roles: vec![
                entry("mastermind", "MM", &["alarm_disable", "fingerprint_matching"]),
                entry("hacker", "H", &["wire_connecting", "camera_bypass", "alarm_disable"]),
                entry("safe_cracker", "SC", &["safe_cracking", "lock_picking"]),
                entry("insider", "I", &["fingerprint_matching", "camera_bypass"]),
                entry("driver", "D", &["wire_connecting", "lock_picking"]),
                entry("grifter", "G", &["fingerprint_matching", "lock_picking"]),
                entry("muscle", "M", &["lock_picking", "alarm_disable"]),
                entry("lookout", "L", &["camera_bypass"]),
                entry("fence", "F", &["fingerprint_matching"]),
                entry("cat_burglar", "CB", &["lock_picking", "alarm_disable"]),
                entry("cleaner", "CL", &["fingerprint_matching", "wire_connecting"]),
                entry("pickpocket", "PP", &["lock_picking", "fingerprint_matching"]),
            ],
        }
    }

    pub fn get(&self, role: &RoleId) -> Option<&RoleEntry> {
        self.roles.iter().find(|e| &e.id == role)
    }

    /// Task-id prefix for `role`. Roles missing from the catalog use the
    /// first two letters of their id, upper-cased.
    pub fn code_for(&self, role: &RoleId) -> String {
        match self.get(role) {
            Some(entry) => entry.code.clone(),
            None => role
                .as_str()
                .chars()
                .filter(|c| c.is_ascii_alphabetic())
                .take(2)
                .collect::<String>()
                .to_ascii_uppercase(),
        }
    }

    pub fn minigames_for(&self, role: &RoleId) -> &[MinigameId] {
        self.get(role).map(|e| e.minigames.as_slice()).unwrap_or(&[])
    }

    pub fn is_valid_minigame(&self, role: &RoleId, minigame: &MinigameId) -> bool {
        self.minigames_for(role).contains(minigame)
    }
}

fn is_valid_code(code: &str) -> bool {
    (1..=3).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_uppercase())
}
