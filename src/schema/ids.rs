use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares an opaque, string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Role-prefixed task id, e.g. `MM3` or `CL7a`.
    TaskId
);
string_id!(
    /// snake_case location id.
    LocationId
);
string_id!(
    /// Item id, e.g. `item_4`.
    ItemId
);
string_id!(
    /// snake_case NPC id.
    NpcId
);
string_id!(
    /// A named fact or action an NPC can yield, e.g. `janitor_info_1`.
    OutcomeId
);
string_id!(
    /// Player role id as listed in the role catalog, e.g. `safe_cracker`.
    RoleId
);
string_id!(
    /// Minigame id as listed in the role catalog.
    MinigameId
);

impl TaskId {
    /// Returns true if the id matches `^[A-Z]{1,3}[0-9]+[a-z]?$`.
    pub fn is_well_formed(&self) -> bool {
        let bytes = self.0.as_bytes();
        let letters = bytes.iter().take_while(|b| b.is_ascii_uppercase()).count();
        if !(1..=3).contains(&letters) {
            return false;
        }
        let rest = &bytes[letters..];
        let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return false;
        }
        match &rest[digits..] {
            [] => true,
            [suffix] => suffix.is_ascii_lowercase(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_task_ids() {
        for id in ["MM1", "H12", "SC3", "CL7a", "D4a"] {
            assert!(TaskId::from(id).is_well_formed(), "{id} should be valid");
        }
    }

    #[test]
    fn malformed_task_ids() {
        for id in ["", "mm1", "ABCD1", "MM", "MM1ab", "MM1A", "1MM", "M_1"] {
            assert!(!TaskId::from(id).is_well_formed(), "{id} should be invalid");
        }
    }

    #[test]
    fn ids_display_as_raw_string() {
        assert_eq!(NpcId::new("janitor").to_string(), "janitor");
        assert_eq!(RoleId::from("hacker").as_str(), "hacker");
    }
}
