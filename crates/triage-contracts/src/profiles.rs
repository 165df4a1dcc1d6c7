use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileRole {
    #[serde(rename = "Self")]
    Myself,
    Parent,
    Child,
    Spouse,
    Other,
}

impl ProfileRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileRole::Myself => "Self",
            ProfileRole::Parent => "Parent",
            ProfileRole::Child => "Child",
            ProfileRole::Spouse => "Spouse",
            ProfileRole::Other => "Other",
        }
    }
}

/// A family member whose analyses are logged separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub role: ProfileRole,
    #[serde(rename = "color")]
    pub color_tag: String,
}

#[derive(Debug, Clone)]
pub struct ProfileTable {
    /// First row of `profiles`, held apart so selecting it cannot fail.
    default: Profile,
    profiles: IndexMap<String, Profile>,
}

impl ProfileTable {
    /// An empty or missing table yields the built-in profiles.
    pub fn new(profiles: Option<IndexMap<String, Profile>>) -> Self {
        let profiles = profiles.unwrap_or_default();
        match profiles.values().next().cloned() {
            Some(default) => Self { default, profiles },
            None => Self::builtin(),
        }
    }

    fn builtin() -> Self {
        let seed = |id: &str, name: &str, role: ProfileRole, color: &str| Profile {
            id: id.to_string(),
            display_name: name.to_string(),
            role,
            color_tag: color.to_string(),
        };
        let default = seed("p1", "Me", ProfileRole::Myself, "emerald");
        let profiles = [
            default.clone(),
            seed("p2", "Mom", ProfileRole::Parent, "rose"),
            seed("p3", "Dad", ProfileRole::Parent, "blue"),
            seed("p4", "Child", ProfileRole::Child, "orange"),
        ]
        .into_iter()
        .map(|profile| (profile.id.clone(), profile))
        .collect();
        Self { default, profiles }
    }

    /// Reads a JSON array of profiles; a missing, empty or malformed file
    /// yields the built-in table.
    pub fn load_or_default(path: &Path) -> Self {
        let Ok(raw) = std::fs::read_to_string(path) else {
            return Self::new(None);
        };
        match serde_json::from_str::<Vec<Profile>>(&raw) {
            Ok(rows) => Self::new(Some(
                rows.into_iter()
                    .map(|profile| (profile.id.clone(), profile))
                    .collect(),
            )),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring malformed profile table");
                Self::new(None)
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }

    pub fn list(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    /// The profile selected at startup.
    pub fn default_profile(&self) -> &Profile {
        &self.default
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    #[test]
    fn default_table_is_seeded_in_order() {
        let table = ProfileTable::default();
        let ids: Vec<&str> = table.list().map(|profile| profile.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3", "p4"]);
        assert_eq!(table.default_profile().display_name, "Me");
        assert_eq!(table.default_profile().role, ProfileRole::Myself);
    }

    #[test]
    fn self_role_uses_keyword_on_the_wire() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_value(ProfileRole::Myself)?, json!("Self"));
        Ok(())
    }

    #[test]
    fn profile_file_replaces_defaults() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("profiles.json");
        fs::write(
            &path,
            json!([
                {"id": "s1", "name": "Sam", "role": "Spouse", "color": "teal"}
            ])
            .to_string(),
        )?;
        let table = ProfileTable::load_or_default(&path);
        assert_eq!(table.list().count(), 1);
        assert_eq!(table.default_profile().id, "s1");
        assert_eq!(table.get("s1").map(|p| p.role), Some(ProfileRole::Spouse));
        assert!(table.get("p1").is_none());
        Ok(())
    }

    #[test]
    fn malformed_or_empty_file_falls_back() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("profiles.json");
        fs::write(&path, "{oops")?;
        assert!(ProfileTable::load_or_default(&path).get("p1").is_some());
        fs::write(&path, "[]")?;
        let table = ProfileTable::load_or_default(&path);
        assert!(table.get("p1").is_some());
        assert_eq!(table.default_profile().id, "p1");
        Ok(())
    }
}
