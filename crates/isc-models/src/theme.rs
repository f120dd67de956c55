//! Catalog themes (subject tags shared between records).

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name given to the theme when the AI response does not propose one.
pub const DEFAULT_THEME_NAME: &str = "Other";

/// Unique identifier for a theme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ThemeId(pub String);

impl ThemeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThemeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ThemeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ThemeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A catalog-wide subject tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Theme {
    pub id: ThemeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Theme {
    /// New theme with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ThemeId::new(),
            name: name.into().trim().to_string(),
            color: None,
            description: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Case-insensitive name comparison, ignoring surrounding whitespace.
    pub fn matches_name(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }
}

/// Theme names are matched case-insensitively.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Find a theme by case-insensitive name.
pub fn find_by_name<'a>(themes: &'a [Theme], name: &str) -> Option<&'a Theme> {
    themes.iter().find(|t| t.matches_name(name))
}

/// Outcome of matching an AI-proposed theme name against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThemeResolution {
    /// An existing theme matched; reuse its identity
    Existing { theme: Theme },
    /// No match; the persistence layer must create (or re-fetch) this name
    Proposed { name: String },
}

impl ThemeResolution {
    /// Resolve a proposed name against the known themes.
    pub fn resolve(name: &str, existing: &[Theme]) -> Self {
        match find_by_name(existing, name) {
            Some(theme) => ThemeResolution::Existing {
                theme: theme.clone(),
            },
            None => ThemeResolution::Proposed {
                name: name.trim().to_string(),
            },
        }
    }

    /// The theme name, whether existing or proposed.
    pub fn name(&self) -> &str {
        match self {
            ThemeResolution::Existing { theme } => &theme.name,
            ThemeResolution::Proposed { name } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn themes() -> Vec<Theme> {
        vec![Theme::new("Neuroscience"), Theme::new("Philosophie").with_color("#ff0000")]
    }

    #[test]
    fn test_theme_id_generation() {
        assert_ne!(ThemeId::new(), ThemeId::new());
    }

    #[test]
    fn test_find_by_name_is_case_insensitive() {
        let themes = themes();
        assert_eq!(find_by_name(&themes, "neuroSCIENCE").unwrap().name, "Neuroscience");
        assert_eq!(find_by_name(&themes, "  philosophie ").unwrap().name, "Philosophie");
        assert!(find_by_name(&themes, "Linguistics").is_none());
    }

    #[test]
    fn test_resolution_reuses_existing_identity() {
        let themes = themes();
        match ThemeResolution::resolve("NEUROSCIENCE", &themes) {
            ThemeResolution::Existing { theme } => assert_eq!(theme.id, themes[0].id),
            other => panic!("expected existing theme, got {other:?}"),
        }
    }

    #[test]
    fn test_resolution_proposes_unknown_name() {
        let resolution = ThemeResolution::resolve(" Linguistique ", &themes());
        assert_eq!(
            resolution,
            ThemeResolution::Proposed {
                name: "Linguistique".to_string()
            }
        );
        assert_eq!(resolution.name(), "Linguistique");
    }

    #[test]
    fn test_accented_names_match_case_insensitively() {
        let themes = vec![Theme::new("Éthique")];
        assert!(find_by_name(&themes, "éthique").is_some());
    }
}
