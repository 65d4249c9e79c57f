//! Loads the badge rule table from JSON configuration.
//!
//! The file is a JSON array of badges. A badge whose `rule` cannot be read is
//! kept with an unknown rule so it fails closed at evaluation time instead of
//! rejecting the whole catalog.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::badges::{default_catalog, BadgeRule, RulePredicate};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read badge catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("badge catalog is not a JSON array of badges: {0}")]
    Format(#[from] serde_json::Error),
    #[error("badge at position {0} has an empty id")]
    EmptyId(usize),
    #[error("badge id {0} appears more than once")]
    DuplicateId(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogRow {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    rule: serde_json::Value,
}

pub fn parse_catalog(json: &str) -> Result<Vec<BadgeRule>, CatalogError> {
    let rows: Vec<CatalogRow> = serde_json::from_str(json)?;
    let mut seen = HashSet::new();
    let mut catalog = Vec::with_capacity(rows.len());

    for (position, row) in rows.into_iter().enumerate() {
        let id = row.id.trim().to_string();
        if id.is_empty() {
            return Err(CatalogError::EmptyId(position));
        }
        if !seen.insert(id.clone()) {
            return Err(CatalogError::DuplicateId(id));
        }

        let rule = match serde_json::from_value::<RulePredicate>(row.rule) {
            Ok(rule) => rule,
            Err(err) => {
                warn!(badge = %id, error = %err, "unreadable badge rule, it will never be earned");
                RulePredicate::Unknown
            }
        };

        catalog.push(BadgeRule {
            id,
            name: row.name,
            description: row.description,
            icon: row.icon,
            color: row.color,
            rule,
        });
    }

    Ok(catalog)
}

/// Reads the catalog at `path`, or the built-in catalog when no path is set.
pub fn load_catalog(path: Option<&Path>) -> Result<Vec<BadgeRule>, CatalogError> {
    let Some(path) = path else {
        return Ok(default_catalog());
    };
    let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let catalog = parse_catalog(&json)?;
    info!(path = %path.display(), badges = catalog.len(), "loaded badge catalog");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badges::{CLEAN_CODER, GRAPH_GOD};
    use crate::models::Difficulty;
    use std::io::Write;

    const CATALOG: &str = r#"[
        {
            "id": "GRAPH_GOD",
            "name": "Graph God",
            "description": "Solved 50 Graph problems (Hard).",
            "rule": {"kind": "solvedCount", "topic": "Graph", "difficulty": "Hard", "atLeast": 50}
        },
        {
            "id": "TIME_TRAVELER",
            "name": "Time Traveler",
            "rule": {"kind": "solvedBeforeRelease", "days": 3}
        },
        {
            "id": "HALF_BAKED",
            "name": "Half Baked",
            "rule": {"kind": "streakAtLeast", "days": "thirty"}
        },
        {
            "id": "CLEAN_CODER",
            "name": "Clean Coder",
            "rule": {"kind": "styleAverageAbove", "window": 20, "threshold": 9.0}
        }
    ]"#;

    #[test]
    fn parses_known_rules_and_fences_off_the_rest() {
        let catalog = parse_catalog(CATALOG).unwrap();
        assert_eq!(catalog.len(), 4);

        assert_eq!(catalog[0].id, GRAPH_GOD);
        assert_eq!(
            catalog[0].rule,
            RulePredicate::SolvedCount {
                topic: "Graph".to_string(),
                difficulty: Difficulty::Hard,
                at_least: 50,
            }
        );
        assert_eq!(catalog[1].rule, RulePredicate::Unknown);
        assert_eq!(catalog[2].rule, RulePredicate::Unknown);
        assert_eq!(catalog[3].id, CLEAN_CODER);
    }

    #[test]
    fn bundled_demo_catalog_is_fully_known() {
        let catalog = parse_catalog(include_str!("../demos/badges.json")).unwrap();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.iter().all(|badge| badge.rule != RulePredicate::Unknown));
        assert_eq!(&catalog[..3], default_catalog().as_slice());
    }

    #[test]
    fn rejects_duplicate_and_empty_ids() {
        let duplicate = r#"[
            {"id": "A", "name": "A", "rule": {"kind": "streakAtLeast", "days": 1}},
            {"id": "A", "name": "A again", "rule": {"kind": "streakAtLeast", "days": 2}}
        ]"#;
        assert!(matches!(
            parse_catalog(duplicate),
            Err(CatalogError::DuplicateId(id)) if id == "A"
        ));

        let empty = r#"[{"id": " ", "name": "Blank"}]"#;
        assert!(matches!(parse_catalog(empty), Err(CatalogError::EmptyId(0))));
        assert!(matches!(parse_catalog("{}"), Err(CatalogError::Format(_))));
    }

    #[test]
    fn loads_from_file_or_falls_back_to_builtin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();

        let from_file = load_catalog(Some(file.path())).unwrap();
        assert_eq!(from_file.len(), 4);

        let builtin = load_catalog(None).unwrap();
        assert_eq!(builtin, default_catalog());

        let missing = load_catalog(Some(Path::new("/nonexistent/badges.json")));
        assert!(matches!(missing, Err(CatalogError::Io { .. })));
    }
}
