use std::fs;
use std::path::Path;

use conftree_core::TagRule;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rule: Vec<TagRule>,
}

/// Errors returned when loading tagging rule files.
#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("failed to read tagging rules {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse tagging rules {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load tagging rules from a TOML file of `[[rule]]` tables.
pub fn load_tag_rules(path: &Path) -> Result<Vec<TagRule>, RuleLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_rules(&raw, path.display().to_string())
}

/// Built-in tagging rules.
pub fn default_tag_rules() -> Vec<TagRule> {
    let embedded = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/rules/tags.toml"));
    match parse_rules(embedded, "embedded rules".to_string()) {
        Ok(rules) if !rules.is_empty() => rules,
        _ => fallback_tag_rules(),
    }
}

/// Rules from `path` when given and readable, else the built-in rules,
/// together with a description of where they came from.
pub fn resolve_tag_rules(path: Option<&Path>) -> (Vec<TagRule>, String) {
    let Some(path) = path else {
        return (default_tag_rules(), "embedded".to_string());
    };
    match load_tag_rules(path) {
        Ok(rules) => (rules, format!("file:{}", path.display())),
        Err(err) => {
            warn!(error = %err, "using embedded tagging rules");
            (default_tag_rules(), "embedded".to_string())
        }
    }
}

fn parse_rules(raw: &str, path: String) -> Result<Vec<TagRule>, RuleLoadError> {
    let parsed: RuleFile =
        toml::from_str(raw).map_err(|source| RuleLoadError::Parse { path, source })?;
    Ok(parsed.rule)
}

fn fallback_tag_rules() -> Vec<TagRule> {
    vec![
        TagRule::new(r"interface (\S+)", &["interface", "$1"]),
        TagRule::new(r"(?:router bgp|bgp) \d+", &["routing", "bgp"]),
        TagRule::new(r"(?:snmp-server|snmp-agent) .*", &["management", "snmp"]),
    ]
}
