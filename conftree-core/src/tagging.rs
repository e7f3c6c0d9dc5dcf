use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parser::ParseError;
use crate::tree::{join_path, Node};

/// One tagging rule as written by users: a formal-path regex and the tags
/// it assigns. Tags may reference capture groups (`$1`, `${name}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRule {
    pub regex: String,
    pub tags: Vec<String>,
}

impl TagRule {
    pub fn new(regex: impl Into<String>, tags: &[&str]) -> Self {
        Self {
            regex: regex.into(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }
}

/// An ordered, compiled rule list.
#[derive(Debug, Clone)]
pub struct TaggingRules {
    rules: Vec<(Regex, Vec<String>)>,
}

impl TaggingRules {
    pub fn new(rules: &[TagRule]) -> Result<Self, ParseError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&format!("^(?:{})$", rule.regex))
                    .map(|regex| (regex, rule.tags.clone()))
                    .map_err(|source| ParseError::Pattern {
                        pattern: rule.regex.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Tags of the first rule fully matching `formal_path`, with capture
    /// groups substituted.
    pub fn tags_for(&self, formal_path: &str) -> Option<Vec<String>> {
        self.rules.iter().find_map(|(regex, tags)| {
            let caps = regex.captures(formal_path)?;
            Some(
                tags.iter()
                    .map(|tag| {
                        let mut expanded = String::new();
                        caps.expand(tag, &mut expanded);
                        expanded
                    })
                    .collect(),
            )
        })
    }

    /// Tag every node of the tree. A node without a matching rule inherits
    /// the tags of its parent.
    pub fn apply(&self, root: &mut Node) {
        let inherited = root.tags.clone();
        self.apply_level(&mut root.children, "", &inherited);
    }

    fn apply_level(&self, nodes: &mut [Node], parent_path: &str, inherited: &[String]) {
        for node in nodes {
            let path = join_path(parent_path, &node.line);
            node.tags = self.tags_for(&path).unwrap_or_else(|| inherited.to_vec());
            let tags = node.tags.clone();
            self.apply_level(&mut node.children, &path, &tags);
        }
    }
}
