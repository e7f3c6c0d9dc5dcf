//! Template trees: configuration-shaped regex patterns that annotate parsed
//! lines with the pattern they matched and an explicit undo command.
//!
//! A template line is a regex, optionally followed by [`UNDO_SEPARATOR`] and
//! an undo command that may reference capture groups (`$name`, `$1`):
//!
//! ```text
//! interface \S+
//!  ip address (?P<ip>\S+) (?P<mask>\S+) ~~ no ip address $ip $mask
//!  description .*
//! ```

use regex::Regex;
use tracing::trace;

use crate::parser::{build_tree, ParseError};
use crate::platform::Platform;
use crate::tree::Node;

/// Separates a template pattern from its undo annotation.
pub const UNDO_SEPARATOR: &str = "~~";

/// A compiled template tree.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<TemplateNode>,
}

#[derive(Debug, Clone)]
struct TemplateNode {
    pattern: String,
    regex: Regex,
    undo: Option<String>,
    children: Vec<TemplateNode>,
}

impl Template {
    /// Parse template text laid out like a configuration of `platform`.
    ///
    /// Platform text hooks are not applied: template lines are patterns.
    pub fn parse(text: &str, platform: Platform) -> Result<Self, ParseError> {
        Self::from_tree(&build_tree(text, platform))
    }

    /// Compile an already parsed template tree.
    pub fn from_tree(tree: &Node) -> Result<Self, ParseError> {
        Ok(Self {
            nodes: compile_level(&tree.children)?,
        })
    }

    /// Set `template` and `undo_line` on every node whose line fully matches
    /// a pattern at the same position. Patterns are tried in template order;
    /// nodes below an unmatched line stay unannotated.
    pub fn annotate(&self, root: &mut Node) {
        annotate_level(&self.nodes, &mut root.children);
    }
}

fn compile_level(nodes: &[Node]) -> Result<Vec<TemplateNode>, ParseError> {
    nodes
        .iter()
        .map(|node| {
            let (pattern, undo) = match node.line.split_once(UNDO_SEPARATOR) {
                Some((pattern, undo)) => (pattern.trim(), Some(undo.trim().to_string())),
                None => (node.line.trim(), None),
            };
            let regex =
                Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ParseError::Pattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
            Ok(TemplateNode {
                pattern: pattern.to_string(),
                regex,
                undo: undo.filter(|undo| !undo.is_empty()),
                children: compile_level(&node.children)?,
            })
        })
        .collect()
}

fn annotate_level(templates: &[TemplateNode], nodes: &mut [Node]) {
    for node in nodes {
        let hit = templates
            .iter()
            .find_map(|tpl| tpl.regex.captures(&node.line).map(|caps| (tpl, caps)));
        let Some((tpl, caps)) = hit else {
            continue;
        };
        trace!(line = %node.line, pattern = %tpl.pattern, "template match");
        node.template = Some(tpl.pattern.clone());
        node.undo_line = tpl.undo.as_ref().map(|undo| {
            let mut expanded = String::new();
            caps.expand(undo, &mut expanded);
            expanded
        });
        annotate_level(&tpl.children, &mut node.children);
    }
}
