//! Elision of changes hidden behind the `__NO_VALUE__` sentinel.
//!
//! A target config may carry `__NO_VALUE__` in place of a value it does not
//! want to manage (a secret, a generated key). When the current config holds
//! the same command with some concrete value, the diff would replace it; this
//! pass drops both halves of that replacement.

use regex::Regex;

use crate::postproc::is_removal;
use crate::range::RangeError;
use crate::tree::Node;

/// Placeholder for a value the target does not care about.
pub const NO_VALUE: &str = "__NO_VALUE__";

pub fn elide_no_value(tree: &mut Node) -> Result<(), RangeError> {
    elide_level(tree);
    Ok(())
}

/// Returns whether anything was elided at or below `node`.
fn elide_level(node: &mut Node) -> bool {
    let mut changed = false;
    node.children.retain_mut(|child| {
        if child.children.is_empty() || is_removal(child) {
            return true;
        }
        if elide_level(child) {
            changed = true;
            return !child.children.is_empty();
        }
        true
    });

    let spec = node.spec();
    let additions: Vec<String> = node
        .children
        .iter()
        .filter(|child| !is_removal(child) && child.line.contains(NO_VALUE))
        .map(|child| child.line.clone())
        .collect();

    for addition in additions {
        let Some(pattern) = sentinel_pattern(&addition) else {
            continue;
        };
        let paired = node
            .children
            .iter()
            .find(|child| {
                is_removal(child)
                    && spec
                        .strip_undo(&child.line)
                        .is_some_and(|positive| pattern.is_match(positive))
            })
            .map(|child| child.line.clone());
        if let Some(removal) = paired {
            node.remove_child(&removal);
            node.remove_child(&addition);
            changed = true;
        }
    }
    changed
}

/// Regex matching `line` with every sentinel standing for one token.
fn sentinel_pattern(line: &str) -> Option<Regex> {
    let body = line
        .split(NO_VALUE)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\S+");
    Regex::new(&format!("^{body}$")).ok()
}
