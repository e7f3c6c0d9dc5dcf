use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::trace;

use crate::platform::Platform;
use crate::range::RangeError;
use crate::tagging::TaggingRules;
use crate::template::Template;
use crate::tree::Node;

/// Errors that can occur while turning configuration text into a [`Node`] tree.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read input file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// A line range such as `line vty 0 4` had a malformed bound.
    #[error(transparent)]
    Range(#[from] RangeError),
    /// A template or tagging pattern is not a valid regex.
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Optional inputs that refine a parse.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParseOptions<'a> {
    /// Annotates matching lines with their pattern and undo command.
    pub template: Option<&'a Template>,
    /// Assigns tags by formal path.
    pub tagging: Option<&'a TaggingRules>,
}

/// Parse configuration text for `platform`.
pub fn parse(text: &str, platform: Platform) -> Result<Node, ParseError> {
    parse_with_options(text, platform, &ParseOptions::default())
}

/// Parse configuration text, then apply template annotation and tagging.
pub fn parse_with_options(
    text: &str,
    platform: Platform,
    options: &ParseOptions<'_>,
) -> Result<Node, ParseError> {
    let spec = platform.spec();
    let text = spec.pre_run(text)?;
    let mut root = build_tree(&text, platform);
    spec.post_run(&mut root);

    if let Some(template) = options.template {
        template.annotate(&mut root);
    }
    if let Some(rules) = options.tagging {
        rules.apply(&mut root);
    }
    Ok(root)
}

/// Parse a configuration file for `platform`.
pub fn parse_file(path: &Path, platform: Platform) -> Result<Node, ParseError> {
    let text = fs::read_to_string(path)?;
    parse(&text, platform)
}

/// Split text into lines and nest them by indentation, dropping junk.
///
/// A line becomes a child of the closest preceding line with smaller
/// indentation. Repeated headers merge into the first occurrence.
pub(crate) fn build_tree(text: &str, platform: Platform) -> Node {
    let spec = platform.spec();
    let mut root = Node::root(platform);
    // (indent, child index) for each open section, outermost first
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for raw in text.lines() {
        let raw = raw.trim_end();
        let content = raw.trim_start();
        if content.is_empty() {
            continue;
        }
        if spec.is_junk(content) {
            trace!(line = content, "dropping junk line");
            continue;
        }
        let indent = raw.len() - content.len();
        while stack.last().is_some_and(|&(level, _)| level >= indent) {
            stack.pop();
        }

        let parent = stack
            .iter()
            .fold(&mut root, |node, &(_, idx)| &mut node.children[idx]);
        let idx = parent.add_child_index(content);
        stack.push((indent, idx));
    }

    root
}
