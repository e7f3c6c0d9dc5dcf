//! Filtering a tree down to the lines of interest.

use std::str::FromStr;

use regex::Regex;
use thiserror::Error;

use crate::tree::Node;

/// Prefix marking an include/exclude tag as a regex pattern.
pub const TAG_REGEX_PREFIX: &str = "re:";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("include_mode should be 'or' or 'and'")]
    IncludeMode(String),
    #[error("invalid search pattern {pattern:?}: {source}")]
    Regex {
        pattern: String,
        source: regex::Error,
    },
}

/// How several include tags combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncludeMode {
    /// A node needs any one of the tags.
    #[default]
    Or,
    /// A node needs every tag.
    And,
}

impl FromStr for IncludeMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "or" => Ok(IncludeMode::Or),
            "and" => Ok(IncludeMode::And),
            other => Err(SearchError::IncludeMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Regex searched for anywhere in a node's line.
    pub string: Option<String>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub include_mode: IncludeMode,
    /// Keep the whole subtree of a matched node.
    pub include_children: bool,
}

enum TagMatcher {
    Exact(String),
    Pattern(Regex),
}

impl TagMatcher {
    fn new(raw: &str) -> Result<Self, SearchError> {
        match raw.strip_prefix(TAG_REGEX_PREFIX) {
            Some(pattern) => Regex::new(&format!("^(?:{pattern})$"))
                .map(TagMatcher::Pattern)
                .map_err(|source| SearchError::Regex {
                    pattern: pattern.to_string(),
                    source,
                }),
            None => Ok(TagMatcher::Exact(raw.to_string())),
        }
    }

    fn matches(&self, tags: &[String]) -> bool {
        match self {
            TagMatcher::Exact(tag) => tags.iter().any(|t| t == tag),
            TagMatcher::Pattern(re) => tags.iter().any(|t| re.is_match(t)),
        }
    }
}

struct Matcher {
    string: Option<Regex>,
    include: Vec<TagMatcher>,
    exclude: Vec<TagMatcher>,
    mode: IncludeMode,
}

impl Matcher {
    fn new(opts: &SearchOptions) -> Result<Self, SearchError> {
        let string = opts
            .string
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| SearchError::Regex {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()?;
        let compile = |tags: &[String]| {
            tags.iter()
                .map(|tag| TagMatcher::new(tag))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            string,
            include: compile(&opts.include_tags)?,
            exclude: compile(&opts.exclude_tags)?,
            mode: opts.include_mode,
        })
    }

    fn matches(&self, node: &Node) -> bool {
        if self.exclude.iter().any(|m| m.matches(&node.tags)) {
            return false;
        }
        if let Some(re) = &self.string {
            if !re.is_match(&node.line) {
                return false;
            }
        }
        if self.include.is_empty() {
            return true;
        }
        match self.mode {
            IncludeMode::Or => self.include.iter().any(|m| m.matches(&node.tags)),
            IncludeMode::And => self.include.iter().all(|m| m.matches(&node.tags)),
        }
    }
}

/// Copy of `tree` holding only the matching nodes and the sections leading
/// to them.
pub fn search(tree: &Node, opts: &SearchOptions) -> Result<Node, SearchError> {
    let matcher = Matcher::new(opts)?;
    let mut out = tree.shallow_copy();
    collect(tree, &matcher, opts.include_children, &mut out);
    Ok(out)
}

fn collect(node: &Node, matcher: &Matcher, include_children: bool, out: &mut Node) {
    for child in &node.children {
        if matcher.matches(child) && include_children {
            out.insert_child(child.clone());
            continue;
        }
        let mut copy = child.shallow_copy();
        collect(child, matcher, include_children, &mut copy);
        if matcher.matches(child) || !copy.children.is_empty() {
            out.insert_child(copy);
        }
    }
}
