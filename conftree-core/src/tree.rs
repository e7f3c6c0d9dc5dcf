use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::format;
use crate::platform::{Platform, PlatformSpec};

/// Tag carried by diff nodes that must be applied after the additions around them.
pub const POST_TAG: &str = "post";
/// Tag carried by diff nodes that must be applied before the main body of a patch.
pub const PRE_TAG: &str = "pre";
/// Tag carried by transient safety commands a dry-run validator should skip.
pub const SKIP_DRY_RUN_TAG: &str = "skip-dry-run";
/// Separator between ancestor lines in a formal path.
pub const PATH_SEPARATOR: &str = " / ";

/// Errors raised when two trees are combined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Operands were parsed for different platforms.
    #[error("cannot combine a {left} tree with a {right} tree")]
    PlatformMismatch { left: Platform, right: Platform },
}

/// One configuration line plus its nested sub-commands.
///
/// The root of a tree has an empty `line`. Children are keyed by their `line`:
/// [`Node::add_child`] never creates a second child with the same text, and
/// iteration order of `children` is render order. Code that edits a child's
/// `line` in place must call [`Node::rebuild`] afterwards to merge any
/// children that now collide.
#[derive(Debug, Clone)]
pub struct Node {
    /// Platform whose rules govern parsing, rendering and undo synthesis.
    pub platform: Platform,
    /// Statement text without leading indentation.
    pub line: String,
    /// Classification labels, in insertion order.
    pub tags: Vec<String>,
    /// Nested statements, unique by `line`.
    pub children: Vec<Node>,
    /// Template pattern that matched this line, if any.
    pub template: Option<String>,
    /// Explicit undo command derived from the matching template.
    pub undo_line: Option<String>,
}

impl Node {
    /// Create an empty root node.
    pub fn root(platform: Platform) -> Self {
        Self::new(platform, "")
    }

    /// Create a detached node with no tags or children.
    pub fn new(platform: Platform, line: impl Into<String>) -> Self {
        Self {
            platform,
            line: line.into(),
            tags: Vec::new(),
            children: Vec::new(),
            template: None,
            undo_line: None,
        }
    }

    /// Create a detached node with the given tags.
    pub fn with_tags(platform: Platform, line: impl Into<String>, tags: &[&str]) -> Self {
        let mut node = Self::new(platform, line);
        node.tags = tags.iter().map(|tag| tag.to_string()).collect();
        node
    }

    pub fn is_root(&self) -> bool {
        self.line.is_empty()
    }

    pub fn spec(&self) -> &'static dyn PlatformSpec {
        self.platform.spec()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Add `tag` unless it is already present.
    pub fn add_tag(&mut self, tag: &str) {
        if !self.has_tag(tag) {
            self.tags.push(tag.to_string());
        }
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    /// Index of the child keyed by `line`.
    pub fn position(&self, line: &str) -> Option<usize> {
        self.children.iter().position(|child| child.line == line)
    }

    pub fn child(&self, line: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.line == line)
    }

    pub fn child_mut(&mut self, line: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|child| child.line == line)
    }

    /// Walk a path of child lines and return the node at its end.
    pub fn find(&self, path: &[&str]) -> Option<&Node> {
        path.iter().try_fold(self, |node, line| node.child(line))
    }

    pub fn find_mut(&mut self, path: &[&str]) -> Option<&mut Node> {
        let mut current = self;
        for line in path {
            current = current.child_mut(line)?;
        }
        Some(current)
    }

    /// Return the child keyed by `line`, appending a new one if none exists.
    pub fn add_child(&mut self, line: impl Into<String>) -> &mut Node {
        let line = line.into();
        let idx = self.add_child_index(line);
        &mut self.children[idx]
    }

    pub(crate) fn add_child_index(&mut self, line: impl Into<String>) -> usize {
        let line = line.into();
        match self.position(&line) {
            Some(idx) => idx,
            None => {
                self.children.push(Node::new(self.platform, line));
                self.children.len() - 1
            }
        }
    }

    /// Append `node` unless a child with the same line exists; returns the
    /// child that now holds the key.
    pub fn insert_child(&mut self, node: Node) -> &mut Node {
        let idx = match self.position(&node.line) {
            Some(idx) => idx,
            None => {
                self.children.push(node);
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }

    /// Insert `node` at `index` unless its key is already present.
    pub fn insert_child_at(&mut self, index: usize, node: Node) -> bool {
        if self.position(&node.line).is_some() {
            return false;
        }
        let index = index.min(self.children.len());
        self.children.insert(index, node);
        true
    }

    /// Detach the child keyed by `line`, together with its subtree.
    pub fn remove_child(&mut self, line: &str) -> Option<Node> {
        let idx = self.position(line)?;
        Some(self.children.remove(idx))
    }

    /// Move the child `line` directly before its sibling `target`.
    ///
    /// Returns `false` without touching the tree when either key is missing.
    pub fn move_before(&mut self, line: &str, target: &str) -> bool {
        self.move_relative(line, target, false)
    }

    /// Move the child `line` directly after its sibling `target`.
    pub fn move_after(&mut self, line: &str, target: &str) -> bool {
        self.move_relative(line, target, true)
    }

    fn move_relative(&mut self, line: &str, target: &str, after: bool) -> bool {
        let (Some(from), Some(to)) = (self.position(line), self.position(target)) else {
            return false;
        };
        if from == to {
            return false;
        }
        let node = self.children.remove(from);
        let to = if from < to { to - 1 } else { to };
        let to = if after { to + 1 } else { to };
        self.children.insert(to, node);
        true
    }

    /// Change the key of child `old` to `new`.
    ///
    /// When `new` is already taken, the renamed subtree is merged into the
    /// existing child and the old entry disappears.
    pub fn rename_child(&mut self, old: &str, new: &str) -> bool {
        let Some(idx) = self.position(old) else {
            return false;
        };
        if old == new {
            return true;
        }
        match self.position(new) {
            Some(existing) => {
                let node = self.children.remove(idx);
                let existing = if idx < existing { existing - 1 } else { existing };
                merge_from(&mut self.children[existing], &node);
            }
            None => self.children[idx].line = new.to_string(),
        }
        true
    }

    /// Re-key children from their current `line`, merging duplicates into the
    /// first occurrence.
    pub fn rebuild(&mut self, deep: bool) {
        let children = std::mem::take(&mut self.children);
        for child in children {
            match self.position(&child.line) {
                Some(idx) => merge_from(&mut self.children[idx], &child),
                None => self.children.push(child),
            }
        }
        if deep {
            for child in &mut self.children {
                child.rebuild(true);
            }
        }
    }

    /// Deep-merge `other` into this tree.
    pub fn merge(&mut self, other: &Node) -> Result<(), TreeError> {
        self.check_platform(other)?;
        merge_from(self, other);
        Ok(())
    }

    /// Lines present here but absent at the same position in `other`.
    pub fn subtract(&self, other: &Node) -> Node {
        let mut out = self.shallow_copy();
        for child in &self.children {
            match other.child(&child.line) {
                None => out.children.push(child.clone()),
                Some(theirs) => {
                    let rest = child.subtract(theirs);
                    if !rest.children.is_empty() {
                        out.children.push(rest);
                    }
                }
            }
        }
        out
    }

    /// Return this tree with the commands of `diff` applied.
    ///
    /// Nodes tagged [`POST_TAG`] or [`PRE_TAG`] are removals and run first at
    /// each level: an undo-prefixed line removes its positive form (exactly,
    /// or every command it prefixes), any other line removes its negated
    /// form. Remaining nodes are then merged in after clearing the opposite
    /// form of their command.
    pub fn apply(&self, diff: &Node) -> Result<Node, TreeError> {
        self.check_platform(diff)?;
        let mut result = self.clone();
        apply_level(&mut result, diff, self.spec());
        Ok(result)
    }

    /// Stable-sort every level by the first tag of each child found in
    /// `tag_order`. Children without such a tag go after the ordered groups,
    /// or before them when `reverse` is set.
    pub fn reorder(&mut self, tag_order: &[&str], reverse: bool) {
        let unranked = if reverse { 0 } else { tag_order.len() + 1 };
        self.children.sort_by_key(|child| {
            child
                .tags
                .iter()
                .find_map(|tag| tag_order.iter().position(|t| t == tag))
                .map(|rank| if reverse { rank + 1 } else { rank })
                .unwrap_or(unranked)
        });
        for child in &mut self.children {
            child.reorder(tag_order, reverse);
        }
    }

    /// Look for this node's line under `path` in `other` and return the
    /// matching line there. With `masked`, secrets are ignored in the
    /// comparison.
    pub fn exists_in(&self, path: &[&str], other: &Node, masked: bool) -> Option<String> {
        let parent = other.find(path)?;
        if !masked {
            return parent.child(&self.line).map(|node| node.line.clone());
        }
        let spec = self.spec();
        let mine = spec.mask(&self.line);
        parent
            .children
            .iter()
            .find(|node| spec.mask(&node.line) == mine)
            .map(|node| node.line.clone())
    }

    /// Visit every descendant together with the lines of its ancestors below
    /// this node.
    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&[&'a str], &'a Node),
    {
        let mut path = Vec::new();
        walk_inner(self, &mut path, visit);
    }

    /// Copy of this node without children.
    pub fn shallow_copy(&self) -> Node {
        Node {
            platform: self.platform,
            line: self.line.clone(),
            tags: self.tags.clone(),
            children: Vec::new(),
            template: self.template.clone(),
            undo_line: self.undo_line.clone(),
        }
    }

    pub fn config(&self) -> String {
        format::format_config(self, false)
    }

    pub fn masked_config(&self) -> String {
        format::format_config(self, true)
    }

    pub fn patch(&self) -> String {
        format::format_patch(self, false)
    }

    pub fn masked_patch(&self) -> String {
        format::format_patch(self, true)
    }

    pub fn formal_config(&self) -> String {
        format::format_formal(self)
    }

    pub(crate) fn check_platform(&self, other: &Node) -> Result<(), TreeError> {
        if self.platform != other.platform {
            return Err(TreeError::PlatformMismatch {
                left: self.platform,
                right: other.platform,
            });
        }
        Ok(())
    }
}

/// Structural equality: line, tags, and children matched by key.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.line == other.line
            && self.tags == other.tags
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .all(|child| other.child(&child.line).is_some_and(|theirs| child == theirs))
    }
}

impl Eq for Node {}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.config())
    }
}

/// Join a parent formal path and a child line.
pub fn join_path(parent: &str, line: &str) -> String {
    if parent.is_empty() {
        line.to_string()
    } else {
        format!("{parent}{PATH_SEPARATOR}{line}")
    }
}

fn merge_from(into: &mut Node, from: &Node) {
    for tag in &from.tags {
        into.add_tag(tag);
    }
    if into.template.is_none() {
        into.template.clone_from(&from.template);
    }
    if into.undo_line.is_none() {
        into.undo_line.clone_from(&from.undo_line);
    }
    for child in &from.children {
        match into.position(&child.line) {
            Some(idx) => merge_from(&mut into.children[idx], child),
            None => into.children.push(child.clone()),
        }
    }
}

fn apply_level(target: &mut Node, diff: &Node, spec: &dyn PlatformSpec) {
    let (removals, additions): (Vec<&Node>, Vec<&Node>) = diff
        .children
        .iter()
        .partition(|change| change.has_tag(POST_TAG) || change.has_tag(PRE_TAG));

    for change in removals {
        match spec.strip_undo(&change.line) {
            Some(positive) => {
                remove_command(target, positive);
            }
            None => {
                target.remove_child(&spec.undo_of(&change.line));
            }
        }
    }

    for change in additions {
        match spec.strip_undo(&change.line) {
            Some(positive) => {
                remove_command(target, positive);
            }
            None => {
                target.remove_child(&spec.undo_of(&change.line));
            }
        }
        let child = target.add_child(change.line.clone());
        child.tags.clone_from(&change.tags);
        if change.template.is_some() {
            child.template.clone_from(&change.template);
            child.undo_line.clone_from(&change.undo_line);
        }
        apply_level(child, change, spec);
    }
}

/// Remove `command` exactly, or every child it is a word prefix of.
fn remove_command(target: &mut Node, command: &str) -> bool {
    if target.remove_child(command).is_some() {
        return true;
    }
    let prefix = format!("{command} ");
    let before = target.children.len();
    target.children.retain(|child| !child.line.starts_with(&prefix));
    before != target.children.len()
}

fn walk_inner<'a, F>(node: &'a Node, path: &mut Vec<&'a str>, visit: &mut F)
where
    F: FnMut(&[&'a str], &'a Node),
{
    for child in &node.children {
        visit(path, child);
        path.push(&child.line);
        walk_inner(child, path, visit);
        path.pop();
    }
}
