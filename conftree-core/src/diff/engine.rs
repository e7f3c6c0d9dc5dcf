use std::collections::{HashMap, HashSet};

use regex::Regex;
use thiserror::Error;

use crate::diff::lcs::lcs;
use crate::platform::{Platform, PlatformSpec};
use crate::postproc::{self, PostProcRule};
use crate::range::RangeError;
use crate::tree::{join_path, Node, POST_TAG, PRE_TAG};

/// Errors raised while diffing two trees.
#[derive(Debug, Error)]
pub enum DiffError {
    /// The two trees were parsed for different platforms.
    #[error("a and b should be instances of the same class")]
    PlatformMismatch,
    /// A section pattern in [`DiffOptions`] is not a valid regex.
    #[error("invalid section pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
    /// A post-processing rule met a malformed interface number.
    #[error(transparent)]
    Range(#[from] RangeError),
    /// Unrecognized human diff mode name.
    #[error("unknown diff mode '{0}' (expected full or diff-only)")]
    UnknownMode(String),
}

/// Configures diff behavior.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Formal paths of sections replaced wholesale when they differ.
    pub no_diff_sections: Vec<String>,
    /// Formal paths of sections whose child order is significant.
    pub ordered_sections: Vec<String>,
    /// Treat the top level itself as an ordered section.
    pub reorder_root: bool,
    /// Rules run on the raw diff. `None` runs the platform registry,
    /// `Some(vec![])` returns the raw structural diff.
    pub post_proc_rules: Option<Vec<PostProcRule>>,
}

impl DiffOptions {
    /// Defaults carrying the platform's built-in no-diff sections.
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            no_diff_sections: platform
                .spec()
                .no_diff_sections()
                .iter()
                .map(ToString::to_string)
                .collect(),
            ..Self::default()
        }
    }

    /// Skip post-processing.
    pub fn raw(mut self) -> Self {
        self.post_proc_rules = Some(Vec::new());
        self
    }
}

/// Diff `a` (current) against `b` (target) with platform defaults.
pub fn diff(a: &Node, b: &Node) -> Result<Node, DiffError> {
    diff_with_options(a, b, &DiffOptions::for_platform(a.platform))
}

/// Diff `a` (current) against `b` (target).
///
/// The result is a tree of commands turning `a` into `b`: additions are
/// copies of target lines, removals are undo commands tagged [`POST_TAG`]
/// (or [`PRE_TAG`] when the same entity is re-added right after), and
/// sections present on both sides appear only when something below them
/// changed.
pub fn diff_with_options(a: &Node, b: &Node, opts: &DiffOptions) -> Result<Node, DiffError> {
    if a.platform != b.platform {
        return Err(DiffError::PlatformMismatch);
    }

    let differ = Differ::new(a.platform, opts)?;
    let mut out = a.shallow_copy();
    out.tags.clone_from(&b.tags);
    differ.diff_level(a, b, "", &mut out);

    match &opts.post_proc_rules {
        Some(rules) => postproc::run(rules, &mut out)?,
        None => postproc::run(postproc::rules_for(a.platform), &mut out)?,
    }
    Ok(out)
}

struct Differ {
    spec: &'static dyn PlatformSpec,
    platform: Platform,
    no_diff: Vec<Regex>,
    ordered: Vec<Regex>,
    reorder_root: bool,
}

impl Differ {
    fn new(platform: Platform, opts: &DiffOptions) -> Result<Self, DiffError> {
        Ok(Self {
            spec: platform.spec(),
            platform,
            no_diff: compile_sections(&opts.no_diff_sections)?,
            ordered: compile_sections(&opts.ordered_sections)?,
            reorder_root: opts.reorder_root,
        })
    }

    fn diff_level(&self, a: &Node, b: &Node, path: &str, out: &mut Node) {
        let ordered = if path.is_empty() {
            self.reorder_root
        } else {
            matches_any(&self.ordered, path)
        };
        if ordered {
            self.diff_ordered(a, b, path, out);
        } else {
            self.diff_unordered(a, b, path, out);
        }
    }

    fn diff_unordered(&self, a: &Node, b: &Node, path: &str, out: &mut Node) {
        let current: HashMap<&str, &Node> = a
            .children
            .iter()
            .map(|child| (child.line.as_str(), child))
            .collect();
        let target: HashSet<&str> = b.children.iter().map(|child| child.line.as_str()).collect();

        let mut added: Vec<&Node> = Vec::new();
        for theirs in &b.children {
            match current.get(theirs.line.as_str()) {
                Some(mine) => self.diff_pair(mine, theirs, path, out),
                None => {
                    out.insert_child(theirs.clone());
                    added.push(theirs);
                }
            }
        }
        for mine in &a.children {
            if target.contains(mine.line.as_str()) {
                continue;
            }
            match replacement_of(mine, &added) {
                Some(theirs) => {
                    if let Some(line) = self.push_removal(mine, PRE_TAG, out) {
                        out.move_before(&line, &theirs.line);
                    }
                }
                None => {
                    self.push_removal(mine, POST_TAG, out);
                }
            }
        }
    }

    /// Walk the target order: lines aligned by the longest common
    /// subsequence are diffed in place, target-only lines are added, and a
    /// common line outside the alignment is removed and re-added where the
    /// target has it.
    fn diff_ordered(&self, a: &Node, b: &Node, path: &str, out: &mut Node) {
        let a_keys: Vec<&str> = a.children.iter().map(|child| child.line.as_str()).collect();
        let b_keys: Vec<&str> = b.children.iter().map(|child| child.line.as_str()).collect();

        let mut partner: Vec<Option<usize>> = vec![None; b_keys.len()];
        for (i, j) in lcs(&a_keys, &b_keys) {
            partner[j] = Some(i);
        }
        let current: HashMap<&str, &Node> = a
            .children
            .iter()
            .map(|child| (child.line.as_str(), child))
            .collect();

        for (j, theirs) in b.children.iter().enumerate() {
            match partner[j] {
                Some(i) => self.diff_pair(&a.children[i], theirs, path, out),
                None => {
                    if let Some(mine) = current.get(theirs.line.as_str()) {
                        self.push_removal(mine, PRE_TAG, out);
                    }
                    out.insert_child(theirs.clone());
                }
            }
        }

        let target: HashSet<&str> = b_keys.into_iter().collect();
        for mine in &a.children {
            if !target.contains(mine.line.as_str()) {
                self.push_removal(mine, POST_TAG, out);
            }
        }
    }

    /// Diff a line present on both sides.
    fn diff_pair(&self, mine: &Node, theirs: &Node, path: &str, out: &mut Node) {
        let child_path = join_path(path, &theirs.line);
        if matches_any(&self.no_diff, &child_path) {
            if mine != theirs {
                self.push_removal(mine, PRE_TAG, out);
                out.insert_child(theirs.clone());
            }
            return;
        }

        let mut section = theirs.shallow_copy();
        self.diff_level(mine, theirs, &child_path, &mut section);
        if !section.children.is_empty() || mine.tags != theirs.tags {
            out.insert_child(section);
        }
    }

    /// Add the undo command for `mine` unless the same command is already
    /// emitted at this level (an addition of a negated line covers it).
    /// Returns the line of the inserted removal.
    fn push_removal(&self, mine: &Node, order_tag: &str, out: &mut Node) -> Option<String> {
        let line = mine
            .undo_line
            .clone()
            .unwrap_or_else(|| self.spec.undo_of(&mine.line));
        if out.position(&line).is_some() {
            return None;
        }
        let mut removal = Node::new(self.platform, line.clone());
        removal.tags.clone_from(&mine.tags);
        removal.add_tag(order_tag);
        out.children.push(removal);
        Some(line)
    }
}

/// An added line matching the same template as `mine`. Its template undo
/// command would also clear the addition, so it has to run first.
fn replacement_of<'a>(mine: &Node, added: &[&'a Node]) -> Option<&'a Node> {
    mine.undo_line.as_ref()?;
    let template = mine.template.as_deref()?;
    added
        .iter()
        .copied()
        .find(|theirs| theirs.template.as_deref() == Some(template))
}

pub(crate) fn compile_sections(patterns: &[String]) -> Result<Vec<Regex>, DiffError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(&format!("^(?:{pattern})$")).map_err(|source| DiffError::Pattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

pub(crate) fn matches_any(patterns: &[Regex], path: &str) -> bool {
    patterns.iter().any(|re| re.is_match(path))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{diff, diff_with_options, DiffError, DiffOptions};
    use crate::parser::parse;
    use crate::platform::Platform;
    use crate::tree::{POST_TAG, PRE_TAG};

    fn ios(text: &str) -> crate::Node {
        parse(text, Platform::CiscoIos).expect("parse")
    }

    #[test]
    fn identical_trees_produce_empty_diff() {
        let a = ios("interface Gi0/1\n mtu 9000\nhostname r1\n");
        let out = diff(&a, &a).expect("diff");
        assert!(out.children.is_empty());
        assert_eq!(out.config(), "");
    }

    #[test]
    fn platform_mismatch_is_rejected() {
        let a = ios("hostname r1\n");
        let b = parse("sysname r1\n", Platform::Huawei).expect("parse");
        let err = diff(&a, &b).expect_err("mismatch");
        assert!(matches!(err, DiffError::PlatformMismatch));
        assert_eq!(err.to_string(), "a and b should be instances of the same class");
    }

    #[test]
    fn emits_additions_then_tagged_removals() {
        let a = ios("interface Gi0/1\n mtu 9000\n description old\nhostname r1\n");
        let b = ios("interface Gi0/1\n mtu 9000\n description new\nhostname r2\n");
        let out = diff_with_options(&a, &b, &DiffOptions::default().raw()).expect("diff");

        assert_eq!(
            out.patch(),
            "interface Gi0/1\ndescription new\nno description old\nexit\nhostname r2\nno hostname r1\n"
        );
        let iface = out.child("interface Gi0/1").expect("interface");
        assert!(iface.child("no description old").expect("removal").has_tag(POST_TAG));
        assert!(iface.child("description new").expect("addition").tags.is_empty());
    }

    #[test]
    fn removal_of_negated_line_is_positive_command() {
        let a = ios("interface Gi0/1\n no shutdown\n");
        let b = ios("interface Gi0/1\n");
        let out = diff_with_options(&a, &b, &DiffOptions::default().raw()).expect("diff");
        let iface = out.child("interface Gi0/1").expect("interface");
        assert!(iface.child("shutdown").is_some());
    }

    #[test]
    fn template_undo_line_replaces_synthesized_undo() {
        let mut a = ios("interface Gi0/1\n ip address 10.0.0.1 255.255.255.0\n");
        a.children[0].children[0].undo_line = Some("no ip address".to_string());
        let b = ios("interface Gi0/1\n");
        let out = diff_with_options(&a, &b, &DiffOptions::default().raw()).expect("diff");
        assert_eq!(out.patch(), "interface Gi0/1\nno ip address\nexit\n");
    }

    #[test]
    fn no_diff_section_is_replaced_whole() {
        let a = ios("ip access-list extended ACL\n permit ip any host 10.0.0.1\n deny ip any any\n");
        let b = ios("ip access-list extended ACL\n permit ip any host 10.0.0.2\n deny ip any any\n");
        let opts = DiffOptions {
            no_diff_sections: vec!["ip access-list .*".to_string()],
            ..DiffOptions::default()
        }
        .raw();
        let out = diff_with_options(&a, &b, &opts).expect("diff");

        assert_eq!(
            out.patch(),
            "no ip access-list extended ACL\nip access-list extended ACL\npermit ip any host 10.0.0.2\ndeny ip any any\nexit\n"
        );
        assert!(out.children[0].has_tag(PRE_TAG));
    }

    #[test]
    fn ordered_insert_adds_only_the_new_line() {
        let a = ios("route-map RM\n a\n b\n c\n");
        let b = ios("route-map RM\n a\n x\n b\n c\n");
        let opts = DiffOptions {
            ordered_sections: vec!["route-map .*".to_string()],
            ..DiffOptions::default()
        }
        .raw();
        let out = diff_with_options(&a, &b, &opts).expect("diff");
        assert_eq!(out.patch(), "route-map RM\nx\nexit\n");
    }

    #[test]
    fn ordered_moved_line_is_readded_in_place() {
        let a = ios("route-map RM\n a\n b\n c\n");
        let b = ios("route-map RM\n b\n c\n x\n a\n");
        let opts = DiffOptions {
            ordered_sections: vec!["route-map .*".to_string()],
            ..DiffOptions::default()
        }
        .raw();
        let out = diff_with_options(&a, &b, &opts).expect("diff");
        assert_eq!(out.patch(), "route-map RM\nx\nno a\na\nexit\n");
        let section = out.child("route-map RM").expect("section");
        assert!(section.child("no a").expect("removal").has_tag(PRE_TAG));
    }

    #[test]
    fn ordered_append_only_adds() {
        let a = ios("route-map RM\n a\n b\n");
        let b = ios("route-map RM\n a\n b\n c\n");
        let opts = DiffOptions {
            ordered_sections: vec!["route-map .*".to_string()],
            ..DiffOptions::default()
        }
        .raw();
        let out = diff_with_options(&a, &b, &opts).expect("diff");
        assert_eq!(out.patch(), "route-map RM\nc\nexit\n");
    }

    #[test]
    fn reorder_root_treats_top_level_as_ordered() {
        let a = ios("a\nb\n");
        let b = ios("b\na\n");
        let unordered = diff_with_options(&a, &b, &DiffOptions::default().raw()).expect("diff");
        assert!(unordered.children.is_empty());

        let opts = DiffOptions {
            reorder_root: true,
            ..DiffOptions::default()
        }
        .raw();
        let ordered = diff_with_options(&a, &b, &opts).expect("diff");
        assert_eq!(ordered.patch(), "no a\na\n");
    }

    #[test]
    fn invalid_section_pattern_is_reported() {
        let a = ios("hostname r1\n");
        let opts = DiffOptions {
            ordered_sections: vec!["(".to_string()],
            ..DiffOptions::default()
        };
        assert!(matches!(
            diff_with_options(&a, &a, &opts),
            Err(DiffError::Pattern { .. })
        ));
    }
}
