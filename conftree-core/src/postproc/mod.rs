//! Per-platform rewrite passes applied to a raw structural diff.
//!
//! Each platform owns a static, ordered list of [`PostProcRule`]s. A rule
//! mutates the diff tree in place and is idempotent: running it twice leaves
//! the tree as running it once does.

mod cisco;
mod huawei;
pub mod no_value;

use std::fmt;

use tracing::debug;

use crate::platform::Platform;
use crate::range::RangeError;
use crate::tree::{Node, POST_TAG, PRE_TAG, SKIP_DRY_RUN_TAG};

pub use no_value::NO_VALUE;

/// A named rewrite pass over a diff tree.
#[derive(Clone, Copy)]
pub struct PostProcRule {
    pub name: &'static str,
    pub process: fn(&mut Node) -> Result<(), RangeError>,
}

impl fmt::Debug for PostProcRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostProcRule")
            .field("name", &self.name)
            .finish()
    }
}

static HUAWEI_RULES: [PostProcRule; 6] = [
    PostProcRule {
        name: "no_value",
        process: no_value::elide_no_value,
    },
    PostProcRule {
        name: "bgp_peers",
        process: huawei::bgp_peers,
    },
    PostProcRule {
        name: "aaa_local_users",
        process: huawei::aaa_local_users,
    },
    PostProcRule {
        name: "vlan_ranges",
        process: huawei::vlan_ranges,
    },
    PostProcRule {
        name: "link_type",
        process: huawei::link_type,
    },
    PostProcRule {
        name: "eth_trunk_members",
        process: huawei::eth_trunk_members,
    },
];

static CISCO_RULES: [PostProcRule; 5] = [
    PostProcRule {
        name: "no_value",
        process: no_value::elide_no_value,
    },
    PostProcRule {
        name: "prefix_lists",
        process: cisco::prefix_lists,
    },
    PostProcRule {
        name: "bgp_neighbors",
        process: cisco::bgp_neighbors,
    },
    PostProcRule {
        name: "allowed_vlans",
        process: cisco::allowed_vlans,
    },
    PostProcRule {
        name: "switchport_mode",
        process: cisco::switchport_mode,
    },
];

/// Registered rules for `platform`, in execution order.
pub fn rules_for(platform: Platform) -> &'static [PostProcRule] {
    match platform {
        Platform::Huawei => &HUAWEI_RULES,
        Platform::CiscoIos | Platform::CiscoNxos | Platform::Arista => &CISCO_RULES,
    }
}

/// Look up one registered rule by name.
pub fn rule(platform: Platform, name: &str) -> Option<PostProcRule> {
    rules_for(platform)
        .iter()
        .find(|rule| rule.name == name)
        .copied()
}

/// Run `rules` over `tree` in order.
pub fn run(rules: &[PostProcRule], tree: &mut Node) -> Result<(), RangeError> {
    for rule in rules {
        debug!(rule = rule.name, platform = %tree.platform, "running post-processing rule");
        (rule.process)(tree)?;
    }
    Ok(())
}

/// Whether a diff node is a synthesized removal.
pub(crate) fn is_removal(node: &Node) -> bool {
    node.has_tag(POST_TAG) || node.has_tag(PRE_TAG)
}

/// Turn a trailing removal into one that runs before the main body.
pub(crate) fn promote_to_pre(node: &mut Node) {
    node.remove_tag(POST_TAG);
    node.add_tag(PRE_TAG);
}

/// Call `visit` on `node` and every section below it.
pub(crate) fn visit_sections(node: &mut Node, visit: &mut dyn FnMut(&mut Node)) {
    visit(node);
    for child in &mut node.children {
        if !child.children.is_empty() {
            visit_sections(child, visit);
        }
    }
}

/// Surround a mode change inside `section` with `shutdown` (first, tagged
/// `pre`) and its undo (last, tagged `post`), both marked `skip-dry-run`.
///
/// Nothing happens when the section already configures the admin state
/// itself.
pub(crate) fn bracket_with_shutdown(section: &mut Node) {
    let shutdown = "shutdown";
    let no_shutdown = section.spec().undo_of(shutdown);
    let owned_by_target = section.children.iter().any(|child| {
        (child.line == shutdown || child.line == no_shutdown) && !child.has_tag(SKIP_DRY_RUN_TAG)
    });
    if owned_by_target {
        return;
    }

    let platform = section.platform;
    if section.position(shutdown).is_none() {
        section.insert_child_at(
            0,
            Node::with_tags(platform, shutdown, &[PRE_TAG, SKIP_DRY_RUN_TAG]),
        );
    }
    if let Some(idx) = section.position(&no_shutdown) {
        let node = section.children.remove(idx);
        section.children.push(node);
    } else {
        section
            .children
            .push(Node::with_tags(platform, no_shutdown, &[POST_TAG, SKIP_DRY_RUN_TAG]));
    }
}

/// Remove removal nodes selected by `doomed` from `section` and every nested
/// section, dropping nested sections left empty by the purge.
pub(crate) fn purge_removals(section: &mut Node, doomed: &dyn Fn(&str) -> bool) {
    section
        .children
        .retain(|child| !(is_removal(child) && doomed(&child.line)));
    section.children.retain_mut(|child| {
        if child.children.is_empty() || is_removal(child) {
            return true;
        }
        purge_removals(child, doomed);
        !child.children.is_empty()
    });
}

#[cfg(test)]
mod tests {
    use super::{bracket_with_shutdown, rule, rules_for, run};
    use crate::platform::Platform;
    use crate::tree::{Node, POST_TAG, PRE_TAG, SKIP_DRY_RUN_TAG};

    #[test]
    fn registry_is_ordered_per_platform() {
        let names: Vec<&str> = rules_for(Platform::Huawei).iter().map(|r| r.name).collect();
        assert_eq!(names[0], "no_value");
        assert!(names.contains(&"bgp_peers"));
        assert!(rule(Platform::Arista, "prefix_lists").is_some());
        assert!(rule(Platform::Huawei, "prefix_lists").is_none());
    }

    #[test]
    fn shutdown_bracketing_is_idempotent() {
        let mut iface = Node::new(Platform::Huawei, "interface GE1/0/1");
        iface.add_child("port link-type trunk");
        bracket_with_shutdown(&mut iface);
        let once = iface.clone();
        bracket_with_shutdown(&mut iface);
        assert_eq!(iface, once);

        let lines: Vec<&str> = iface.children.iter().map(|c| c.line.as_str()).collect();
        assert_eq!(lines, vec!["shutdown", "port link-type trunk", "undo shutdown"]);
        assert!(iface.children[0].has_tag(PRE_TAG));
        assert!(iface.children[2].has_tag(POST_TAG));
        assert!(iface.children[2].has_tag(SKIP_DRY_RUN_TAG));
    }

    #[test]
    fn bracketing_leaves_target_admin_state_alone() {
        let mut iface = Node::new(Platform::CiscoIos, "interface Gi0/1");
        iface.add_child("switchport mode trunk");
        iface.add_child("shutdown");
        bracket_with_shutdown(&mut iface);
        assert_eq!(iface.children.len(), 2);
    }

    #[test]
    fn running_all_rules_on_empty_tree_is_noop() {
        for platform in Platform::ALL {
            let mut tree = Node::root(platform);
            run(rules_for(platform), &mut tree).expect("rules");
            assert!(tree.children.is_empty());
        }
    }
}
