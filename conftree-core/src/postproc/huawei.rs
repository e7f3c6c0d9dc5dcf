use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::postproc::{bracket_with_shutdown, is_removal, promote_to_pre, purge_removals, visit_sections};
use crate::range::{format_to_list, parse_number, parse_to_list, RangeError};
use crate::tree::{Node, POST_TAG};

/// VLAN spans a single Huawei command accepts.
const VLANS_PER_COMMAND: usize = 10;

static BGP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^bgp \d+").expect("built-in platform pattern"));
static GROUP_REMOVAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^undo group (\S+)(?: .*)?$").expect("built-in platform pattern"));
static PEER_DEFINITION_REMOVAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^undo peer (\S+) as-number(?: .*)?$").expect("built-in platform pattern")
});
static PEER_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:undo )?peer (\S+)(?: .*)?$").expect("built-in platform pattern"));
static GROUP_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:undo )?group (\S+)(?: .*)?$").expect("built-in platform pattern"));

static LOCAL_USER_REMOVAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^undo local-user (\S+) password(?: .*)?$").expect("built-in platform pattern")
});
static LOCAL_USER_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:undo )?local-user (\S+)(?: .*)?$").expect("built-in platform pattern")
});

static VLAN_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<undo>undo )?(?P<cmd>port trunk allow-pass vlan|port hybrid (?:un)?tagged vlan|vlan batch) (?P<list>\d.*)$",
    )
    .expect("built-in platform pattern")
});

static INTERFACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^interface (\S+)$").expect("built-in platform pattern"));
static LINK_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:undo )?(?:port link-type \S+|portswitch)$").expect("built-in platform pattern")
});
static L2_REMOVAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^undo port (?:trunk|hybrid|default) .*$").expect("built-in platform pattern")
});
static TRUNK_MEMBERSHIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^eth-trunk (\S+)$").expect("built-in platform pattern"));
static TRUNK_LEAVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^undo eth-trunk(?: \S+)?$").expect("built-in platform pattern"));

/// Collapse the removal of a whole BGP peer or peer group into one command.
///
/// `undo group X ...` becomes `undo group X` and `undo peer X as-number ...`
/// becomes `undo peer X`; every other removal mentioning X in the BGP
/// process (address families included) is dropped as redundant.
pub fn bgp_peers(tree: &mut Node) -> Result<(), RangeError> {
    for bgp in tree
        .children
        .iter_mut()
        .filter(|child| BGP.is_match(&child.line) && !is_removal(child))
    {
        let mut names = HashSet::new();
        let mut collapsed = Vec::new();
        for child in bgp.children.iter().filter(|child| child.has_tag(POST_TAG)) {
            if let Some(caps) = GROUP_REMOVAL.captures(&child.line) {
                collapsed.push((child.line.clone(), format!("undo group {}", &caps[1])));
                names.insert(caps[1].to_string());
            } else if let Some(caps) = PEER_DEFINITION_REMOVAL.captures(&child.line) {
                collapsed.push((child.line.clone(), format!("undo peer {}", &caps[1])));
                names.insert(caps[1].to_string());
            }
        }
        names.retain(|name| !redefined(bgp, name));
        if names.is_empty() {
            continue;
        }
        collapsed.retain(|(_, short)| short.split(' ').nth(2).is_some_and(|name| names.contains(name)));

        let keep: HashSet<String> = collapsed.iter().map(|(_, short)| short.clone()).collect();
        for (old, short) in &collapsed {
            bgp.rename_child(old, short);
        }
        purge_removals(bgp, &|line| {
            if keep.contains(line) {
                return false;
            }
            [&*PEER_COMMAND, &*GROUP_COMMAND].iter().any(|re| {
                re.captures(line)
                    .is_some_and(|caps| names.contains(&caps[1]))
            })
        });
    }
    Ok(())
}

/// An addition re-creates `name`, so its removal is a replacement rather
/// than a deletion.
fn redefined(bgp: &Node, name: &str) -> bool {
    bgp.children.iter().filter(|child| !is_removal(child)).any(|child| {
        child.line.starts_with(&format!("group {name} "))
            || child.line == format!("group {name}")
            || child.line.starts_with(&format!("peer {name} as-number "))
    })
}

/// Collapse the removal of a local user under `aaa` into
/// `undo local-user NAME`.
pub fn aaa_local_users(tree: &mut Node) -> Result<(), RangeError> {
    let Some(aaa) = tree.children.iter_mut().find(|child| child.line == "aaa" && !is_removal(child)) else {
        return Ok(());
    };

    let mut users = HashSet::new();
    let mut collapsed = Vec::new();
    for child in aaa.children.iter().filter(|child| child.has_tag(POST_TAG)) {
        if let Some(caps) = LOCAL_USER_REMOVAL.captures(&child.line) {
            let name = caps[1].to_string();
            let recreated = aaa.children.iter().any(|other| {
                !is_removal(other) && other.line.starts_with(&format!("local-user {name} password"))
            });
            if !recreated {
                collapsed.push((child.line.clone(), format!("undo local-user {name}")));
                users.insert(name);
            }
        }
    }
    if users.is_empty() {
        return Ok(());
    }

    let keep: HashSet<String> = collapsed.iter().map(|(_, short)| short.clone()).collect();
    for (old, short) in &collapsed {
        aaa.rename_child(old, short);
    }
    purge_removals(aaa, &|line| {
        !keep.contains(line)
            && LOCAL_USER_COMMAND
                .captures(line)
                .is_some_and(|caps| users.contains(&caps[1]))
    });
    Ok(())
}

/// Replace paired removal and re-addition of VLAN member lists with the
/// minimal delta: `CMD A to B ...` for new members and `undo CMD ...` for
/// dropped ones.
pub fn vlan_ranges(tree: &mut Node) -> Result<(), RangeError> {
    visit_sections(tree, &mut rewrite_vlan_lists);
    Ok(())
}

fn rewrite_vlan_lists(section: &mut Node) {
    let mut commands: Vec<String> = Vec::new();
    for child in &section.children {
        if let Some(caps) = VLAN_LIST.captures(&child.line) {
            if !commands.iter().any(|cmd| cmd == &caps["cmd"]) {
                commands.push(caps["cmd"].to_string());
            }
        }
    }

    for command in commands {
        let mut added = BTreeSet::new();
        let mut removed = BTreeSet::new();
        let mut additions = Vec::new();
        let mut removals = Vec::new();
        for child in &section.children {
            let Some(caps) = VLAN_LIST.captures(&child.line) else {
                continue;
            };
            if caps["cmd"] != command {
                continue;
            }
            let Some(members) = parse_to_list(&caps["list"]) else {
                continue;
            };
            match (caps.name("undo").is_some(), child.has_tag(POST_TAG)) {
                (true, true) => {
                    removed.extend(members);
                    removals.push(child.line.clone());
                }
                (false, false) if !is_removal(child) => {
                    added.extend(members);
                    additions.push(child.line.clone());
                }
                _ => {}
            }
        }
        if additions.is_empty() || removals.is_empty() {
            continue;
        }

        let anchor = section.position(&additions[0]).unwrap_or(section.children.len());
        let tags = section
            .child(&additions[0])
            .map(|node| node.tags.clone())
            .unwrap_or_default();
        let removal_tags = section
            .child(&removals[0])
            .map(|node| node.tags.clone())
            .unwrap_or_default();
        for line in additions.iter().chain(&removals) {
            section.remove_child(line);
        }

        let platform = section.platform;
        let to_add: BTreeSet<u32> = added.difference(&removed).copied().collect();
        let to_remove: BTreeSet<u32> = removed.difference(&added).copied().collect();
        let anchor = anchor.min(section.children.len());
        for (offset, list) in format_to_list(&to_add, VLANS_PER_COMMAND).into_iter().enumerate() {
            let mut node = Node::new(platform, format!("{command} {list}"));
            node.tags.clone_from(&tags);
            section.insert_child_at(anchor + offset, node);
        }
        for list in format_to_list(&to_remove, VLANS_PER_COMMAND) {
            let mut node = Node::new(platform, format!("undo {command} {list}"));
            node.tags.clone_from(&removal_tags);
            section.insert_child(node);
        }
    }
}

/// Changing the layer-2 mode of an interface needs the port shut, and the
/// old layer-2 settings gone before the new mode is set.
pub fn link_type(tree: &mut Node) -> Result<(), RangeError> {
    for iface in tree
        .children
        .iter_mut()
        .filter(|child| INTERFACE.is_match(&child.line) && !is_removal(child))
    {
        let Some(mode_idx) = iface
            .children
            .iter()
            .position(|child| LINK_TYPE.is_match(&child.line))
        else {
            continue;
        };

        let stale: Vec<usize> = iface
            .children
            .iter()
            .enumerate()
            .skip(mode_idx + 1)
            .filter(|(_, child)| child.has_tag(POST_TAG) && L2_REMOVAL.is_match(&child.line))
            .map(|(idx, _)| idx)
            .collect();
        for (moved, idx) in stale.into_iter().enumerate() {
            let mut node = iface.children.remove(idx);
            promote_to_pre(&mut node);
            iface.children.insert(mode_idx + moved, node);
        }
        bracket_with_shutdown(iface);
    }
    Ok(())
}

/// Order link aggregation changes: a port leaves its Eth-Trunk before any
/// other change on it, and sub-interfaces of a port joining an Eth-Trunk
/// are removed before the port is configured.
pub fn eth_trunk_members(tree: &mut Node) -> Result<(), RangeError> {
    let mut joining = Vec::new();
    for iface in tree
        .children
        .iter_mut()
        .filter(|child| INTERFACE.is_match(&child.line) && !is_removal(child))
    {
        if let Some(idx) = iface
            .children
            .iter()
            .position(|child| child.has_tag(POST_TAG) && TRUNK_LEAVE.is_match(&child.line))
        {
            let mut node = iface.children.remove(idx);
            promote_to_pre(&mut node);
            let front = usize::from(iface.children.first().is_some_and(|first| first.line == "shutdown"));
            iface.children.insert(front, node);
        }

        for child in iface.children.iter().filter(|child| !is_removal(child)) {
            if let Some(caps) = TRUNK_MEMBERSHIP.captures(&child.line) {
                parse_number(&caps[1])?;
                if let Some(caps) = INTERFACE.captures(&iface.line) {
                    joining.push((iface.line.clone(), caps[1].to_string()));
                }
            }
        }
    }

    for (header, port) in joining {
        let subinterfaces: Vec<String> = tree
            .children
            .iter()
            .filter(|child| {
                child.has_tag(POST_TAG)
                    && child
                        .line
                        .strip_prefix("undo interface ")
                        .and_then(|name| name.strip_prefix(port.as_str()))
                        .is_some_and(|rest| rest.starts_with('.'))
            })
            .map(|child| child.line.clone())
            .collect();
        for line in subinterfaces {
            if let Some(node) = tree.child_mut(&line) {
                promote_to_pre(node);
            }
            tree.move_before(&line, &header);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{aaa_local_users, bgp_peers, eth_trunk_members, link_type, vlan_ranges};
    use crate::diff::{diff_with_options, DiffOptions};
    use crate::parser::parse;
    use crate::platform::Platform;
    use crate::range::RangeError;
    use crate::tree::{Node, PRE_TAG};

    fn raw_diff(current: &str, target: &str) -> Node {
        let a = parse(current, Platform::Huawei).expect("parse");
        let b = parse(target, Platform::Huawei).expect("parse");
        diff_with_options(&a, &b, &DiffOptions::default().raw()).expect("diff")
    }

    fn assert_idempotent(rule: fn(&mut Node) -> Result<(), RangeError>, tree: &mut Node) {
        rule(tree).expect("rule");
        let once = tree.clone();
        let once_patch = tree.patch();
        rule(tree).expect("rule");
        assert_eq!(*tree, once);
        assert_eq!(tree.patch(), once_patch);
    }

    #[test]
    fn removed_peer_group_collapses_to_one_command() {
        let current = "bgp 12345\n group PEER-GROUP external\n peer PEER-GROUP bfd enable\n";
        let mut out = raw_diff(current, "bgp 12345\n");
        assert_idempotent(bgp_peers, &mut out);
        assert_eq!(out.patch(), "bgp 12345\nundo group PEER-GROUP\nquit\n");
    }

    #[test]
    fn removed_peer_drops_family_settings() {
        let current = "bgp 65000\n peer 10.0.0.1 as-number 65001\n peer 10.0.0.1 description upstream\n ipv4-family unicast\n  peer 10.0.0.1 enable\n  network 10.1.0.0 255.255.0.0\n";
        let target = "bgp 65000\n ipv4-family unicast\n  network 10.1.0.0 255.255.0.0\n";
        let mut out = raw_diff(current, target);
        assert_idempotent(bgp_peers, &mut out);
        assert_eq!(out.patch(), "bgp 65000\nundo peer 10.0.0.1\nquit\n");
    }

    #[test]
    fn replaced_peer_group_keeps_attribute_removals() {
        let current = "bgp 1\n group G external\n peer G bfd enable\n";
        let target = "bgp 1\n group G internal\n";
        let mut out = raw_diff(current, target);
        bgp_peers(&mut out).expect("rule");
        assert_eq!(
            out.patch(),
            "bgp 1\ngroup G internal\nundo group G external\nundo peer G bfd enable\nquit\n"
        );
    }

    #[test]
    fn removed_local_user_collapses() {
        let current = "aaa\n local-user bob password irreversible-cipher xyz\n local-user bob privilege level 3\n local-user bob service-type ssh\n";
        let mut out = raw_diff(current, "aaa\n");
        assert_idempotent(aaa_local_users, &mut out);
        assert_eq!(out.patch(), "aaa\nundo local-user bob\nquit\n");
    }

    #[test]
    fn vlan_lists_become_minimal_delta() {
        let current = "interface GE1/0/1\n port trunk allow-pass vlan 10 to 20\n";
        let target = "interface GE1/0/1\n port trunk allow-pass vlan 15 to 25\n";
        let mut out = raw_diff(current, target);
        assert_idempotent(vlan_ranges, &mut out);
        assert_eq!(
            out.patch(),
            "interface GE1/0/1\nport trunk allow-pass vlan 21 to 25\nundo port trunk allow-pass vlan 10 to 14\nquit\n"
        );
    }

    #[test]
    fn vlan_batch_at_top_level_is_rewritten() {
        let mut out = raw_diff("vlan batch 10 20\n", "vlan batch 10 20 30\n");
        vlan_ranges(&mut out).expect("rule");
        assert_eq!(out.patch(), "vlan batch 30\n");
    }

    #[test]
    fn link_type_change_is_bracketed_by_shutdown() {
        let current = "interface GE1/0/2\n port link-type trunk\n port trunk allow-pass vlan 10\n";
        let target = "interface GE1/0/2\n port link-type access\n";
        let mut out = raw_diff(current, target);
        assert_idempotent(link_type, &mut out);
        assert_eq!(
            out.patch(),
            "interface GE1/0/2\nshutdown\nundo port trunk allow-pass vlan 10\nport link-type access\nundo port link-type trunk\nundo shutdown\nquit\n"
        );
        let iface = out.child("interface GE1/0/2").expect("interface");
        assert!(iface.child("undo port trunk allow-pass vlan 10").expect("stale").has_tag(PRE_TAG));
    }

    #[test]
    fn leaving_eth_trunk_goes_first() {
        let current = "interface GE1/0/3\n eth-trunk 1\n description member\n";
        let target = "interface GE1/0/3\n description standalone\n";
        let mut out = raw_diff(current, target);
        assert_idempotent(eth_trunk_members, &mut out);
        assert_eq!(
            out.patch(),
            "interface GE1/0/3\nundo eth-trunk 1\ndescription standalone\nundo description member\nquit\n"
        );
    }

    #[test]
    fn subinterfaces_removed_before_joining_trunk() {
        let current = "interface GE1/0/4\n description uplink\ninterface GE1/0/4.100\n dot1q termination vid 100\n";
        let target = "interface GE1/0/4\n description uplink\n eth-trunk 2\n";
        let mut out = raw_diff(current, target);
        assert_idempotent(eth_trunk_members, &mut out);
        assert_eq!(
            out.patch(),
            "undo interface GE1/0/4.100\ninterface GE1/0/4\neth-trunk 2\nquit\n"
        );
    }

    #[test]
    fn non_numeric_trunk_is_a_range_error() {
        let mut out = raw_diff("interface GE1/0/5\n", "interface GE1/0/5\n eth-trunk x\n");
        let err = eth_trunk_members(&mut out).expect_err("bad trunk number");
        assert_eq!(err.to_string(), "wrong interface number");
    }
}
