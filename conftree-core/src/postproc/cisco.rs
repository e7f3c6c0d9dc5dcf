use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::postproc::{bracket_with_shutdown, is_removal, promote_to_pre, purge_removals};
use crate::range::{format_dash_list, parse_dash_list, RangeError};
use crate::tree::{Node, POST_TAG};

static PREFIX_LIST_REMOVAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^no (ip|ipv6) prefix-list (\S+) seq (\d+)(?: .*)?$").expect("built-in platform pattern")
});

static ROUTER_BGP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^router bgp \d+").expect("built-in platform pattern"));
static NEIGHBOR_DEFINITION_REMOVAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^no neighbor (\S+) (?:remote-as \S+|peer-group)$").expect("built-in platform pattern")
});
static NEIGHBOR_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:no )?neighbor (\S+)(?: .*)?$").expect("built-in platform pattern")
});

static INTERFACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^interface \S+$").expect("built-in platform pattern"));
static ALLOWED_VLANS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<no>no )?switchport trunk allowed vlan (?:add )?(?P<list>\d[\d,\-]*)$")
        .expect("built-in platform pattern")
});
static SWITCHPORT_MODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:no )?switchport(?: mode \S+)?$").expect("built-in platform pattern")
});

/// Remove prefix-list entries by sequence number only, ahead of a
/// replacement entry with the same sequence.
pub fn prefix_lists(tree: &mut Node) -> Result<(), RangeError> {
    let removals: Vec<(String, String, String)> = tree
        .children
        .iter()
        .filter(|child| child.has_tag(POST_TAG))
        .filter_map(|child| {
            let caps = PREFIX_LIST_REMOVAL.captures(&child.line)?;
            let short = format!("no {} prefix-list {} seq {}", &caps[1], &caps[2], &caps[3]);
            let entry = format!("{} prefix-list {} seq {} ", &caps[1], &caps[2], &caps[3]);
            Some((child.line.clone(), short, entry))
        })
        .collect();

    for (old, short, entry) in removals {
        tree.rename_child(&old, &short);
        let replacement = tree
            .children
            .iter()
            .find(|child| !is_removal(child) && child.line.starts_with(&entry))
            .map(|child| child.line.clone());
        if let Some(replacement) = replacement {
            if let Some(node) = tree.child_mut(&short) {
                promote_to_pre(node);
            }
            tree.move_before(&short, &replacement);
        }
    }
    Ok(())
}

/// Collapse the removal of a whole BGP neighbor or peer group into
/// `no neighbor X`, dropping the other removals that mention it.
pub fn bgp_neighbors(tree: &mut Node) -> Result<(), RangeError> {
    for bgp in tree
        .children
        .iter_mut()
        .filter(|child| ROUTER_BGP.is_match(&child.line) && !is_removal(child))
    {
        let mut names = HashSet::new();
        let mut collapsed = Vec::new();
        for child in bgp.children.iter().filter(|child| child.has_tag(POST_TAG)) {
            let Some(caps) = NEIGHBOR_DEFINITION_REMOVAL.captures(&child.line) else {
                continue;
            };
            let name = caps[1].to_string();
            let redefined = bgp.children.iter().any(|other| {
                !is_removal(other)
                    && (other.line.starts_with(&format!("neighbor {name} remote-as "))
                        || other.line == format!("neighbor {name} peer-group"))
            });
            if !redefined {
                collapsed.push((child.line.clone(), format!("no neighbor {name}")));
                names.insert(name);
            }
        }
        if names.is_empty() {
            continue;
        }

        let keep: HashSet<String> = collapsed.iter().map(|(_, short)| short.clone()).collect();
        for (old, short) in &collapsed {
            bgp.rename_child(old, short);
        }
        purge_removals(bgp, &|line| {
            !keep.contains(line)
                && NEIGHBOR_COMMAND
                    .captures(line)
                    .is_some_and(|caps| names.contains(&caps[1]))
        });
    }
    Ok(())
}

/// Turn a replaced trunk allowed-VLAN list into `add`/`remove` deltas so
/// unchanged VLANs never drop off the trunk.
pub fn allowed_vlans(tree: &mut Node) -> Result<(), RangeError> {
    for iface in tree
        .children
        .iter_mut()
        .filter(|child| INTERFACE.is_match(&child.line) && !is_removal(child))
    {
        let mut added = BTreeSet::new();
        let mut removed = BTreeSet::new();
        let mut additions = Vec::new();
        let mut removals = Vec::new();
        for child in &iface.children {
            let Some(caps) = ALLOWED_VLANS.captures(&child.line) else {
                continue;
            };
            let Some(members) = parse_dash_list(&caps["list"]) else {
                continue;
            };
            if caps.name("no").is_some() && child.has_tag(POST_TAG) {
                removed.extend(members);
                removals.push(child.line.clone());
            } else if caps.name("no").is_none() && !is_removal(child) {
                added.extend(members);
                additions.push(child.line.clone());
            }
        }
        if additions.is_empty() || removals.is_empty() {
            continue;
        }

        let anchor = iface.position(&additions[0]).unwrap_or(iface.children.len());
        let tags = iface
            .child(&additions[0])
            .map(|node| node.tags.clone())
            .unwrap_or_default();
        for line in additions.iter().chain(&removals) {
            iface.remove_child(line);
        }
        let anchor = anchor.min(iface.children.len());

        let to_add: BTreeSet<u32> = added.difference(&removed).copied().collect();
        let to_remove: BTreeSet<u32> = removed.difference(&added).copied().collect();
        let platform = iface.platform;
        let mut offset = 0;
        if !to_add.is_empty() {
            let line = format!("switchport trunk allowed vlan add {}", format_dash_list(&to_add));
            let mut node = Node::new(platform, line);
            node.tags.clone_from(&tags);
            iface.insert_child_at(anchor, node);
            offset += 1;
        }
        if !to_remove.is_empty() {
            let line = format!("switchport trunk allowed vlan remove {}", format_dash_list(&to_remove));
            let mut node = Node::new(platform, line);
            node.tags.clone_from(&tags);
            iface.insert_child_at(anchor + offset, node);
        }
    }
    Ok(())
}

/// Shut an interface while its switchport mode changes.
pub fn switchport_mode(tree: &mut Node) -> Result<(), RangeError> {
    for iface in tree
        .children
        .iter_mut()
        .filter(|child| INTERFACE.is_match(&child.line) && !is_removal(child))
    {
        if iface
            .children
            .iter()
            .any(|child| SWITCHPORT_MODE.is_match(&child.line))
        {
            bracket_with_shutdown(iface);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{allowed_vlans, bgp_neighbors, prefix_lists, switchport_mode};
    use crate::diff::{diff_with_options, DiffOptions};
    use crate::parser::parse;
    use crate::platform::Platform;
    use crate::range::RangeError;
    use crate::tree::{Node, PRE_TAG};

    fn raw_diff(current: &str, target: &str, platform: Platform) -> Node {
        let a = parse(current, platform).expect("parse");
        let b = parse(target, platform).expect("parse");
        diff_with_options(&a, &b, &DiffOptions::default().raw()).expect("diff")
    }

    fn assert_idempotent(rule: fn(&mut Node) -> Result<(), RangeError>, tree: &mut Node) {
        rule(tree).expect("rule");
        let once_patch = tree.patch();
        let once = tree.clone();
        rule(tree).expect("rule");
        assert_eq!(*tree, once);
        assert_eq!(tree.patch(), once_patch);
    }

    #[test]
    fn replaced_prefix_list_entry_removed_by_seq_first() {
        let mut out = raw_diff(
            "ip prefix-list TEST_PL_1 seq 20 permit 10.1.31.0/24 eq 32\n",
            "ip prefix-list TEST_PL_1 seq 20 permit 10.1.131.0/24 eq 32\n",
            Platform::CiscoIos,
        );
        assert_idempotent(prefix_lists, &mut out);
        assert_eq!(
            out.patch(),
            "no ip prefix-list TEST_PL_1 seq 20\nip prefix-list TEST_PL_1 seq 20 permit 10.1.131.0/24 eq 32\n"
        );
        assert!(out.children[0].has_tag(PRE_TAG));
    }

    #[test]
    fn dropped_prefix_list_entry_stays_trailing() {
        let mut out = raw_diff(
            "ip prefix-list PL seq 5 permit 10.0.0.0/8\nip prefix-list PL seq 10 deny 0.0.0.0/0 le 32\n",
            "ip prefix-list PL seq 10 deny 0.0.0.0/0 le 32\n",
            Platform::Arista,
        );
        prefix_lists(&mut out).expect("rule");
        assert_eq!(out.patch(), "no ip prefix-list PL seq 5\n");
    }

    #[test]
    fn removed_neighbor_collapses() {
        let current = "router bgp 65000\n neighbor 10.0.0.2 remote-as 65001\n neighbor 10.0.0.2 description peer\n address-family ipv4\n  neighbor 10.0.0.2 activate\n  network 10.0.0.0 mask 255.0.0.0\n exit-address-family\n";
        let target = "router bgp 65000\n address-family ipv4\n  network 10.0.0.0 mask 255.0.0.0\n exit-address-family\n";
        let mut out = raw_diff(current, target, Platform::CiscoIos);
        assert_idempotent(bgp_neighbors, &mut out);
        assert_eq!(out.patch(), "router bgp 65000\nno neighbor 10.0.0.2\nexit\n");
    }

    #[test]
    fn allowed_vlan_change_becomes_add_and_remove() {
        let mut out = raw_diff(
            "interface Ethernet1\n switchport trunk allowed vlan 10-20,30\n",
            "interface Ethernet1\n switchport trunk allowed vlan 15-25,30\n",
            Platform::CiscoNxos,
        );
        assert_idempotent(allowed_vlans, &mut out);
        assert_eq!(
            out.patch(),
            "interface Ethernet1\nswitchport trunk allowed vlan add 21-25\nswitchport trunk allowed vlan remove 10-14\nexit\n"
        );
    }

    #[test]
    fn switchport_mode_change_is_bracketed() {
        let mut out = raw_diff(
            "interface Gi0/1\n switchport mode access\n",
            "interface Gi0/1\n switchport mode trunk\n",
            Platform::CiscoIos,
        );
        assert_idempotent(switchport_mode, &mut out);
        assert_eq!(
            out.patch(),
            "interface Gi0/1\nshutdown\nswitchport mode trunk\nno switchport mode access\nno shutdown\nexit\n"
        );
    }
}
