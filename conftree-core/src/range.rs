//! Numeric range parsing and encoding for VTY, VLAN and interface lists.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use thiserror::Error;

/// A number in an interface or line range is not a valid unsigned integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("wrong interface number")]
pub struct RangeError {
    /// Offending text.
    pub value: String,
}

pub fn parse_number(value: &str) -> Result<u32, RangeError> {
    value.trim().parse().map_err(|_| RangeError {
        value: value.to_string(),
    })
}

/// Inclusive range between two textual bounds.
pub fn expand_bounds(start: &str, end: &str) -> Result<RangeInclusive<u32>, RangeError> {
    let first = parse_number(start)?;
    let last = parse_number(end)?;
    if first > last {
        return Err(RangeError {
            value: format!("{start} {end}"),
        });
    }
    Ok(first..=last)
}

/// Highest VLAN id a member list may hold.
pub const MAX_VLAN: u32 = 4094;

fn vlan_member(token: &str) -> Option<u32> {
    token.trim().parse().ok().filter(|&id| id <= MAX_VLAN)
}

/// Parse a Huawei-style member list such as `10 to 20 30`.
///
/// Returns `None` when any token is not a VLAN id (for example `all`).
pub fn parse_to_list(list: &str) -> Option<BTreeSet<u32>> {
    let tokens: Vec<&str> = list.split_whitespace().collect();
    let mut out = BTreeSet::new();
    let mut idx = 0;
    while idx < tokens.len() {
        let first = vlan_member(tokens[idx])?;
        if tokens.get(idx + 1) == Some(&"to") {
            let last = vlan_member(tokens.get(idx + 2)?)?;
            if first > last {
                return None;
            }
            out.extend(first..=last);
            idx += 3;
        } else {
            out.insert(first);
            idx += 1;
        }
    }
    (!out.is_empty()).then_some(out)
}

/// Encode members as `A to B C` lists, at most `per_command` spans each.
pub fn format_to_list(members: &BTreeSet<u32>, per_command: usize) -> Vec<String> {
    spans(members)
        .chunks(per_command.max(1))
        .map(|chunk| {
            chunk
                .iter()
                .map(|&(first, last)| {
                    if first == last {
                        first.to_string()
                    } else {
                        format!("{first} to {last}")
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Parse a Cisco-style member list such as `10-20,30`.
///
/// Returns `None` when any item is not a VLAN id.
pub fn parse_dash_list(list: &str) -> Option<BTreeSet<u32>> {
    let mut out = BTreeSet::new();
    for item in list.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        match item.split_once('-') {
            Some((first, last)) => {
                let first = vlan_member(first)?;
                let last = vlan_member(last)?;
                if first > last {
                    return None;
                }
                out.extend(first..=last);
            }
            None => {
                out.insert(vlan_member(item)?);
            }
        }
    }
    (!out.is_empty()).then_some(out)
}

/// Encode members as a `A-B,C` list.
pub fn format_dash_list(members: &BTreeSet<u32>) -> String {
    spans(members)
        .into_iter()
        .map(|(first, last)| {
            if first == last {
                first.to_string()
            } else {
                format!("{first}-{last}")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn spans(members: &BTreeSet<u32>) -> Vec<(u32, u32)> {
    let mut out: Vec<(u32, u32)> = Vec::new();
    for &member in members {
        match out.last_mut() {
            Some((_, last)) if last.checked_add(1) == Some(member) => *last = member,
            _ => out.push((member, member)),
        }
    }
    out
}
