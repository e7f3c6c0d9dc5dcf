use std::collections::HashMap;
use std::str::FromStr;

use regex::Regex;

use crate::diff::engine::{compile_sections, matches_any, DiffError, DiffOptions};
use crate::diff::lcs::lcs;
use crate::platform::{PlatformSpec, NEWLINE_MARKER};
use crate::tree::{join_path, Node};

/// How much of the two trees a human diff shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HumanDiffMode {
    /// Every line of both trees.
    #[default]
    Full,
    /// Changed lines plus the section headers leading to them.
    DiffOnly,
}

impl FromStr for HumanDiffMode {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(HumanDiffMode::Full),
            "diff-only" => Ok(HumanDiffMode::DiffOnly),
            other => Err(DiffError::UnknownMode(other.to_string())),
        }
    }
}

/// Side-by-side style rendering of `current` against `target`.
///
/// Every line is prefixed with `-` (only in current), `+` (only in target)
/// or a space. Children are matched by line, so a line that only moved is
/// unchanged.
pub fn human_diff(current: &Node, target: &Node, mode: HumanDiffMode) -> Result<String, DiffError> {
    human_diff_with_options(current, target, mode, &DiffOptions::default(), false)
}

/// [`human_diff`] honoring the ordered sections of `opts`, where children
/// are aligned by longest common subsequence instead. With `masked`,
/// secrets are replaced the way `masked_config` does.
pub fn human_diff_with_options(
    current: &Node,
    target: &Node,
    mode: HumanDiffMode,
    opts: &DiffOptions,
    masked: bool,
) -> Result<String, DiffError> {
    if current.platform != target.platform {
        return Err(DiffError::PlatformMismatch);
    }
    let renderer = Renderer {
        mode,
        spec: current.spec(),
        ordered: compile_sections(&opts.ordered_sections)?,
        reorder_root: opts.reorder_root,
        masked,
    };
    let mut out = String::new();
    renderer.level(current, target, "", 0, &mut out);
    Ok(out)
}

struct Renderer {
    mode: HumanDiffMode,
    spec: &'static dyn PlatformSpec,
    ordered: Vec<Regex>,
    reorder_root: bool,
    masked: bool,
}

impl Renderer {
    fn level(&self, a: &Node, b: &Node, path: &str, depth: usize, out: &mut String) {
        let ordered = if path.is_empty() {
            self.reorder_root
        } else {
            matches_any(&self.ordered, path)
        };
        if ordered {
            self.ordered_level(a, b, path, depth, out);
        } else {
            self.keyed_level(a, b, path, depth, out);
        }
    }

    /// Match children by line; lines only in `a` are shown just before the
    /// target line that follows them.
    fn keyed_level(&self, a: &Node, b: &Node, path: &str, depth: usize, out: &mut String) {
        let index: HashMap<&str, usize> = a
            .children
            .iter()
            .enumerate()
            .map(|(idx, child)| (child.line.as_str(), idx))
            .collect();
        let partners: Vec<Option<usize>> = b
            .children
            .iter()
            .map(|child| index.get(child.line.as_str()).copied())
            .collect();
        let mut shown = vec![false; a.children.len()];
        for idx in partners.iter().flatten() {
            shown[*idx] = true;
        }

        for (j, theirs) in b.children.iter().enumerate() {
            let bound = partners[j..]
                .iter()
                .flatten()
                .next()
                .copied()
                .unwrap_or(a.children.len());
            for (idx, mine) in a.children.iter().enumerate().take(bound) {
                if !shown[idx] {
                    shown[idx] = true;
                    self.subtree('-', mine, depth, out);
                }
            }
            match partners[j] {
                Some(i) => self.pair(&a.children[i], theirs, path, depth, out),
                None => self.subtree('+', theirs, depth, out),
            }
        }
        for (idx, mine) in a.children.iter().enumerate() {
            if !shown[idx] {
                self.subtree('-', mine, depth, out);
            }
        }
    }

    fn ordered_level(&self, a: &Node, b: &Node, path: &str, depth: usize, out: &mut String) {
        let a_keys: Vec<&str> = a.children.iter().map(|child| child.line.as_str()).collect();
        let b_keys: Vec<&str> = b.children.iter().map(|child| child.line.as_str()).collect();
        let pairs = lcs(&a_keys, &b_keys);

        let (mut i, mut j) = (0, 0);
        let end = (a_keys.len(), b_keys.len());
        for (pi, pj) in pairs.into_iter().chain(std::iter::once(end)) {
            for mine in &a.children[i..pi] {
                self.subtree('-', mine, depth, out);
            }
            for theirs in &b.children[j..pj] {
                self.subtree('+', theirs, depth, out);
            }
            if (pi, pj) == end {
                break;
            }
            self.pair(&a.children[pi], &b.children[pj], path, depth, out);
            i = pi + 1;
            j = pj + 1;
        }
    }

    /// A line present on both sides.
    fn pair(&self, mine: &Node, theirs: &Node, path: &str, depth: usize, out: &mut String) {
        if mine == theirs {
            if self.mode == HumanDiffMode::Full {
                self.subtree(' ', theirs, depth, out);
            }
        } else {
            self.line(' ', &theirs.line, depth, out);
            self.level(mine, theirs, &join_path(path, &theirs.line), depth + 1, out);
        }
    }

    fn subtree(&self, marker: char, node: &Node, depth: usize, out: &mut String) {
        self.line(marker, &node.line, depth, out);
        for child in &node.children {
            self.subtree(marker, child, depth + 1, out);
        }
    }

    fn line(&self, marker: char, line: &str, depth: usize, out: &mut String) {
        let text = if self.masked {
            self.spec.mask(line)
        } else {
            line.to_string()
        };
        out.push(marker);
        out.push(' ');
        out.push_str(&self.spec.indent().repeat(depth));
        out.push_str(&text.replace(NEWLINE_MARKER, "\n"));
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{human_diff, human_diff_with_options, HumanDiffMode};
    use crate::diff::DiffOptions;
    use crate::parser::parse;
    use crate::platform::{Platform, MASK};

    const CURRENT: &str = "hostname r1\ninterface Gi0/1\n mtu 9000\n description old\nntp server 10.0.0.1\n";
    const TARGET: &str = "hostname r1\ninterface Gi0/1\n mtu 9000\n description new\nntp server 10.0.0.1\n";

    #[test]
    fn full_mode_shows_every_line() {
        let a = parse(CURRENT, Platform::CiscoIos).expect("parse");
        let b = parse(TARGET, Platform::CiscoIos).expect("parse");
        let out = human_diff(&a, &b, HumanDiffMode::Full).expect("human diff");
        assert_eq!(
            out,
            "  hostname r1\n  interface Gi0/1\n   mtu 9000\n-  description old\n+  description new\n  ntp server 10.0.0.1\n"
        );
    }

    #[test]
    fn diff_only_mode_keeps_headers_for_context() {
        let a = parse(CURRENT, Platform::CiscoIos).expect("parse");
        let b = parse(TARGET, Platform::CiscoIos).expect("parse");
        let out = human_diff(&a, &b, HumanDiffMode::DiffOnly).expect("human diff");
        assert_eq!(
            out,
            "  interface Gi0/1\n-  description old\n+  description new\n"
        );
    }

    #[test]
    fn moved_line_in_unordered_section_is_unchanged() {
        let a = parse("hostname r1\nntp server 10.0.0.1\n", Platform::CiscoIos).expect("parse");
        let b = parse("ntp server 10.0.0.1\nhostname r1\n", Platform::CiscoIos).expect("parse");
        assert_eq!(human_diff(&a, &b, HumanDiffMode::DiffOnly).expect("human diff"), "");
        assert_eq!(
            human_diff(&a, &b, HumanDiffMode::Full).expect("human diff"),
            "  ntp server 10.0.0.1\n  hostname r1\n"
        );
    }

    #[test]
    fn ordered_section_shows_moves() {
        let a = parse("route-map RM\n a\n b\n", Platform::CiscoIos).expect("parse");
        let b = parse("route-map RM\n b\n a\n", Platform::CiscoIos).expect("parse");
        let opts = DiffOptions {
            ordered_sections: vec!["route-map .*".to_string()],
            ..DiffOptions::default()
        };
        let keyed = human_diff(&a, &b, HumanDiffMode::DiffOnly).expect("human diff");
        assert_eq!(keyed, "");
        let ordered =
            human_diff_with_options(&a, &b, HumanDiffMode::DiffOnly, &opts, false).expect("human diff");
        assert!(ordered.starts_with("  route-map RM\n"));
        assert!(ordered.contains("- ") && ordered.contains("+ "));
    }

    #[test]
    fn masked_rendering_hides_secrets() {
        let a = parse("snmp-server community TOPSECRET RO\n", Platform::CiscoIos).expect("parse");
        let b = parse("snmp-server community OTHER RO\n", Platform::CiscoIos).expect("parse");
        let out = human_diff_with_options(&a, &b, HumanDiffMode::DiffOnly, &DiffOptions::default(), true)
            .expect("human diff");
        assert!(!out.contains("TOPSECRET"));
        assert!(!out.contains("OTHER"));
        assert!(out.contains(MASK));
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("diff-only".parse::<HumanDiffMode>().ok(), Some(HumanDiffMode::DiffOnly));
        assert!("everything".parse::<HumanDiffMode>().is_err());
    }
}
