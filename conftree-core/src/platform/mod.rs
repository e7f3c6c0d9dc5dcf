//! Per-vendor syntax descriptors.
//!
//! Every [`Platform`] variant resolves to one static [`PlatformSpec`]
//! implementation holding its keywords, section rules, junk filters, secret
//! masks and text/tree hooks.

mod arista;
mod cisco;
mod huawei;
mod text;

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::range::RangeError;
use crate::tree::Node;

/// Stand-in for a physical newline inside a folded multi-line statement.
pub const NEWLINE_MARKER: char = '\u{2424}';
/// Replacement text for masked secrets.
pub const MASK: &str = "******";

/// Supported device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Huawei,
    CiscoIos,
    CiscoNxos,
    Arista,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Huawei,
        Platform::CiscoIos,
        Platform::CiscoNxos,
        Platform::Arista,
    ];

    /// Static descriptor for this platform.
    pub fn spec(self) -> &'static dyn PlatformSpec {
        match self {
            Platform::Huawei => &huawei::Huawei,
            Platform::CiscoIos => &cisco::CiscoIos,
            Platform::CiscoNxos => &cisco::CiscoNxos,
            Platform::Arista => &arista::Arista,
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name()
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned for an unrecognized platform name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown platform '{0}' (expected huawei, cisco-ios, cisco-nxos or arista)")]
pub struct PlatformError(pub String);

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Platform::ALL
            .into_iter()
            .find(|platform| platform.name() == wanted)
            .ok_or_else(|| PlatformError(s.to_string()))
    }
}

/// A section whose end must be spelled out with a dedicated command.
#[derive(Debug)]
pub struct ExitRule {
    /// Matched against the section header line.
    pub section: Regex,
    /// Closing command, rendered at the header's indentation.
    pub exit: &'static str,
}

/// Keywords, regex lists and hooks that make up one vendor dialect.
pub trait PlatformSpec: Sync {
    fn name(&self) -> &'static str;
    /// One level of indentation.
    fn indent(&self) -> &'static str;
    /// Negation keyword (`no`, `undo`).
    fn undo(&self) -> &'static str;
    /// Generic command leaving a section.
    fn exit(&self) -> &'static str;
    /// Line printed between top-level sections.
    fn separator(&self) -> &'static str;
    /// Lines dropped while parsing.
    fn junk_lines(&self) -> &[Regex];
    /// Regexes whose first capture group is a secret.
    fn mask_patterns(&self) -> &[Regex];

    fn sections_require_exit(&self) -> &[ExitRule] {
        &[]
    }

    /// Sections closed implicitly, which get no generic exit in a patch.
    fn sections_without_exit(&self) -> &[Regex] {
        &[]
    }

    /// Formal-path patterns diffed as atomic blocks unless overridden.
    fn no_diff_sections(&self) -> &[&'static str] {
        &[]
    }

    /// Rewrite raw text before it is split into lines.
    fn pre_run(&self, text: &str) -> Result<String, RangeError> {
        Ok(text.to_string())
    }

    /// Rewrite the tree after parsing.
    fn post_run(&self, _root: &mut Node) {}

    fn is_junk(&self, line: &str) -> bool {
        self.junk_lines().iter().any(|re| re.is_match(line))
    }

    /// Positive form of an undo-prefixed line.
    fn strip_undo<'a>(&self, line: &'a str) -> Option<&'a str> {
        line.strip_prefix(self.undo())?.strip_prefix(' ')
    }

    /// Command reversing `line`; a negated line yields its positive form.
    fn undo_of(&self, line: &str) -> String {
        match self.strip_undo(line) {
            Some(positive) => positive.to_string(),
            None => format!("{} {line}", self.undo()),
        }
    }

    /// Closing command that must be rendered after this section in a config.
    fn required_exit(&self, line: &str) -> Option<&'static str> {
        self.sections_require_exit()
            .iter()
            .find(|rule| rule.section.is_match(line))
            .map(|rule| rule.exit)
    }

    /// Closing command emitted after this section in a patch.
    fn patch_exit(&self, line: &str) -> Option<&'static str> {
        if let Some(exit) = self.required_exit(line) {
            return Some(exit);
        }
        if self.sections_without_exit().iter().any(|re| re.is_match(line)) {
            return None;
        }
        Some(self.exit())
    }

    /// Replace every secret captured by the mask patterns with [`MASK`].
    fn mask(&self, line: &str) -> String {
        self.mask_patterns()
            .iter()
            .fold(line.to_string(), |acc, re| mask_with(re, &acc))
    }
}

fn mask_with(re: &Regex, line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for caps in re.captures_iter(line) {
        if let Some(secret) = caps.get(1) {
            out.push_str(&line[last..secret.start()]);
            out.push_str(MASK);
            last = secret.end();
        }
    }
    out.push_str(&line[last..]);
    out
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("built-in platform pattern"))
        .collect()
}
