//! Raw-text rewrites shared by the `pre_run` hooks.

use regex::Regex;

use super::NEWLINE_MARKER;
use crate::range::{expand_bounds, RangeError};

/// How a folded multi-line body ends.
pub(crate) enum Terminator {
    /// First following line containing this text (inclusive).
    Contains(String),
    /// First following line equal to this text once trimmed (inclusive).
    Equals(&'static str),
}

impl Terminator {
    fn ends(&self, line: &str) -> bool {
        match self {
            Terminator::Contains(needle) => line.contains(needle.as_str()),
            Terminator::Equals(word) => line.trim() == *word,
        }
    }
}

/// Join multi-line bodies into their opening line with [`NEWLINE_MARKER`].
///
/// `opener` inspects every line and returns how the body started by that
/// line ends, or `None` when the line opens no body.
pub(crate) fn fold_bodies<F>(text: &str, opener: F) -> String
where
    F: Fn(&str) -> Option<Terminator>,
{
    let mut out: Vec<String> = Vec::new();
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let Some(terminator) = opener(line) else {
            out.push(line.to_string());
            continue;
        };
        let mut folded = line.to_string();
        for body in lines.by_ref() {
            folded.push(NEWLINE_MARKER);
            folded.push_str(body);
            if terminator.ends(body) {
                break;
            }
        }
        out.push(folded);
    }
    out.join("\n")
}

/// Expand top-level headers such as `line vty 0 4` into one section per
/// number, each carrying a copy of the indented block below the header.
///
/// `header` must capture the fixed prefix, the first and the last number.
pub(crate) fn expand_numbered_sections(text: &str, header: &Regex) -> Result<String, RangeError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        idx += 1;
        let Some(caps) = header.captures(line.trim_end()) else {
            out.push(line.to_string());
            continue;
        };
        let block_end = lines[idx..]
            .iter()
            .position(|next| !next.starts_with(char::is_whitespace) || next.trim().is_empty())
            .map_or(lines.len(), |offset| idx + offset);
        let block = &lines[idx..block_end];
        for number in expand_bounds(&caps[2], &caps[3])? {
            out.push(format!("{} {number}", &caps[1]));
            out.extend(block.iter().map(|body| body.to_string()));
        }
        idx = block_end;
    }
    Ok(out.join("\n"))
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::{expand_numbered_sections, fold_bodies, Terminator};
    use crate::platform::NEWLINE_MARKER;

    #[test]
    fn folds_body_until_terminator() {
        let text = "banner motd ^C\nhello\nworld\n^C\nhostname r1";
        let folded = fold_bodies(text, |line| {
            line.starts_with("banner").then(|| Terminator::Contains("^C".to_string()))
        });
        let expected = format!(
            "banner motd ^C{m}hello{m}world{m}^C\nhostname r1",
            m = NEWLINE_MARKER
        );
        assert_eq!(folded, expected);
    }

    #[test]
    fn expands_numbered_sections_with_block() {
        let header = Regex::new(r"^(line vty) (\S+) (\S+)$").expect("regex");
        let text = "line vty 0 2\n transport input ssh\nhostname r1";
        let expanded = expand_numbered_sections(text, &header).expect("expand");
        assert_eq!(
            expanded,
            "line vty 0\n transport input ssh\nline vty 1\n transport input ssh\nline vty 2\n transport input ssh\nhostname r1"
        );
    }

    #[test]
    fn rejects_non_numeric_bounds() {
        let header = Regex::new(r"^(line vty) (\S+) (\S+)$").expect("regex");
        let err = expand_numbered_sections("line vty 0 x", &header).expect_err("bad bound");
        assert_eq!(err.to_string(), "wrong interface number");
    }
}
