use colored::Colorize;
use conftree_core::{Node, POST_TAG, PRE_TAG};

/// Color a human diff for terminal output.
pub fn render_human(raw: &str) -> String {
    let mut out = String::new();

    for line in raw.lines() {
        let colored = if line.starts_with('+') {
            line.green().to_string()
        } else if line.starts_with('-') {
            line.red().to_string()
        } else {
            line.to_string()
        };
        out.push_str(&colored);
        out.push('\n');
    }

    out
}

/// Counts of the commands in a diff tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffCounts {
    pub additions: usize,
    pub removals: usize,
    /// Removals that run before the main body.
    pub staged_first: usize,
}

pub fn count_changes(diff: &Node) -> DiffCounts {
    let mut counts = DiffCounts::default();
    diff.walk(&mut |_, node| {
        if node.has_tag(PRE_TAG) {
            counts.staged_first += 1;
            counts.removals += 1;
        } else if node.has_tag(POST_TAG) {
            counts.removals += 1;
        } else if node.children.is_empty() {
            counts.additions += 1;
        }
    });
    counts
}

/// Render summary counts for terminal output.
pub fn render_summary(diff: &Node) -> String {
    let counts = count_changes(diff);
    format!(
        "additions={} removals={} pre={}",
        counts.additions, counts.removals, counts.staged_first
    )
    .cyan()
    .to_string()
}

#[cfg(test)]
mod tests {
    use conftree_core::{diff, parse, Platform};

    use super::{count_changes, render_human, DiffCounts};

    #[test]
    fn human_lines_keep_their_text() {
        colored::control::set_override(false);
        let out = render_human("  hostname r1\n- mtu 1500\n+ mtu 9000\n");
        assert_eq!(out, "  hostname r1\n- mtu 1500\n+ mtu 9000\n");
    }

    #[test]
    fn counts_additions_and_removals() {
        let a = parse("hostname r1\ninterface Gi0/1\n mtu 1500\n", Platform::CiscoIos).expect("parse");
        let b = parse("hostname r2\ninterface Gi0/1\n mtu 9000\n", Platform::CiscoIos).expect("parse");
        let out = diff(&a, &b).expect("diff");
        assert_eq!(
            count_changes(&out),
            DiffCounts {
                additions: 2,
                removals: 2,
                staged_first: 0,
            }
        );
    }
}
