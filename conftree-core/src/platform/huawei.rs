use once_cell::sync::Lazy;
use regex::Regex;

use super::text::{expand_numbered_sections, fold_bodies, Terminator};
use super::{compile, ExitRule, PlatformSpec};
use crate::range::RangeError;

/// Huawei VRP.
pub struct Huawei;

static JUNK: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^#",
        r"^!",
        r"^return$",
        r"^quit$",
        r"^end-filter$",
        r"^end-list$",
    ])
});

static MASKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?:^|\s)(?:irreversible-)?cipher (\S+)",
        r"(?:^|\s)password (?:simple |cipher |irreversible-cipher )?(\S+)",
        r"^snmp-agent community (?:read|write) (?:cipher )?(\S+)",
        r"(?:^|\s)authentication-key (?:simple |cipher )?(\S+)",
    ])
});

static REQUIRE_EXIT: Lazy<Vec<ExitRule>> = Lazy::new(|| {
    vec![
        ExitRule {
            section: Regex::new(r"^xpl route-filter ").expect("built-in platform pattern"),
            exit: "end-filter",
        },
        ExitRule {
            section: Regex::new(
                r"^xpl (?:ip-prefix-list|ipv6-prefix-list|community-list|extcommunity-list|large-community-list|as-path-list|rd-list) ",
            )
            .expect("built-in platform pattern"),
            exit: "end-list",
        },
    ]
});

static WITHOUT_EXIT: Lazy<Vec<Regex>> = Lazy::new(|| compile(&[r"^(?:if|elseif|else)\b"]));

static HEADER_INFO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^header (?:login|shell) information "(.*)$"#).expect("built-in platform pattern")
});

static VTY_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(user-interface vty) (\S+) (\S+)$").expect("built-in platform pattern")
});

impl PlatformSpec for Huawei {
    fn name(&self) -> &'static str {
        "huawei"
    }

    fn indent(&self) -> &'static str {
        " "
    }

    fn undo(&self) -> &'static str {
        "undo"
    }

    fn exit(&self) -> &'static str {
        "quit"
    }

    fn separator(&self) -> &'static str {
        "#"
    }

    fn junk_lines(&self) -> &[Regex] {
        &JUNK
    }

    fn mask_patterns(&self) -> &[Regex] {
        &MASKS
    }

    fn sections_require_exit(&self) -> &[ExitRule] {
        &REQUIRE_EXIT
    }

    fn sections_without_exit(&self) -> &[Regex] {
        &WITHOUT_EXIT
    }

    fn no_diff_sections(&self) -> &[&'static str] {
        &["xpl .*"]
    }

    fn pre_run(&self, text: &str) -> Result<String, RangeError> {
        let folded = fold_bodies(text, |line| {
            let rest = HEADER_INFO.captures(line)?.get(1)?.as_str();
            (!rest.contains('"')).then(|| Terminator::Contains("\"".to_string()))
        });
        expand_numbered_sections(&folded, &VTY_RANGE)
    }
}

#[cfg(test)]
mod tests {
    use super::Huawei;
    use crate::platform::{PlatformSpec, NEWLINE_MARKER};

    #[test]
    fn folds_login_header() {
        let text = "header login information \"Authorized\nonly\"\nsysname r1";
        let out = Huawei.pre_run(text).expect("pre_run");
        assert_eq!(
            out,
            format!("header login information \"Authorized{NEWLINE_MARKER}only\"\nsysname r1")
        );
    }

    #[test]
    fn keeps_single_line_header() {
        let text = "header shell information \"hi\"";
        assert_eq!(Huawei.pre_run(text).expect("pre_run"), text);
    }

    #[test]
    fn expands_vty_ranges() {
        let out = Huawei
            .pre_run("user-interface vty 0 1\n protocol inbound ssh")
            .expect("pre_run");
        assert_eq!(
            out,
            "user-interface vty 0\n protocol inbound ssh\nuser-interface vty 1\n protocol inbound ssh"
        );
    }
}
