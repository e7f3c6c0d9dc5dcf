use once_cell::sync::Lazy;
use regex::Regex;

use super::text::{expand_numbered_sections, fold_bodies, Terminator};
use super::{compile, ExitRule, PlatformSpec};
use crate::range::RangeError;

/// Cisco IOS and IOS-XE.
pub struct CiscoIos;

/// Cisco NX-OS.
pub struct CiscoNxos;

static IOS_JUNK: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^!",
        r"^end$",
        r"^exit$",
        r"^exit-address-family$",
        r"^Building configuration",
        r"^Current configuration",
    ])
});

static NXOS_JUNK: Lazy<Vec<Regex>> = Lazy::new(|| compile(&[r"^!", r"^exit$"]));

static MASKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?:^|\s)(?:secret|password) (?:\d+ )?(\S+)",
        r"(?:^|\s)key-string (?:\d+ )?(\S+)",
        r"(?:^|\s)(?:message-digest-key \d+ md5|authentication-key) (?:\d+ )?(\S+)",
        r"^snmp-server community (\S+)",
        r"^tacacs-server key (?:\d+ )?(\S+)",
    ])
});

static IOS_REQUIRE_EXIT: Lazy<Vec<ExitRule>> = Lazy::new(|| {
    vec![ExitRule {
        section: Regex::new(r"^address-family ").expect("built-in platform pattern"),
        exit: "exit-address-family",
    }]
});

static BANNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^banner \S+ (\^C|\S)(.*)$").expect("built-in platform pattern"));

static VTY_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(line vty) (\S+) (\S+)$").expect("built-in platform pattern"));

/// Fold banners and certificate bodies, then expand VTY ranges.
fn pre_run(text: &str) -> Result<String, RangeError> {
    let folded = fold_bodies(text, |line| {
        if line.trim_start().starts_with("certificate ") {
            return Some(Terminator::Equals("quit"));
        }
        let caps = BANNER.captures(line)?;
        let delimiter = caps.get(1)?.as_str();
        let rest = caps.get(2).map_or("", |m| m.as_str());
        (!rest.contains(delimiter)).then(|| Terminator::Contains(delimiter.to_string()))
    });
    expand_numbered_sections(&folded, &VTY_RANGE)
}

impl PlatformSpec for CiscoIos {
    fn name(&self) -> &'static str {
        "cisco-ios"
    }

    fn indent(&self) -> &'static str {
        " "
    }

    fn undo(&self) -> &'static str {
        "no"
    }

    fn exit(&self) -> &'static str {
        "exit"
    }

    fn separator(&self) -> &'static str {
        "!"
    }

    fn junk_lines(&self) -> &[Regex] {
        &IOS_JUNK
    }

    fn mask_patterns(&self) -> &[Regex] {
        &MASKS
    }

    fn sections_require_exit(&self) -> &[ExitRule] {
        &IOS_REQUIRE_EXIT
    }

    fn pre_run(&self, text: &str) -> Result<String, RangeError> {
        pre_run(text)
    }
}

impl PlatformSpec for CiscoNxos {
    fn name(&self) -> &'static str {
        "cisco-nxos"
    }

    fn indent(&self) -> &'static str {
        "  "
    }

    fn undo(&self) -> &'static str {
        "no"
    }

    fn exit(&self) -> &'static str {
        "exit"
    }

    fn separator(&self) -> &'static str {
        "!"
    }

    fn junk_lines(&self) -> &[Regex] {
        &NXOS_JUNK
    }

    fn mask_patterns(&self) -> &[Regex] {
        &MASKS
    }

    fn pre_run(&self, text: &str) -> Result<String, RangeError> {
        pre_run(text)
    }
}

#[cfg(test)]
mod tests {
    use super::CiscoIos;
    use crate::platform::{PlatformSpec, NEWLINE_MARKER};

    #[test]
    fn folds_multiline_banner() {
        let out = CiscoIos
            .pre_run("banner motd ^CKeep out\nof here^C\nhostname r1")
            .expect("pre_run");
        assert_eq!(
            out,
            format!("banner motd ^CKeep out{NEWLINE_MARKER}of here^C\nhostname r1")
        );
    }

    #[test]
    fn folds_certificate_body() {
        let text = "crypto pki certificate chain TP\n certificate ca 01\n  3082AB\n  \tquit\nhostname r1";
        let out = CiscoIos.pre_run(text).expect("pre_run");
        assert_eq!(
            out,
            format!(
                "crypto pki certificate chain TP\n certificate ca 01{m}  3082AB{m}  \tquit\nhostname r1",
                m = NEWLINE_MARKER
            )
        );
    }

    #[test]
    fn expands_line_vty() {
        let out = CiscoIos.pre_run("line vty 0 1\n login local").expect("pre_run");
        assert_eq!(out, "line vty 0\n login local\nline vty 1\n login local");
    }
}
