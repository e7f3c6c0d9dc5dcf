use once_cell::sync::Lazy;
use regex::Regex;

use super::text::{fold_bodies, Terminator};
use super::{compile, PlatformSpec};
use crate::range::RangeError;

/// Arista EOS.
pub struct Arista;

static JUNK: Lazy<Vec<Regex>> = Lazy::new(|| compile(&[r"^!", r"^end$", r"^exit$"]));

static MASKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?:^|\s)secret (?:sha512 |\d+ )?(\S+)",
        r"(?:^|\s)password (?:\d+ )?(\S+)",
        r"(?:^|\s)key (?:\d+ )?(\S+)",
        r"^snmp-server community (\S+)",
    ])
});

static BANNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^banner (?:login|motd)$").expect("built-in platform pattern"));

impl PlatformSpec for Arista {
    fn name(&self) -> &'static str {
        "arista"
    }

    fn indent(&self) -> &'static str {
        "   "
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
        &JUNK
    }

    fn mask_patterns(&self) -> &[Regex] {
        &MASKS
    }

    fn pre_run(&self, text: &str) -> Result<String, RangeError> {
        Ok(fold_bodies(text, |line| {
            BANNER
                .is_match(line)
                .then_some(Terminator::Equals("EOF"))
        }))
    }
}
