//! Scanner for `-dshow-available-fonts` output (lyfonts)

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::families::{FamilyMap, StyleMatcher};

const FAMILY_PREFIX: &str = "family ";
const CONFIG_FILES_PREFIX: &str = "Config files:";
const FONT_DIR_PREFIX: &str = "Font dir:";
const CONFIG_DIR_PREFIX: &str = "Config dir:";

/// Everything the scanner extracts from one engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedLog {
    pub families: FamilyMap,
    pub config_files: Vec<String>,
    pub config_dirs: Vec<String>,
    pub font_dirs: Vec<String>,
    /// Style descriptors dropped because they were malformed.
    pub skipped: usize,
}

#[derive(Debug)]
enum ScanState {
    Idle,
    AwaitingStyle(String),
}

/// Line-oriented two-state scanner.
///
/// A `family <name>` line announces a family; the following line is its style
/// descriptor. Configuration lines are collected verbatim, everything else is
/// ignored.
pub struct LogParser<'a> {
    matcher: StyleMatcher<'a>,
}

impl<'a> LogParser<'a> {
    pub fn new(matcher: StyleMatcher<'a>) -> Self {
        Self { matcher }
    }

    pub fn parse<I, S>(&self, lines: I) -> ParsedLog
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = ParsedLog::default();
        let mut state = ScanState::Idle;

        for line in lines {
            let line = line.as_ref();
            state = match state {
                ScanState::AwaitingStyle(family) => {
                    if !self
                        .matcher
                        .add_style_to_family(&mut parsed.families, &family, line)
                    {
                        parsed.skipped += 1;
                    }
                    ScanState::Idle
                }
                ScanState::Idle => self.scan_idle(line, &mut parsed),
            };
        }

        if let ScanState::AwaitingStyle(family) = state {
            debug!(family, "output ended before the style descriptor");
        }
        parsed
    }

    fn scan_idle(&self, line: &str, parsed: &mut ParsedLog) -> ScanState {
        if let Some(raw) = line.strip_prefix(FAMILY_PREFIX) {
            return ScanState::AwaitingStyle(canonical_family(raw).to_string());
        }

        if let Some(rest) = line.strip_prefix(CONFIG_FILES_PREFIX) {
            parsed.config_files.push(entry_value(rest));
        } else if let Some(rest) = line.strip_prefix(FONT_DIR_PREFIX) {
            parsed.font_dirs.push(entry_value(rest));
        } else if let Some(rest) = line.strip_prefix(CONFIG_DIR_PREFIX) {
            parsed.config_dirs.push(entry_value(rest));
        }
        ScanState::Idle
    }
}

/// Strip a trailing `-<digits>` size index from a reported family name.
pub fn canonical_family(raw: &str) -> &str {
    static SIZE_SUFFIX: OnceLock<Regex> = OnceLock::new();
    let re = SIZE_SUFFIX.get_or_init(|| Regex::new(r"^(.*)-\d+$").expect("valid regex"));

    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str())
}

fn entry_value(rest: &str) -> String {
    rest.strip_prefix(' ').unwrap_or(rest).to_string()
}
