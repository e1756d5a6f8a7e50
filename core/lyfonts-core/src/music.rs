//! Music (notation) font completeness (lyfonts)
//!
//! LilyPond ships every notation font as a set of design sizes plus an
//! optional brace font, once as OpenType and once as SVG:
//!
//! ```text
//! fonts/otf/emmentaler-11.otf ... emmentaler-26.otf, emmentaler-brace.otf
//! fonts/svg/emmentaler-11.svg ... emmentaler-26.svg, emmentaler-brace.svg
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::discovery::{FontDiscovery, PathDiscovery};

/// Design sizes a complete notation font provides, in display order.
pub const CANONICAL_SIZES: [&str; 8] = ["11", "13", "14", "16", "18", "20", "23", "26"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MusicFormat {
    Otf,
    Svg,
}

impl MusicFormat {
    pub const ALL: [MusicFormat; 2] = [MusicFormat::Otf, MusicFormat::Svg];

    /// Subdirectory name and file extension.
    pub fn tag(self) -> &'static str {
        match self {
            MusicFormat::Otf => "otf",
            MusicFormat::Svg => "svg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MusicFormat::Otf => "OpenType",
            MusicFormat::Svg => "SVG",
        }
    }
}

/// Files seen for one font in one format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormatEntry {
    sizes: Vec<String>,
    brace: bool,
}

impl FormatEntry {
    pub fn sizes(&self) -> &[String] {
        &self.sizes
    }

    pub fn has_brace(&self) -> bool {
        self.brace
    }

    fn add_size(&mut self, size: &str) {
        if !self.sizes.iter().any(|s| s == size) {
            self.sizes.push(size.to_string());
        }
    }

    /// Canonical sizes not present, in canonical order.
    pub fn missing_sizes(&self) -> Vec<&'static str> {
        CANONICAL_SIZES
            .iter()
            .copied()
            .filter(|size| !self.sizes.iter().any(|s| s == size))
            .collect()
    }
}

/// All formats observed for one font. A missing format means no files at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MusicFontEntry {
    formats: BTreeMap<MusicFormat, FormatEntry>,
}

impl MusicFontEntry {
    pub fn format(&self, format: MusicFormat) -> Option<&FormatEntry> {
        self.formats.get(&format)
    }

    fn format_mut(&mut self, format: MusicFormat) -> &mut FormatEntry {
        self.formats.entry(format).or_default()
    }

    pub fn completeness(&self, format: MusicFormat) -> Completeness {
        match self.format(format) {
            None => Completeness::NotFound,
            Some(entry) => {
                let missing = entry.missing_sizes();
                if missing.is_empty() {
                    Completeness::Complete
                } else {
                    Completeness::Missing(missing)
                }
            }
        }
    }

    /// `"No brace"` when the format exists without a brace font, else empty.
    pub fn brace_label(&self, format: MusicFormat) -> &'static str {
        match self.format(format) {
            Some(entry) if !entry.has_brace() => "No brace",
            _ => "",
        }
    }
}

/// Size coverage of one font in one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completeness {
    NotFound,
    Complete,
    Missing(Vec<&'static str>),
}

impl fmt::Display for Completeness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completeness::NotFound => f.write_str("Missing"),
            Completeness::Complete => f.write_str("Complete"),
            Completeness::Missing(sizes) => write!(f, "Missing: {}", sizes.join(", ")),
        }
    }
}

/// Music fonts keyed by base name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MusicFonts {
    fonts: BTreeMap<String, MusicFontEntry>,
}

impl MusicFonts {
    pub fn get(&self, name: &str) -> Option<&MusicFontEntry> {
        self.fonts.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MusicFontEntry)> {
        self.fonts.iter()
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Feed one file stem found in `format`'s directory.
    pub fn record_file(&mut self, format: MusicFormat, stem: &str) {
        if let Some(name) = brace_font_name(stem) {
            self.entry(name, format).brace = true;
        }
        if let Some((name, size)) = sized_font_name(stem) {
            self.entry(name, format).add_size(size);
        }
    }

    fn entry(&mut self, name: &str, format: MusicFormat) -> &mut FormatEntry {
        self.fonts
            .entry(name.to_string())
            .or_default()
            .format_mut(format)
    }

    /// One display row per font, sorted by name.
    pub fn rows(&self) -> Vec<MusicFontRow> {
        self.fonts
            .iter()
            .map(|(name, entry)| MusicFontRow {
                name: name.clone(),
                otf: FormatLabels::of(entry, MusicFormat::Otf),
                svg: FormatLabels::of(entry, MusicFormat::Svg),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatLabels {
    pub sizes: String,
    pub brace: String,
}

impl FormatLabels {
    fn of(entry: &MusicFontEntry, format: MusicFormat) -> Self {
        Self {
            sizes: entry.completeness(format).to_string(),
            brace: entry.brace_label(format).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MusicFontRow {
    pub name: String,
    pub otf: FormatLabels,
    pub svg: FormatLabels,
}

/// Scans `<root>/otf` and `<root>/svg` for notation font files.
#[derive(Debug, Clone)]
pub struct MusicFontScanner {
    root: PathBuf,
}

impl MusicFontScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unreadable or missing format directories count as empty.
    pub fn scan(&self) -> MusicFonts {
        let mut fonts = MusicFonts::default();

        for format in MusicFormat::ALL {
            let dir = self.root.join(format.tag());
            let files = PathDiscovery::new([&dir])
                .flat()
                .with_extensions([format.tag()])
                .discover();

            match files {
                Ok(files) => {
                    debug!(dir = %dir.display(), files = files.len(), "scanned music fonts");
                    for file in &files {
                        if let Some(stem) = file.stem() {
                            fonts.record_file(format, stem);
                        }
                    }
                }
                Err(err) => warn!(dir = %dir.display(), "cannot list music fonts: {err:#}"),
            }
        }

        fonts
    }
}

fn brace_font_name(stem: &str) -> Option<&str> {
    stem.strip_suffix("-brace")
}

fn sized_font_name(stem: &str) -> Option<(&str, &str)> {
    static SIZED: OnceLock<Regex> = OnceLock::new();
    let re = SIZED.get_or_init(|| Regex::new(r"^(.*)-(\d+)$").expect("valid regex"));

    let caps = re.captures(stem)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font_with(format: MusicFormat, stems: &[&str]) -> MusicFonts {
        let mut fonts = MusicFonts::default();
        for stem in stems {
            fonts.record_file(format, stem);
        }
        fonts
    }

    #[test]
    fn all_canonical_sizes_are_complete() {
        let stems: Vec<String> = CANONICAL_SIZES.iter().map(|s| format!("emmentaler-{s}")).collect();
        let stems: Vec<&str> = stems.iter().map(String::as_str).collect();
        let fonts = font_with(MusicFormat::Otf, &stems);

        let entry = fonts.get("emmentaler").expect("font");
        assert_eq!(entry.completeness(MusicFormat::Otf).to_string(), "Complete");
        assert_eq!(entry.brace_label(MusicFormat::Otf), "No brace");
    }

    #[test]
    fn missing_sizes_follow_canonical_order() {
        let fonts = font_with(MusicFormat::Otf, &["gonville-13", "gonville-11", "gonville-brace"]);

        let entry = fonts.get("gonville").expect("font");
        assert_eq!(
            entry.completeness(MusicFormat::Otf).to_string(),
            "Missing: 14, 16, 18, 20, 23, 26"
        );
        assert_eq!(entry.brace_label(MusicFormat::Otf), "");
    }

    #[test]
    fn absent_format_is_reported_as_missing() {
        let fonts = font_with(MusicFormat::Otf, &["lilyjazz-11"]);

        let entry = fonts.get("lilyjazz").expect("font");
        assert_eq!(entry.completeness(MusicFormat::Svg), Completeness::NotFound);
        assert_eq!(entry.completeness(MusicFormat::Svg).to_string(), "Missing");
        assert_eq!(entry.brace_label(MusicFormat::Svg), "");
    }

    #[test]
    fn brace_only_font_misses_every_size() {
        let fonts = font_with(MusicFormat::Svg, &["cadence-brace"]);

        let entry = fonts.get("cadence").expect("font");
        assert_eq!(
            entry.completeness(MusicFormat::Svg),
            Completeness::Missing(CANONICAL_SIZES.to_vec())
        );
    }

    #[test]
    fn brace_with_size_suffix_does_not_crash() {
        let fonts = font_with(MusicFormat::Otf, &["odd-brace-11", "plain"]);

        assert!(fonts.get("odd").is_none());
        let entry = fonts.get("odd-brace").expect("sized entry");
        assert_eq!(entry.format(MusicFormat::Otf).expect("otf").sizes(), ["11"]);
        assert!(fonts.get("plain").is_none());
    }

    #[test]
    fn duplicate_sizes_are_collapsed() {
        let fonts = font_with(MusicFormat::Otf, &["x-11", "x-11"]);
        let entry = fonts.get("x").expect("font");
        assert_eq!(entry.format(MusicFormat::Otf).expect("otf").sizes().len(), 1);
    }
}
