//! Local font system style lookup (lyfonts)

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use read_fonts::tables::name::NameId;
use read_fonts::{FontRef, TableProvider};
use tracing::{debug, info, warn};

use crate::discovery::{FontDiscovery, PathDiscovery};

/// Answers which style names the local font system knows for a family.
///
/// An empty set is a normal answer for families the system has never seen.
pub trait LocalStyles: Send + Sync {
    fn styles(&self, family: &str) -> HashSet<String>;
}

/// Lookup that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalStyles;

impl LocalStyles for NoLocalStyles {
    fn styles(&self, _family: &str) -> HashSet<String> {
        HashSet::new()
    }
}

/// In-memory family → styles table.
#[derive(Debug, Clone, Default)]
pub struct StaticStyles {
    families: HashMap<String, HashSet<String>>,
}

impl StaticStyles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_family<I, S>(mut self, family: &str, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(family, styles);
        self
    }

    pub fn insert<I, S>(&mut self, family: &str, styles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.families
            .entry(family_key(family))
            .or_default()
            .extend(styles.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

impl LocalStyles for StaticStyles {
    fn styles(&self, family: &str) -> HashSet<String> {
        self.families
            .get(&family_key(family))
            .cloned()
            .unwrap_or_default()
    }
}

/// Union of two lookups, e.g. the system fonts plus the engine's own fonts.
#[derive(Clone)]
pub struct LayeredStyles {
    base: Arc<dyn LocalStyles>,
    overlay: Arc<dyn LocalStyles>,
}

impl LayeredStyles {
    pub fn new(base: Arc<dyn LocalStyles>, overlay: Arc<dyn LocalStyles>) -> Self {
        Self { base, overlay }
    }
}

impl LocalStyles for LayeredStyles {
    fn styles(&self, family: &str) -> HashSet<String> {
        let mut styles = self.base.styles(family);
        styles.extend(self.overlay.styles(family));
        styles
    }
}

/// Style database built from the `name` tables of font files on disk.
///
/// Both the legacy (IDs 1/2) and the typographic (IDs 16/17) family/style
/// pairs are registered. Family lookups ignore case.
#[derive(Debug, Clone, Default)]
pub struct FontStyleDb {
    table: StaticStyles,
    faces: usize,
}

impl FontStyleDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every font under `roots`. Missing roots and unreadable files are
    /// logged and skipped.
    pub fn scan<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut db = Self::new();
        for root in roots {
            db.add_dir(&root.into());
        }
        db
    }

    /// Register every font file below `dir`.
    pub fn add_dir(&mut self, dir: &Path) {
        let candidates = match PathDiscovery::new([dir]).discover() {
            Ok(found) => found,
            Err(err) => {
                warn!(dir = %dir.display(), "skipping font directory: {err:#}");
                return;
            }
        };

        let faces: Vec<FaceNames> = candidates
            .par_iter()
            .flat_map_iter(|source| match read_face_names(&source.path) {
                Ok(faces) => faces,
                Err(err) => {
                    debug!(path = %source.path.display(), "unreadable font: {err:#}");
                    Vec::new()
                }
            })
            .collect();

        info!(
            dir = %dir.display(),
            files = candidates.len(),
            faces = faces.len(),
            "indexed font styles"
        );
        for face in faces {
            self.register(face);
        }
    }

    /// Register a single font file (all faces of a collection).
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        for face in read_face_names(path)? {
            self.register(face);
        }
        Ok(())
    }

    /// Number of faces registered so far.
    pub fn face_count(&self) -> usize {
        self.faces
    }

    fn register(&mut self, face: FaceNames) {
        self.faces += 1;
        for (family, style) in face.pairs() {
            self.table.insert(family, [style]);
        }
    }
}

impl LocalStyles for FontStyleDb {
    fn styles(&self, family: &str) -> HashSet<String> {
        self.table.styles(family)
    }
}

#[derive(Debug, Default)]
struct FaceNames {
    family: Option<String>,
    style: Option<String>,
    typographic_family: Option<String>,
    typographic_style: Option<String>,
}

impl FaceNames {
    fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        if let (Some(family), Some(style)) = (&self.family, &self.style) {
            pairs.push((family.as_str(), style.as_str()));
        }
        let family = self.typographic_family.as_ref().or(self.family.as_ref());
        let style = self.typographic_style.as_ref().or(self.style.as_ref());
        if let (Some(family), Some(style)) = (family, style) {
            pairs.push((family.as_str(), style.as_str()));
        }
        pairs
    }
}

fn read_face_names(path: &Path) -> Result<Vec<FaceNames>> {
    let data = fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
    let mut faces = Vec::new();

    for font in FontRef::fonts(&data) {
        let font = font.with_context(|| format!("parsing font {}", path.display()))?;
        faces.push(collect_names(&font));
    }

    Ok(faces)
}

fn collect_names(font: &FontRef) -> FaceNames {
    let mut names = FaceNames::default();

    if let Ok(name_table) = font.name() {
        let data = name_table.string_data();
        for record in name_table.name_record() {
            if !record.is_unicode() {
                continue;
            }
            let slot = match record.name_id() {
                NameId::FAMILY_NAME => &mut names.family,
                NameId::SUBFAMILY_NAME => &mut names.style,
                NameId::TYPOGRAPHIC_FAMILY_NAME => &mut names.typographic_family,
                NameId::TYPOGRAPHIC_SUBFAMILY_NAME => &mut names.typographic_style,
                _ => continue,
            };
            if slot.is_some() {
                continue;
            }
            if let Ok(entry) = record.string(data) {
                let rendered = entry.to_string();
                let rendered = rendered.trim();
                if !rendered.is_empty() {
                    *slot = Some(rendered.to_string());
                }
            }
        }
    }

    names
}

fn family_key(family: &str) -> String {
    family.to_lowercase()
}
