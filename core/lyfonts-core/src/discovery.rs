//! Font file discovery helpers (lyfonts)

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing::debug;
use walkdir::WalkDir;

/// Extensions of files the local style database can read.
pub const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc", "otc"];

/// Path to a candidate font file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFileRef {
    pub path: PathBuf,
}

impl FontFileRef {
    /// File name without its extension.
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }
}

/// Trait for enumerating font files from some backing store.
pub trait FontDiscovery {
    fn discover(&self) -> Result<Vec<FontFileRef>>;
}

/// Filesystem walker that collects files by extension.
///
/// Symlinks are followed, so linked files and linked directories count like
/// regular ones. Dangling links and link loops are skipped.
#[derive(Debug, Clone)]
pub struct PathDiscovery {
    roots: Vec<PathBuf>,
    max_depth: Option<usize>,
    extensions: Option<Vec<String>>,
}

impl PathDiscovery {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let roots = roots.into_iter().map(Into::into).collect();
        Self {
            roots,
            max_depth: None,
            extensions: None,
        }
    }

    /// Only look at direct children of the roots.
    pub fn flat(mut self) -> Self {
        self.max_depth = Some(1);
        self
    }

    /// Accept exactly these extensions (case-sensitive) instead of the
    /// case-insensitive [`FONT_EXTENSIONS`] default.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        match &self.extensions {
            Some(wanted) => path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| wanted.iter().any(|w| w == ext)),
            None => is_font(path),
        }
    }
}

impl FontDiscovery for PathDiscovery {
    fn discover(&self) -> Result<Vec<FontFileRef>> {
        let mut found = Vec::new();

        for root in &self.roots {
            if !root.is_dir() {
                return Err(anyhow!("font directory does not exist: {}", root.display()));
            }

            let mut walker = WalkDir::new(root).min_depth(1).follow_links(true);
            if let Some(depth) = self.max_depth {
                walker = walker.max_depth(depth);
            }

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        debug!(root = %root.display(), "skipping entry: {err}");
                        continue;
                    }
                };
                if entry.file_type().is_file() && self.accepts(entry.path()) {
                    found.push(FontFileRef {
                        path: entry.path().to_path_buf(),
                    });
                }
            }
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }
}

fn is_font(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return false,
    };

    FONT_EXTENSIONS.contains(&ext.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn recognises_font_extensions() {
        assert!(is_font("/A/B/font.ttf".as_ref()));
        assert!(is_font("/A/B/font.OTF".as_ref()));
        assert!(!is_font("/A/B/font.svg".as_ref()));
        assert!(!is_font("/A/B/font".as_ref()));
    }

    #[test]
    fn flat_discovery_ignores_nested_files() {
        let tmp = tempdir().expect("tempdir");
        let nested = tmp.path().join("nested");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(tmp.path().join("top.otf"), b"").expect("touch");
        fs::write(nested.join("deep.otf"), b"").expect("touch");

        let fonts = PathDiscovery::new([tmp.path()]).flat().discover().expect("discover");

        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].stem(), Some("top"));
    }

    #[test]
    fn explicit_extensions_are_case_sensitive() {
        let tmp = tempdir().expect("tempdir");
        fs::write(tmp.path().join("a.svg"), b"").expect("touch");
        fs::write(tmp.path().join("b.SVG"), b"").expect("touch");
        fs::write(tmp.path().join("c.woff"), b"").expect("touch");

        let fonts = PathDiscovery::new([tmp.path()])
            .with_extensions(["svg"])
            .discover()
            .expect("discover");

        let stems: Vec<_> = fonts.iter().filter_map(FontFileRef::stem).collect();
        assert_eq!(stems, vec!["a"]);
    }

    #[cfg(unix)]
    #[test]
    fn follows_linked_directories() {
        use std::os::unix::fs::symlink;

        let tmp = tempdir().expect("tempdir");
        let real_dir = tmp.path().join("real");
        let link_dir = tmp.path().join("link");
        fs::create_dir_all(&real_dir).expect("mkdir real");
        fs::write(real_dir.join("linked.otf"), b"").expect("touch font");
        symlink(&real_dir, &link_dir).expect("symlink");

        let fonts = PathDiscovery::new([&link_dir]).discover().expect("discover");

        assert!(fonts.iter().any(|f| f.path.ends_with("linked.otf")));
    }

    #[cfg(unix)]
    #[test]
    fn flat_discovery_keeps_linked_files_and_drops_dangling_links() {
        use std::os::unix::fs::symlink;

        let tmp = tempdir().expect("tempdir");
        let store = tmp.path().join("store");
        let fonts_dir = tmp.path().join("fonts");
        fs::create_dir_all(&store).expect("mkdir store");
        fs::create_dir_all(&fonts_dir).expect("mkdir fonts");
        fs::write(store.join("real.otf"), b"").expect("touch font");
        symlink(store.join("real.otf"), fonts_dir.join("linked.otf")).expect("symlink");
        symlink(store.join("gone.otf"), fonts_dir.join("dangling.otf")).expect("symlink");

        let fonts = PathDiscovery::new([&fonts_dir])
            .flat()
            .discover()
            .expect("discover");

        let stems: Vec<_> = fonts.iter().filter_map(FontFileRef::stem).collect();
        assert_eq!(stems, vec!["linked"]);
    }
}
