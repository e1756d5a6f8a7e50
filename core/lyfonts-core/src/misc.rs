//! Fontconfig files and directories reported by the engine (lyfonts)

use serde::Serialize;

use crate::tree::CatalogNode;

pub const CONFIG_FILES_TITLE: &str = "Configuration Files";
pub const CONFIG_DIRS_TITLE: &str = "Configuration Directories";
pub const FONT_DIRS_TITLE: &str = "Searched Font Directories";

/// The three flat lists, each sorted case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigPaths {
    pub config_files: Vec<String>,
    pub config_dirs: Vec<String>,
    pub font_dirs: Vec<String>,
}

impl ConfigPaths {
    pub fn new(config_files: Vec<String>, config_dirs: Vec<String>, font_dirs: Vec<String>) -> Self {
        Self {
            config_files: sorted(config_files),
            config_dirs: sorted(config_dirs),
            font_dirs: sorted(font_dirs),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.config_files.is_empty() && self.config_dirs.is_empty() && self.font_dirs.is_empty()
    }

    /// Titled sections, always all three.
    pub fn sections(&self) -> [(&'static str, &[String]); 3] {
        [
            (CONFIG_FILES_TITLE, self.config_files.as_slice()),
            (CONFIG_DIRS_TITLE, self.config_dirs.as_slice()),
            (FONT_DIRS_TITLE, self.font_dirs.as_slice()),
        ]
    }

    /// The combined tree: one container per section, even when empty.
    pub fn to_tree(&self) -> Vec<CatalogNode> {
        self.sections()
            .into_iter()
            .map(|(title, entries)| {
                CatalogNode::container(title, entries.iter().map(CatalogNode::leaf).collect())
            })
            .collect()
    }
}

fn sorted(mut entries: Vec<String>) -> Vec<String> {
    entries.sort_by_cached_key(|e| e.to_lowercase());
    entries
}
