//! Errors surfaced by the catalog API (lyfonts)

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// A previous `load()` has not completed yet.
    #[error("font catalog is already loading")]
    LoadInProgress,
    #[error("engine command is empty")]
    EmptyCommand,
}
