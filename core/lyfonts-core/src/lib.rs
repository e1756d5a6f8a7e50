/// lyfonts-core: the fonts LilyPond can actually see
///
/// LilyPond resolves text fonts through its own fontconfig setup, so the set
/// of usable fonts can differ from what any other program reports. The only
/// reliable source is the engine itself: `lilypond -dshow-available-fonts`.
/// This crate runs that command, reads its output and turns it into three
/// catalogs.
///
/// ## Catalogs
///
/// **Text fonts**: family → subfamily → style, reconciled against the style
/// names the local font system knows ([`families`], [`parser`], [`tree`]).
///
/// **Music fonts**: which of the canonical design sizes and brace glyphs each
/// notation font ships as OpenType and SVG ([`music`]).
///
/// **Configuration**: the fontconfig files, directories and font directories
/// the engine searched ([`misc`]).
///
/// ## Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use lyfonts_core::catalog::FontCatalog;
/// use lyfonts_core::engine::{EngineInfo, TokioLauncher};
/// use lyfonts_core::styles::FontStyleDb;
///
/// let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
/// let launcher = TokioLauncher::new(runtime.handle().clone());
/// let styles = FontStyleDb::scan(["/usr/share/fonts"]);
/// let catalog = FontCatalog::new(Arc::new(launcher), Arc::new(styles));
///
/// let info = EngineInfo::new("lilypond").with_datadir("/usr/share/lilypond/current");
/// let ready = catalog.load(&info, None)?;
/// ready.blocking_wait();
///
/// for node in catalog.family_tree() {
///     println!("{}", node.name());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub mod catalog;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod families;
pub mod misc;
pub mod music;
pub mod output;
pub mod parser;
pub mod styles;
pub mod tree;
