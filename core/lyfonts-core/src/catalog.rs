//! Font catalog orchestration (lyfonts)
//!
//! [`FontCatalog::load`] scans the music fonts, starts the engine and returns
//! immediately. When the engine exits, its output is parsed and every catalog
//! is published in one step; until then all accessors return the reset state.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::engine::{flatten_log, EngineInfo, EngineLauncher, JobOutput, JobStatus, LogSink, SHOW_FONTS_FLAG};
use crate::error::CatalogError;
use crate::families::{StyleAliases, StyleMatcher};
use crate::misc::ConfigPaths;
use crate::music::{MusicFontScanner, MusicFonts};
use crate::parser::LogParser;
use crate::styles::{FontStyleDb, LayeredStyles, LocalStyles};
use crate::tree::{CatalogNode, FamilyTreeBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
}

/// Everything a finished load produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogData {
    pub family_tree: Vec<CatalogNode>,
    pub music_fonts: MusicFonts,
    pub misc: ConfigPaths,
    pub raw_log: Vec<String>,
    pub skipped_descriptors: usize,
    pub job_status: Option<JobStatus>,
}

struct Inner {
    state: LoadState,
    generation: u64,
    data: Arc<CatalogData>,
    waiters: Vec<oneshot::Sender<()>>,
}

impl Inner {
    fn reset(&mut self) -> u64 {
        self.generation += 1;
        self.state = LoadState::NotLoaded;
        self.data = Arc::new(CatalogData::default());
        // Dropping the senders closes the channels of a superseded cycle.
        self.waiters.clear();
        self.generation
    }
}

/// Resolves once the load cycle that created it has been published.
#[derive(Debug)]
pub struct ReadySignal {
    rx: oneshot::Receiver<()>,
}

impl ReadySignal {
    /// `true` if the cycle completed, `false` if it was reset first.
    pub async fn wait(self) -> bool {
        self.rx.await.is_ok()
    }

    /// Blocking variant for callers outside an async context.
    pub fn blocking_wait(self) -> bool {
        self.rx.blocking_recv().is_ok()
    }
}

/// Owns the catalogs of one engine installation.
pub struct FontCatalog {
    inner: Arc<Mutex<Inner>>,
    launcher: Arc<dyn EngineLauncher>,
    local_styles: Arc<dyn LocalStyles>,
    aliases: Arc<StyleAliases>,
}

impl FontCatalog {
    pub fn new(launcher: Arc<dyn EngineLauncher>, local_styles: Arc<dyn LocalStyles>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: LoadState::NotLoaded,
                generation: 0,
                data: Arc::new(CatalogData::default()),
                waiters: Vec::new(),
            })),
            launcher,
            local_styles,
            aliases: Arc::new(StyleAliases::default()),
        }
    }

    pub fn with_aliases(mut self, aliases: StyleAliases) -> Self {
        self.aliases = Arc::new(aliases);
        self
    }

    /// Start a load cycle.
    ///
    /// Rejected with [`CatalogError::LoadInProgress`] while a previous cycle
    /// is still running; call [`FontCatalog::reset`] first to abandon it.
    pub fn load(&self, info: &EngineInfo, sink: Option<LogSink>) -> Result<ReadySignal, CatalogError> {
        if info.command().as_os_str().is_empty() {
            return Err(CatalogError::EmptyCommand);
        }

        let (tx, rx) = oneshot::channel();
        let generation = {
            let mut inner = self.inner.lock();
            if inner.state == LoadState::Loading {
                return Err(CatalogError::LoadInProgress);
            }
            let generation = inner.reset();
            inner.state = LoadState::Loading;
            inner.waiters.push(tx);
            generation
        };
        info!(command = %info.command().display(), generation, "loading font catalog");

        let music_fonts = match info.music_font_root() {
            Some(root) => MusicFontScanner::new(root).scan(),
            None => {
                debug!("no engine data directory, skipping music fonts");
                MusicFonts::default()
            }
        };
        let styles = self.styles_for(info);

        let shared = Arc::clone(&self.inner);
        let aliases = Arc::clone(&self.aliases);
        let done = Box::new(move |output: JobOutput| {
            let data = build_catalog(output, music_fonts, styles.as_ref(), &aliases);
            publish(&shared, generation, data);
        });

        self.launcher
            .launch(info.command(), &[SHOW_FONTS_FLAG], sink, done);
        Ok(ReadySignal { rx })
    }

    /// Discard all derived data. A running cycle's result will be ignored.
    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    /// Another receiver for the running cycle, or `None` when nothing is loading.
    pub fn subscribe_ready(&self) -> Option<ReadySignal> {
        let mut inner = self.inner.lock();
        if inner.state != LoadState::Loading {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        inner.waiters.push(tx);
        Some(ReadySignal { rx })
    }

    pub fn state(&self) -> LoadState {
        self.inner.lock().state
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded
    }

    /// The published data of the last completed cycle (or the empty reset state).
    pub fn snapshot(&self) -> Arc<CatalogData> {
        Arc::clone(&self.inner.lock().data)
    }

    pub fn family_tree(&self) -> Vec<CatalogNode> {
        self.snapshot().family_tree.clone()
    }

    pub fn music_fonts(&self) -> MusicFonts {
        self.snapshot().music_fonts.clone()
    }

    pub fn misc_catalog(&self) -> ConfigPaths {
        self.snapshot().misc.clone()
    }

    pub fn raw_log(&self) -> Vec<String> {
        self.snapshot().raw_log.clone()
    }

    pub fn skipped_descriptors(&self) -> usize {
        self.snapshot().skipped_descriptors
    }

    pub fn job_status(&self) -> Option<JobStatus> {
        self.snapshot().job_status.clone()
    }

    /// The injected lookup, layered with a fresh database of the engine's own fonts.
    fn styles_for(&self, info: &EngineInfo) -> Arc<dyn LocalStyles> {
        match info.engine_otf_dir() {
            Some(dir) if dir.is_dir() => {
                let engine_fonts = FontStyleDb::scan([dir]);
                Arc::new(LayeredStyles::new(
                    Arc::clone(&self.local_styles),
                    Arc::new(engine_fonts),
                ))
            }
            _ => Arc::clone(&self.local_styles),
        }
    }
}

fn build_catalog(
    output: JobOutput,
    music_fonts: MusicFonts,
    styles: &dyn LocalStyles,
    aliases: &StyleAliases,
) -> CatalogData {
    let raw_log = flatten_log(&output.lines);
    let parser = LogParser::new(StyleMatcher::new(styles, aliases));
    let parsed = parser.parse(&raw_log);
    let family_tree = FamilyTreeBuilder::new().build(&parsed.families);
    let misc = ConfigPaths::new(parsed.config_files, parsed.config_dirs, parsed.font_dirs);

    info!(
        families = parsed.families.len(),
        music_fonts = music_fonts.len(),
        skipped = parsed.skipped,
        status = %output.status,
        "font catalog built"
    );

    CatalogData {
        family_tree,
        music_fonts,
        misc,
        raw_log,
        skipped_descriptors: parsed.skipped,
        job_status: Some(output.status),
    }
}

fn publish(shared: &Mutex<Inner>, generation: u64, data: CatalogData) {
    let mut inner = shared.lock();
    if inner.generation != generation || inner.state != LoadState::Loading {
        debug!(generation, current = inner.generation, "ignoring stale engine completion");
        return;
    }
    inner.data = Arc::new(data);
    inner.state = LoadState::Loaded;
    for waiter in inner.waiters.drain(..) {
        let _ = waiter.send(());
    }
}
