//! Serialized catalog output (lyfonts)

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::catalog::{CatalogData, LoadState};
use crate::engine::JobStatus;
use crate::misc::ConfigPaths;
use crate::music::MusicFontRow;
use crate::tree::CatalogNode;

/// Everything a front end shows, with music labels already derived.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogReport {
    pub state: LoadState,
    pub job_status: Option<JobStatus>,
    pub text_fonts: Vec<CatalogNode>,
    pub music_fonts: Vec<MusicFontRow>,
    pub misc: ConfigPaths,
    pub skipped_descriptors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_log: Option<Vec<String>>,
}

impl CatalogReport {
    pub fn new(state: LoadState, data: &CatalogData, include_log: bool) -> Self {
        Self {
            state,
            job_status: data.job_status.clone(),
            text_fonts: data.family_tree.clone(),
            music_fonts: data.music_fonts.rows(),
            misc: data.misc.clone(),
            skipped_descriptors: data.skipped_descriptors,
            raw_log: include_log.then(|| data.raw_log.clone()),
        }
    }
}

/// Write the report as one prettified JSON object.
pub fn write_json_pretty(report: &CatalogReport, mut w: impl Write) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    w.write_all(json.as_bytes())?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write one JSON object per top-level entry, tagged with its section.
pub fn write_ndjson(report: &CatalogReport, mut w: impl Write) -> Result<()> {
    #[derive(Serialize)]
    struct Line<'a, T: Serialize> {
        section: &'static str,
        #[serde(flatten)]
        item: &'a T,
    }

    fn emit<T: Serialize>(w: &mut impl Write, section: &'static str, item: &T) -> Result<()> {
        let line = serde_json::to_string(&Line { section, item })?;
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
        Ok(())
    }

    for node in &report.text_fonts {
        emit(&mut w, "text", node)?;
    }
    for row in &report.music_fonts {
        emit(&mut w, "music", row)?;
    }
    for node in report.misc.to_tree() {
        emit(&mut w, "misc", &node)?;
    }
    Ok(())
}
