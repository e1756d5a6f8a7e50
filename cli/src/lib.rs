//! lyfonts CLI

use std::env;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use lyfonts_core::catalog::FontCatalog;
use lyfonts_core::engine::{EngineInfo, LogSink, TokioLauncher};
use lyfonts_core::misc::ConfigPaths;
use lyfonts_core::music::{MusicFontRow, MusicFontScanner};
use lyfonts_core::output::{write_json_pretty, write_ndjson, CatalogReport};
use lyfonts_core::styles::FontStyleDb;
use lyfonts_core::tree::CatalogNode;

/// CLI entrypoint for lyfonts.
#[derive(Debug, Parser)]
#[command(name = "lyfonts", about = "Show the fonts LilyPond can see")]
pub struct Cli {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run LilyPond and print the text, music and configuration catalogs
    Show(ShowArgs),
    /// Only check the music fonts installed with LilyPond
    Music(MusicArgs),
}

#[derive(Debug, Args)]
struct EngineArgs {
    /// LilyPond executable
    #[arg(long = "lilypond", default_value = "lilypond", value_hint = ValueHint::CommandName)]
    lilypond: PathBuf,

    /// LilyPond data directory (contains fonts/otf and fonts/svg)
    #[arg(long = "datadir", value_hint = ValueHint::DirPath)]
    datadir: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ShowArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Directories whose fonts define the locally known styles
    #[arg(long = "font-dir", value_hint = ValueHint::DirPath)]
    font_dirs: Vec<PathBuf>,

    /// Include common system font directories in the style lookup
    #[arg(long = "system-fonts", action = ArgAction::SetTrue)]
    system_fonts: bool,

    /// Which catalog to print
    #[arg(long = "section", default_value_t = Section::All, value_enum)]
    section: Section,

    /// Mirror LilyPond's output to stderr while it runs
    #[arg(long = "show-log", action = ArgAction::SetTrue)]
    show_log: bool,

    /// Emit a single JSON object
    #[arg(long = "json", action = ArgAction::SetTrue, conflicts_with = "ndjson")]
    json: bool,

    /// Emit newline-delimited JSON
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,

    /// Control colorized output (auto|always|never)
    #[arg(long = "color", default_value_t = ColorChoice::Auto, value_enum)]
    color: ColorChoice,
}

#[derive(Debug, Args)]
struct MusicArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Emit a JSON array
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Section {
    All,
    Text,
    Music,
    Misc,
    Log,
}

impl Section {
    fn shows(self, other: Section) -> bool {
        self == other || (self == Section::All && other != Section::Log)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// Parse CLI args and execute the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Show(args) => run_show(args),
        Command::Music(args) => run_music(args),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_show(args: ShowArgs) -> Result<()> {
    let info = engine_info(&args.engine);
    let roots = style_roots(&args.font_dirs, args.system_fonts)?;
    let styles = FontStyleDb::scan(&roots);
    debug!(faces = styles.face_count(), "local style database ready");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let launcher = TokioLauncher::new(runtime.handle().clone());
    let catalog = FontCatalog::new(Arc::new(launcher), Arc::new(styles));

    let sink: Option<LogSink> = args
        .show_log
        .then(|| Arc::new(|line: &str| eprintln!("{line}")) as LogSink);
    let ready = catalog.load(&info, sink)?;
    if !runtime.block_on(ready.wait()) {
        return Err(anyhow!("font catalog load was abandoned"));
    }

    let data = catalog.snapshot();
    if let Some(status) = &data.job_status {
        if !status.success() {
            warn!("lilypond {status}");
        }
    }

    let include_log = args.section == Section::Log;
    let report = CatalogReport::new(catalog.state(), &data, include_log);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let use_color = match args.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => handle.is_terminal(),
    };

    if args.ndjson {
        write_ndjson(&report, &mut handle)?;
    } else if args.json {
        write_json_pretty(&report, &mut handle)?;
    } else {
        write_plain(&report, args.section, &mut handle, use_color)?;
    }

    Ok(())
}

fn run_music(args: MusicArgs) -> Result<()> {
    let info = engine_info(&args.engine);
    let root = info
        .music_font_root()
        .ok_or_else(|| anyhow!("cannot locate the LilyPond data directory; pass --datadir"))?;
    let rows = MusicFontScanner::new(root).scan().rows();

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        let json = serde_json::to_string_pretty(&rows)?;
        writeln!(handle, "{json}")?;
    } else {
        write_music_table(&rows, &mut handle, false)?;
    }
    Ok(())
}

fn engine_info(args: &EngineArgs) -> EngineInfo {
    let info = EngineInfo::new(&args.lilypond);
    match args.datadir.clone().or_else(|| guess_datadir(&args.lilypond)) {
        Some(datadir) => info.with_datadir(datadir),
        None => info,
    }
}

/// `<bin>/../share/lilypond/current`, the layout of LilyPond's own installers.
fn guess_datadir(command: &Path) -> Option<PathBuf> {
    let bin = command.parent().filter(|p| !p.as_os_str().is_empty())?;
    let candidate = bin.join("..").join("share").join("lilypond").join("current");
    candidate.is_dir().then_some(candidate)
}

fn style_roots(font_dirs: &[PathBuf], include_system: bool) -> Result<Vec<PathBuf>> {
    let mut roots = font_dirs.to_vec();
    if include_system {
        roots.extend(system_font_roots()?);
    }
    roots.sort();
    roots.dedup();
    Ok(roots)
}

/// Font directories fontconfig searches by default, or `LYFONTS_FONT_DIRS`.
fn system_font_roots() -> Result<Vec<PathBuf>> {
    if let Some(raw) = env::var_os("LYFONTS_FONT_DIRS") {
        let overrides = existing_dirs(env::split_paths(&raw));
        if overrides.is_empty() {
            return Err(anyhow!("LYFONTS_FONT_DIRS is set but names no existing directory"));
        }
        return Ok(overrides);
    }

    let roots = existing_dirs(default_font_dirs());
    if roots.is_empty() {
        return Err(anyhow!("no system font directories found; pass --font-dir"));
    }
    Ok(roots)
}

fn default_font_dirs() -> Vec<PathBuf> {
    let home = env::var_os("HOME").map(PathBuf::from);
    let mut dirs = Vec::new();

    if cfg!(target_os = "macos") {
        dirs.extend(["/System/Library/Fonts", "/Library/Fonts"].map(PathBuf::from));
        dirs.extend(home.as_ref().map(|h| h.join("Library/Fonts")));
    } else if cfg!(windows) {
        dirs.extend(env::var_os("WINDIR").map(|w| PathBuf::from(w).join("Fonts")));
        dirs.extend(
            env::var_os("LOCALAPPDATA").map(|l| PathBuf::from(l).join("Microsoft/Windows/Fonts")),
        );
    } else {
        dirs.extend(["/usr/share/fonts", "/usr/local/share/fonts"].map(PathBuf::from));
        let data_home = env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|h| h.join(".local/share")));
        dirs.extend(data_home.map(|d| d.join("fonts")));
        dirs.extend(home.map(|h| h.join(".fonts")));
    }
    dirs
}

fn existing_dirs(candidates: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = candidates.into_iter().filter(|p| p.is_dir()).collect();
    dirs.sort();
    dirs.dedup();
    dirs
}

fn write_plain(report: &CatalogReport, section: Section, mut w: impl Write, color: bool) -> Result<()> {
    let mut first = true;
    let mut heading = |w: &mut dyn Write, title: &str| -> Result<()> {
        if !first {
            writeln!(w)?;
        }
        first = false;
        writeln!(w, "{}", apply_color(title, color, AnsiColor::Cyan))?;
        Ok(())
    };

    if section.shows(Section::Text) {
        heading(&mut w, "Text Fonts")?;
        write_tree(&report.text_fonts, &mut w, color)?;
    }
    if section.shows(Section::Music) {
        heading(&mut w, "Music Fonts")?;
        write_music_table(&report.music_fonts, &mut w, color)?;
    }
    if section.shows(Section::Misc) {
        heading(&mut w, "Miscellaneous")?;
        write_misc(&report.misc, &mut w, color)?;
    }
    if section.shows(Section::Log) {
        heading(&mut w, "LilyPond Output")?;
        for line in report.raw_log.iter().flatten() {
            writeln!(w, "{line}")?;
        }
    }
    Ok(())
}

fn write_tree(nodes: &[CatalogNode], mut w: impl Write, color: bool) -> Result<()> {
    let label_width = label_width(nodes, 1).clamp(0, 80);
    for node in nodes {
        write_node(node, 1, label_width, &mut w, color)?;
    }
    Ok(())
}

fn label_width(nodes: &[CatalogNode], depth: usize) -> usize {
    nodes
        .iter()
        .map(|node| {
            let own = depth * 2 + node.name().chars().count();
            own.max(label_width(node.children(), depth + 1))
        })
        .max()
        .unwrap_or(0)
}

fn write_node(
    node: &CatalogNode,
    depth: usize,
    width: usize,
    w: &mut impl Write,
    color: bool,
) -> Result<()> {
    let indent = "  ".repeat(depth);
    match node.sample() {
        Some(sample) => {
            let label = format!("{indent}{}", node.name());
            let padded = format!("{label:<width$}");
            let rendered = apply_color(&sample.text, color, AnsiColor::Green);
            writeln!(w, "{padded}  {rendered}")?;
        }
        None => {
            let name = if node.is_container() {
                apply_color(node.name(), color, AnsiColor::Yellow)
            } else {
                node.name().to_string()
            };
            writeln!(w, "{indent}{name}")?;
        }
    }
    for child in node.children() {
        write_node(child, depth + 1, width, w, color)?;
    }
    Ok(())
}

fn write_music_table(rows: &[MusicFontRow], mut w: impl Write, color: bool) -> Result<()> {
    let header = [
        "Font".to_string(),
        "OpenType".to_string(),
        "(Brace)".to_string(),
        "SVG".to_string(),
        "(Brace)".to_string(),
    ];
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                row.name.clone(),
                row.otf.sizes.clone(),
                row.otf.brace.clone(),
                row.svg.sizes.clone(),
                row.svg.brace.clone(),
            ]
        })
        .collect();

    let mut widths = header.clone().map(|h| h.len());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |row: &[String; 5]| -> String {
        row.iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    writeln!(w, "{}", apply_color(&render(&header), color, AnsiColor::Yellow))?;
    for row in &cells {
        writeln!(w, "{}", render(row))?;
    }
    Ok(())
}

fn write_misc(paths: &ConfigPaths, mut w: impl Write, color: bool) -> Result<()> {
    for (title, entries) in paths.sections() {
        writeln!(w, "  {}", apply_color(title, color, AnsiColor::Yellow))?;
        for entry in entries {
            writeln!(w, "    {entry}")?;
        }
    }
    Ok(())
}

#[derive(Copy, Clone)]
enum AnsiColor {
    Cyan,
    Yellow,
    Green,
}

fn apply_color(text: &str, color: bool, code: AnsiColor) -> String {
    if !color {
        return text.to_string();
    }

    let code_str = match code {
        AnsiColor::Cyan => "36",
        AnsiColor::Yellow => "33",
        AnsiColor::Green => "32",
    };

    format!("\u{1b}[{}m{}\u{1b}[0m", code_str, text)
}
