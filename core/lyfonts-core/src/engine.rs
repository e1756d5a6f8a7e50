//! Running the engine and capturing its output (lyfonts)

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Flag that makes LilyPond dump its fontconfig view and exit.
pub const SHOW_FONTS_FLAG: &str = "-dshow-available-fonts";

/// Where the engine lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInfo {
    command: PathBuf,
    datadir: Option<PathBuf>,
}

impl EngineInfo {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            datadir: None,
        }
    }

    pub fn with_datadir(mut self, datadir: impl Into<PathBuf>) -> Self {
        self.datadir = Some(datadir.into());
        self
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    pub fn datadir(&self) -> Option<&Path> {
        self.datadir.as_deref()
    }

    /// `<datadir>/fonts`, holding the `otf` and `svg` music font folders.
    pub fn music_font_root(&self) -> Option<PathBuf> {
        self.datadir.as_ref().map(|d| d.join("fonts"))
    }

    /// Fonts shipped with the engine that the local system may not know.
    pub fn engine_otf_dir(&self) -> Option<PathBuf> {
        self.music_font_root().map(|d| d.join("otf"))
    }
}

/// How the engine process ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Exited { code: Option<i32> },
    FailedToStart { message: String },
}

impl JobStatus {
    pub fn success(&self) -> bool {
        matches!(self, JobStatus::Exited { code: Some(0) })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Exited { code: Some(code) } => write!(f, "exited with status {code}"),
            JobStatus::Exited { code: None } => f.write_str("terminated by signal"),
            JobStatus::FailedToStart { message } => write!(f, "failed to start: {message}"),
        }
    }
}

/// Combined stdout/stderr of a finished job, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    pub lines: Vec<String>,
    pub status: JobStatus,
}

impl JobOutput {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            lines: Vec::new(),
            status: JobStatus::FailedToStart {
                message: message.into(),
            },
        }
    }
}

/// Receives each output line while the engine runs.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Called exactly once when the engine has exited.
pub type Completion = Box<dyn FnOnce(JobOutput) + Send + 'static>;

/// Starts the engine without blocking the caller.
pub trait EngineLauncher: Send + Sync {
    fn launch(&self, command: &Path, args: &[&str], sink: Option<LogSink>, done: Completion);
}

/// Launcher backed by `tokio::process` on the given runtime.
#[derive(Debug, Clone)]
pub struct TokioLauncher {
    handle: Handle,
}

impl TokioLauncher {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running on.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl EngineLauncher for TokioLauncher {
    fn launch(&self, command: &Path, args: &[&str], sink: Option<LogSink>, done: Completion) {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!(command = %command.display(), ?args, "launching engine");

        self.handle.spawn(async move {
            let output = run_job(cmd, sink).await;
            done(output);
        });
    }
}

async fn run_job(mut cmd: Command, sink: Option<LogSink>) -> JobOutput {
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!("cannot start engine: {err}");
            return JobOutput::failed(err.to_string());
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(pump_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(pump_lines(stderr, tx.clone()));
    }
    drop(tx);

    let mut lines = Vec::new();
    while let Some(line) = rx.recv().await {
        if let Some(sink) = &sink {
            sink(&line);
        }
        lines.push(line);
    }

    let status = match child.wait().await {
        Ok(status) => JobStatus::Exited {
            code: status.code(),
        },
        Err(err) => {
            warn!("waiting for engine failed: {err}");
            JobStatus::Exited { code: None }
        }
    };
    JobOutput { lines, status }
}

async fn pump_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(err) => {
                warn!("reading engine output failed: {err}");
                break;
            }
        }
    }
}

/// Split captured chunks into single lines, dropping trailing carriage returns.
pub fn flatten_log<I, S>(chunks: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    chunks
        .into_iter()
        .flat_map(|chunk| {
            chunk
                .as_ref()
                .split('\n')
                .map(|l| l.trim_end_matches('\r').to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_splits_multiline_chunks() {
        let lines = flatten_log(["family Foo\r\nFoo:style=Bold", "Font dir: /x"]);
        assert_eq!(lines, vec!["family Foo", "Foo:style=Bold", "Font dir: /x"]);
    }

    #[test]
    fn datadir_drives_font_roots() {
        let info = EngineInfo::new("/opt/lilypond/bin/lilypond").with_datadir("/opt/lilypond/share");
        assert_eq!(
            info.engine_otf_dir(),
            Some(PathBuf::from("/opt/lilypond/share/fonts/otf"))
        );
        assert_eq!(EngineInfo::new("lilypond").music_font_root(), None);
    }

    #[test]
    fn only_zero_exit_counts_as_success() {
        assert!(JobStatus::Exited { code: Some(0) }.success());
        assert!(!JobStatus::Exited { code: Some(1) }.success());
        assert!(!JobOutput::failed("nope").status.success());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_binary_completes_with_failure() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        TokioLauncher::current().launch(
            Path::new("/nonexistent/lyfonts-engine"),
            &[SHOW_FONTS_FLAG],
            None,
            Box::new(move |output| {
                let _ = tx.send(output);
            }),
        );

        let output = rx.await.expect("completion");
        assert!(output.lines.is_empty());
        assert!(matches!(output.status, JobStatus::FailedToStart { .. }));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn captures_stdout_and_stderr_lines() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink: LogSink = Arc::new(move |line: &str| sink_seen.lock().push(line.to_string()));

        TokioLauncher::current().launch(
            Path::new("/bin/sh"),
            &["-c", "echo 'Font dir: /a'; echo 'Config dir: /b' >&2"],
            Some(sink),
            Box::new(move |output| {
                let _ = tx.send(output);
            }),
        );

        let output = rx.await.expect("completion");
        assert!(output.status.success());
        assert_eq!(output.lines.len(), 2);
        assert!(output.lines.contains(&"Font dir: /a".to_string()));
        assert!(output.lines.contains(&"Config dir: /b".to_string()));
        assert_eq!(seen.lock().len(), 2);
    }
}
