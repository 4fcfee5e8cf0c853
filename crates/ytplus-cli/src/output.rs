//! Terminal rendering: the controller's view plus one-shot renderers.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use anyhow::anyhow;
use chrono::Local;
use serde_json::{Value, json};
use tracing::debug;
use ytplus_api_models::StatusSnapshot;
use ytplus_controller::{
    ControlState, LogEntry, LogOrigin, NoticeLevel, PreviewView, ProgressView, StatusView,
};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

struct Sink<W> {
    out: W,
    last_progress: Option<ProgressView>,
}

/// [`StatusView`] that writes to a terminal (or any writer).
///
/// Table output prints a line per change; JSON output prints one object per
/// view call, newline delimited.
pub(crate) struct TerminalView<W> {
    format: OutputFormat,
    server_logs: bool,
    sink: Mutex<Sink<W>>,
}

impl<W: Write + Send> TerminalView<W> {
    pub(crate) const fn new(format: OutputFormat, out: W) -> Self {
        Self {
            format,
            server_logs: true,
            sink: Mutex::new(Sink {
                out,
                last_progress: None,
            }),
        }
    }

    /// Suppress backend log lines; notices and progress are still shown.
    pub(crate) fn without_server_logs(mut self) -> Self {
        self.server_logs = false;
        self
    }

    fn write_with(&self, write: impl FnOnce(&mut Sink<W>) -> io::Result<()>) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = write(&mut *sink).and_then(|()| sink.out.flush()) {
            debug!(error = %err, "terminal write failed");
        }
    }

    fn event(&self, value: &Value) {
        self.write_with(|sink| writeln!(sink.out, "{value}"));
    }
}

impl<W: Write + Send> StatusView for TerminalView<W> {
    fn set_controls(&self, state: ControlState) {
        debug!(?state, "controls updated");
        if self.format == OutputFormat::Json {
            let state = match state {
                ControlState::Idle => "idle",
                ControlState::Submitting => "submitting",
                ControlState::Active => "active",
            };
            self.event(&json!({"event": "controls", "state": state}));
        }
    }

    fn set_resolution_enabled(&self, enabled: bool) {
        debug!(enabled, "resolution picker toggled");
    }

    fn show_progress(&self) {
        if self.format == OutputFormat::Json {
            self.event(&json!({"event": "progress_visible"}));
        }
    }

    fn render_progress(&self, progress: &ProgressView) {
        let format = self.format;
        self.write_with(|sink| {
            if sink.last_progress.as_ref() == Some(progress) {
                return Ok(());
            }
            let previous = sink.last_progress.replace(progress.clone());
            match format {
                OutputFormat::Json => writeln!(
                    sink.out,
                    "{}",
                    json!({"event": "progress", "progress": progress})
                ),
                OutputFormat::Table => {
                    let previous_title = previous.as_ref().and_then(|view| view.title.as_ref());
                    if let Some(title) = &progress.title
                        && previous_title != Some(title)
                    {
                        writeln!(sink.out, "title: {title}")?;
                    }
                    write!(
                        sink.out,
                        "{:<22} speed {:<12} eta {}",
                        progress.label, progress.speed, progress.eta
                    )?;
                    if let Some(action) = &progress.action {
                        write!(sink.out, "  ({action})")?;
                    }
                    writeln!(sink.out)
                }
            }
        });
    }

    fn append_log(&self, entry: &LogEntry) {
        if entry.origin == LogOrigin::Server && !self.server_logs {
            return;
        }
        match self.format {
            OutputFormat::Json => self.event(&json!({"event": "log", "entry": entry})),
            OutputFormat::Table => {
                let stamp = Local::now().format("%H:%M:%S");
                self.write_with(|sink| match entry.origin {
                    LogOrigin::Server => writeln!(sink.out, "[{stamp}] {}", entry.message),
                    LogOrigin::Local => writeln!(
                        sink.out,
                        "[{stamp}] {:<7} {}",
                        level_tag(entry.level),
                        entry.message
                    ),
                });
            }
        }
    }

    fn clear_log(&self) {
        match self.format {
            OutputFormat::Json => self.event(&json!({"event": "log_cleared"})),
            OutputFormat::Table => self.write_with(|sink| writeln!(sink.out, "{}", "-".repeat(40))),
        }
    }

    fn set_preview_busy(&self, busy: bool) {
        debug!(busy, "preview request");
    }

    fn show_preview(&self, preview: &PreviewView) {
        match self.format {
            OutputFormat::Json => self.event(&json!({"event": "preview", "preview": preview})),
            OutputFormat::Table => self.write_with(|sink| {
                writeln!(sink.out, "title: {}", preview.title)?;
                writeln!(sink.out, "kind: {}", preview.meta)?;
                if let Some(thumbnail) = &preview.thumbnail {
                    writeln!(sink.out, "thumbnail: {thumbnail}")?;
                }
                Ok(())
            }),
        }
    }
}

const fn level_tag(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "INFO",
        NoticeLevel::Success => "OK",
        NoticeLevel::Warning => "WARN",
        NoticeLevel::Error => "ERROR",
    }
}

/// Print one status snapshot.
pub(crate) fn render_snapshot(
    out: &mut impl Write,
    snapshot: &StatusSnapshot,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(snapshot)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            writeln!(out, "{text}").map_err(write_failed)?;
        }
        OutputFormat::Table => {
            write_snapshot_table(out, snapshot).map_err(write_failed)?;
        }
    }
    Ok(())
}

fn write_snapshot_table(out: &mut impl Write, snapshot: &StatusSnapshot) -> io::Result<()> {
    writeln!(out, "status: {}", snapshot.status)?;
    writeln!(out, "downloading: {}", snapshot.is_downloading)?;
    writeln!(out, "progress: {:.1}%", snapshot.progress)?;
    if let Some(title) = &snapshot.title {
        writeln!(out, "title: {title}")?;
    }
    if let Some(url) = &snapshot.current_url {
        writeln!(out, "url: {url}")?;
    }
    if let Some(speed) = &snapshot.speed {
        writeln!(out, "speed: {speed}")?;
    }
    if let Some(eta) = &snapshot.eta {
        writeln!(out, "eta: {eta}")?;
    }
    if let Some(action) = &snapshot.current_action {
        writeln!(out, "action: {action}")?;
    }
    if let Some(stalled) = snapshot.stalled_for {
        writeln!(out, "stalled: {stalled}s")?;
    }
    writeln!(out, "log lines: {}", snapshot.logs.len())
}

fn write_failed(err: io::Error) -> CliError {
    CliError::failure(anyhow!("failed to write output: {err}"))
}
