//! Event Printer - renders the event stream for the operator
//!
//! Writes each event to an output stream as a text line or a JSON line, and
//! optionally appends every event as JSONL to a file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use eyre::Context;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use super::types::{EventLogEntry, PoolEvent};
use crate::cli::OutputFormat;

/// Consumer that prints pool events
pub struct EventPrinter<W: Write> {
    out: W,
    format: OutputFormat,
    log: Option<BufWriter<File>>,
}

impl<W: Write> EventPrinter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format, log: None }
    }

    /// Also append every event as JSONL to `path`
    pub fn with_log_file(mut self, path: &Path) -> eyre::Result<Self> {
        debug!(?path, "EventPrinter::with_log_file: opening");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create events file directory")?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context(format!("Failed to open events file {}", path.display()))?;
        self.log = Some(BufWriter::new(file));
        Ok(self)
    }

    /// Write one event to the output (and the log file, if any)
    pub fn write_event(&mut self, event: &PoolEvent) -> eyre::Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}", event)?,
            OutputFormat::Json => {
                let json = serde_json::to_string(&EventLogEntry::new(event.clone()))?;
                writeln!(self.out, "{}", json)?;
            }
        }
        self.out.flush()?;

        if let Some(log) = self.log.as_mut() {
            let json = serde_json::to_string(&EventLogEntry::new(event.clone()))?;
            writeln!(log, "{}", json)?;
            log.flush()?;
        }
        Ok(())
    }

    /// Consume events until the pool's bus is dropped
    pub async fn run(mut self, mut rx: broadcast::Receiver<PoolEvent>) {
        debug!("EventPrinter::run: starting");
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = self.write_event(&event) {
                        error!(error = %e, "EventPrinter: failed to write event");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "EventPrinter: lagged behind, missed events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("EventPrinter: channel closed, shutting down");
                    break;
                }
            }
        }
    }
}

/// Spawn a stdout printer as a background task
///
/// The task ends once the pool that owns the bus is dropped.
pub fn spawn_event_printer(
    rx: broadcast::Receiver<PoolEvent>,
    format: OutputFormat,
    events_file: Option<&Path>,
) -> eyre::Result<tokio::task::JoinHandle<()>> {
    let mut printer = EventPrinter::new(std::io::stdout(), format);
    if let Some(path) = events_file {
        printer = printer.with_log_file(path)?;
    }
    Ok(tokio::spawn(printer.run(rx)))
}
