use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::event::StreamEvent;

/// Destination for classified stream events.
pub trait EventSink {
    fn append(&mut self, event: &StreamEvent) -> Result<()>;
}

const ALLOWED_EXTENSIONS: [&str; 3] = ["log", "txt", "csv"];

/// Appends events as one JSON object per line to `log_<channel>.<ext>`.
///
/// The file is opened for every append, so a log that is truncated or
/// removed while a monitor runs is simply recreated on the next event.
#[derive(Debug)]
pub struct ChannelLogSink {
    path: PathBuf,
}

impl ChannelLogSink {
    pub fn new(channel_name: &str, log_dir: impl AsRef<Path>, extension: &str) -> Result<Self> {
        let extension = extension.trim_start_matches('.');
        if !ALLOWED_EXTENSIONS.contains(&extension) {
            anyhow::bail!(
                "Invalid file extension '{}'. Allowed extensions are: {}",
                extension,
                ALLOWED_EXTENSIONS.join(", ")
            );
        }

        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

        Ok(Self {
            path: log_dir.join(format!("log_{}.{}", channel_name, extension)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for ChannelLogSink {
    fn append(&mut self, event: &StreamEvent) -> Result<()> {
        let record = serde_json::to_string(event).context("Failed to serialize event")?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open log file {}", self.path.display()))?;
        writeln!(file, "{}", record)
            .with_context(|| format!("Failed to write to log file {}", self.path.display()))?;

        Ok(())
    }
}

/// Collects events in memory. Test double for the file sink.
#[cfg(test)]
pub struct MemorySink {
    pub events: Vec<StreamEvent>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }
}

#[cfg(test)]
impl EventSink for MemorySink {
    fn append(&mut self, event: &StreamEvent) -> Result<()> {
        self.events.push(event.clone());
        Ok(())
    }
}
