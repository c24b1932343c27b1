use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Monitor one channel for blank and freeze anomalies
    Run(RunArgs),
    /// Build a JSON channel map from channel and URL list files
    GenMap(GenMapArgs),
    /// Write per-channel .conf files from channel and URL list files
    GenConf(GenConfArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Channel name to monitor (map lookup ignores case)
    pub channel: String,

    /// JSON file mapping channel names to stream URLs; falls back to the
    /// URL_MAP environment variable
    #[arg(short, long)]
    pub map_file: Option<PathBuf>,

    /// Seconds of black picture before blackdetect reports
    #[arg(long, default_value_t = 5.0)]
    pub blank_duration: f64,

    /// Seconds of frozen picture before freezedetect reports
    #[arg(long, default_value_t = 5.0)]
    pub freeze_duration: f64,

    /// Noise tolerance for freeze detection
    #[arg(long, default_value_t = 0.01)]
    pub freeze_noise_threshold: f64,

    /// Directory for the channel log file
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// Channel log file extension (log, txt or csv)
    #[arg(long, default_value = "txt")]
    pub extension: String,

    /// ffmpeg cli path (optional)
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg_path: String,
}

#[derive(Args, Debug, Clone)]
pub struct GenMapArgs {
    /// File with one channel name per line
    #[arg(long, default_value = "channel.txt")]
    pub channels: PathBuf,

    /// File with one stream URL per line
    #[arg(long, default_value = "url.txt")]
    pub urls: PathBuf,

    /// Output path for the JSON channel map
    #[arg(short, long, default_value = "url_map.json")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct GenConfArgs {
    /// File with one channel name per line
    #[arg(long, default_value = "channel.txt")]
    pub channels: PathBuf,

    /// File with one stream URL per line
    #[arg(long, default_value = "url.txt")]
    pub urls: PathBuf,

    /// Directory for the generated .conf files
    #[arg(short, long, default_value = ".ott-configs")]
    pub output_dir: PathBuf,
}

/// Filter thresholds handed to the blackdetect/freezedetect graph.
#[derive(Debug, Clone, Copy)]
pub struct DetectionThresholds {
    pub blank_duration: f64,
    pub freeze_duration: f64,
    pub freeze_noise_threshold: f64,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            blank_duration: 5.0,
            freeze_duration: 5.0,
            freeze_noise_threshold: 0.01,
        }
    }
}

impl RunArgs {
    pub fn thresholds(&self) -> DetectionThresholds {
        DetectionThresholds {
            blank_duration: self.blank_duration,
            freeze_duration: self.freeze_duration,
            freeze_noise_threshold: self.freeze_noise_threshold,
        }
    }
}

pub const URL_MAP_VAR: &str = "URL_MAP";

/// Channel-name to stream-URL lookup, keyed case-insensitively.
#[derive(Debug, Clone)]
pub struct ChannelMap {
    urls: HashMap<String, String>,
}

impl ChannelMap {
    pub fn from_json(json: &str) -> Result<Self> {
        let urls: HashMap<String, String> =
            serde_json::from_str(json).context("The channel map is not valid JSON")?;

        Ok(Self {
            urls: urls
                .into_iter()
                .map(|(channel, url)| (channel.to_lowercase(), url))
                .collect(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read channel map {}", path.display()))?;
        Self::from_json(&json)
            .with_context(|| format!("Invalid channel map in {}", path.display()))
    }

    pub fn from_env() -> Result<Self> {
        let json = env::var(URL_MAP_VAR).unwrap_or_default();
        if json.is_empty() {
            anyhow::bail!(
                "Environment variable '{}' not found. Define it or pass --map-file.",
                URL_MAP_VAR
            );
        }
        Self::from_json(&json).with_context(|| {
            format!("The '{}' environment variable is not valid JSON", URL_MAP_VAR)
        })
    }

    /// Loads from the given file when present, otherwise from the URL_MAP
    /// environment variable.
    pub fn load(map_file: Option<&Path>) -> Result<Self> {
        match map_file {
            Some(path) => Self::from_file(path),
            None => Self::from_env(),
        }
    }

    /// Looks up a channel, ignoring case.
    pub fn resolve(&self, channel_name: &str) -> Result<&str> {
        self.urls
            .get(&channel_name.to_lowercase())
            .map(String::as_str)
            .ok_or_else(|| {
                let mut known: Vec<&str> = self.urls.keys().map(String::as_str).collect();
                known.sort_unstable();
                anyhow::anyhow!(
                    "Channel '{}' not found in the channel map. Available channels are: [{}]",
                    channel_name,
                    known.join(", ")
                )
            })
    }
}

/// Accepts anything ffmpeg could open: a parseable URL or an existing
/// local path.
pub fn ensure_stream_input(input: &str) -> Result<()> {
    if Url::parse(input).is_ok() {
        return Ok(());
    }
    if Path::new(input).exists() {
        return Ok(());
    }

    anyhow::bail!(
        "Unable to determine stream input: '{}' is neither a URL nor an existing path",
        input
    )
}
