//! Spawning, reading and classifying the ffmpeg analysis stream.

mod classifier;
mod monitor;
mod patterns;
mod source;

pub use monitor::StreamMonitor;
