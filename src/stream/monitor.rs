use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{self, DetectionThresholds};
use crate::sink::EventSink;
use crate::stream::classifier::LineClassifier;
use crate::stream::source::LineSource;

/// blackdetect pixel luminance threshold. Fixed, not operator-tunable.
const BLACK_PIXEL_THRESHOLD: f64 = 0.01;

/// Supervises one ffmpeg analysis process for one channel.
pub struct StreamMonitor {
    ffmpeg_path: String,
    stream_url: String,
    channel_name: String,
    thresholds: DetectionThresholds,
}

impl StreamMonitor {
    pub fn new(
        ffmpeg_path: String,
        stream_url: String,
        channel_name: String,
        thresholds: DetectionThresholds,
    ) -> Result<Self> {
        config::ensure_stream_input(&stream_url)
            .with_context(|| format!("Invalid stream input for channel {}", channel_name))?;

        Ok(Self {
            ffmpeg_path,
            stream_url,
            channel_name,
            thresholds,
        })
    }

    fn filter_graph(&self) -> String {
        format!(
            "blackdetect=d={}:pix_th={},freezedetect=n={}:d={}",
            self.thresholds.blank_duration,
            BLACK_PIXEL_THRESHOLD,
            self.thresholds.freeze_noise_threshold,
            self.thresholds.freeze_duration,
        )
    }

    fn build_ffmpeg_command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-i")
            .arg(&self.stream_url)
            .arg("-vf")
            .arg(self.filter_graph())
            .arg("-f")
            .arg("null")
            .arg("-loglevel")
            .arg("info")
            .arg("pipe:")
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!("FFmpeg command: {:?}", cmd);
        cmd
    }

    /// Runs ffmpeg to completion, feeding every stderr line through the
    /// classifier into the sink. Returns the subprocess exit code.
    #[instrument(skip(self, sink), fields(channel = %self.channel_name))]
    pub fn run(&self, sink: &mut impl EventSink) -> Result<i32> {
        info!("Fetching stream logs for {}", self.channel_name);

        let mut child = self
            .build_ffmpeg_command()
            .spawn()
            .context("Failed to spawn ffmpeg process")?;
        let stderr = child.stderr.take().context("Failed to capture stderr")?;

        let mut classifier = LineClassifier::new(&self.channel_name);

        for line in LineSource::new(stderr) {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!(
                        "Stopping stream log monitoring for {}: {}",
                        self.channel_name, e
                    );
                    terminate(&mut child);
                    break;
                }
            };

            debug!("FFmpeg stderr: {}", line);

            for event in classifier.classify(&line) {
                if let Err(e) = sink.append(&event) {
                    warn!("Error writing to channel log: {:#}", e);
                }
            }
        }

        let status = child.wait().context("Failed to wait for ffmpeg process")?;
        let code = status.code().unwrap_or(-1);

        if code != 0 {
            warn!(
                "Subprocess for {} exited with code {}",
                self.channel_name, code
            );
        }

        Ok(code)
    }
}

/// Asks the child to shut down. SIGTERM where available so ffmpeg can tear
/// down its filter graph; hard kill elsewhere.
#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(i32::try_from(child.id()).unwrap_or(i32::MAX));
    if kill(pid, Signal::SIGTERM).is_err() {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::StreamState;
    use crate::sink::MemorySink;

    fn thresholds() -> DetectionThresholds {
        DetectionThresholds::default()
    }

    #[test]
    fn rejects_unresolvable_stream_input() {
        let result = StreamMonitor::new(
            "ffmpeg".to_string(),
            "definitely-missing.ts".to_string(),
            "cnn".to_string(),
            thresholds(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn filter_graph_carries_thresholds() {
        let monitor = StreamMonitor::new(
            "ffmpeg".to_string(),
            "http://example.com/live.m3u8".to_string(),
            "cnn".to_string(),
            DetectionThresholds {
                blank_duration: 7.5,
                freeze_duration: 4.0,
                freeze_noise_threshold: 0.003,
            },
        )
        .unwrap();

        assert_eq!(
            monitor.filter_graph(),
            "blackdetect=d=7.5:pix_th=0.01,freezedetect=n=0.003:d=4"
        );
    }

    #[test]
    fn command_arguments_match_analysis_graph() {
        let monitor = StreamMonitor::new(
            "ffmpeg".to_string(),
            "http://example.com/live.m3u8".to_string(),
            "cnn".to_string(),
            thresholds(),
        )
        .unwrap();

        let cmd = monitor.build_ffmpeg_command();
        assert_eq!(cmd.get_program(), "ffmpeg");

        let args: Vec<String> = cmd
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-i",
                "http://example.com/live.m3u8",
                "-vf",
                "blackdetect=d=5:pix_th=0.01,freezedetect=n=0.01:d=5",
                "-f",
                "null",
                "-loglevel",
                "info",
                "pipe:",
            ]
        );
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &std::path::Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    fn monitor_with(ffmpeg: String) -> StreamMonitor {
        StreamMonitor::new(
            ffmpeg,
            "http://example.com/live.m3u8".to_string(),
            "cnn".to_string(),
            thresholds(),
        )
        .unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn propagates_subprocess_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = monitor_with(fake_ffmpeg(dir.path(), "exit 3"));

        let mut sink = MemorySink::new();
        assert_eq!(monitor.run(&mut sink).unwrap(), 3);
        assert!(sink.events.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn clean_exit_returns_zero() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = monitor_with(fake_ffmpeg(dir.path(), "exit 0"));

        let mut sink = MemorySink::new();
        assert_eq!(monitor.run(&mut sink).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn classifies_scripted_stderr_into_sink() {
        let dir = tempfile::tempdir().unwrap();
        let script = concat!(
            "echo 'frame=   25 fps= 25 q=-1.0 size=N/A time=00:00:01.00 bitrate=N/A speed=   1x' >&2\n",
            "echo '[blackdetect @ 0x1] black_start:1.0 black_end:7.2 black_duration:6.2' >&2\n",
            "echo 'frame=   50 fps= 25 q=-1.0 size=N/A time=00:00:02.00 bitrate=N/A speed=   1x' >&2\n",
            "echo 'frame=   75 fps= 25 q=-1.0 size=N/A time=00:00:03.00 bitrate=N/A speed=   1x' >&2\n",
            "exit 0\n",
        );
        let monitor = monitor_with(fake_ffmpeg(dir.path(), script));

        let mut sink = MemorySink::new();
        assert_eq!(monitor.run(&mut sink).unwrap(), 0);

        let states: Vec<StreamState> = sink.events.iter().map(|e| e.state).collect();
        assert_eq!(
            states,
            [StreamState::Normal, StreamState::Blank, StreamState::Normal]
        );
        assert_eq!(sink.events[1].duration.as_deref(), Some("6.2"));
        assert!(sink.events.iter().all(|e| e.channel_name == "cnn"));
    }

    #[cfg(unix)]
    #[test]
    fn classifies_repeated_blank_and_freeze_episodes() {
        let dir = tempfile::tempdir().unwrap();
        let script = concat!(
            "echo 'frame=   25 fps= 25 q=-1.0 size=N/A time=00:00:01.00 bitrate=N/A speed=   1x' >&2\n",
            "echo '[blackdetect @ 0x1] black_start:1.0 black_end:7.2 black_duration:6.2' >&2\n",
            "echo '[blackdetect @ 0x1] black_start:9.0 black_end:14.1 black_duration:5.1' >&2\n",
            "echo 'frame=   50 fps= 25 q=-1.0 size=N/A time=00:00:02.00 bitrate=N/A speed=   1x' >&2\n",
            "echo 'frame=   75 fps= 25 q=-1.0 size=N/A time=00:00:03.00 bitrate=N/A speed=   1x' >&2\n",
            "echo '[freezedetect @ 0x2] lavfi.freezedetect.freeze_start: 10.008' >&2\n",
            "echo '[freezedetect @ 0x2] lavfi.freezedetect.freeze_end: 20.01' >&2\n",
            "echo '[freezedetect @ 0x2] lavfi.freezedetect.freeze_duration: 10.002' >&2\n",
            "echo 'frame=  100 fps= 25 q=-1.0 size=N/A time=00:00:04.00 bitrate=N/A speed=   1x' >&2\n",
            "echo 'frame=  125 fps= 25 q=-1.0 size=N/A time=00:00:05.00 bitrate=N/A speed=   1x' >&2\n",
            "exit 0\n",
        );
        let monitor = monitor_with(fake_ffmpeg(dir.path(), script));

        let mut sink = MemorySink::new();
        assert_eq!(monitor.run(&mut sink).unwrap(), 0);

        // Each recovery swallows the first progress line after an episode.
        let states: Vec<StreamState> = sink.events.iter().map(|e| e.state).collect();
        assert_eq!(
            states,
            [
                StreamState::Normal,
                StreamState::Blank,
                StreamState::Blank,
                StreamState::Normal,
                StreamState::Freeze,
                StreamState::Normal,
            ]
        );
        assert_eq!(sink.events[1].duration.as_deref(), Some("6.2"));
        assert_eq!(sink.events[2].duration.as_deref(), Some("5.1"));
        assert_eq!(sink.events[4].duration.as_deref(), Some("10.002"));
    }
}
