use std::collections::HashMap;

use tracing::info;

use crate::event::StreamEvent;
use crate::stream::patterns::DetectPatterns;

/// Stateful classifier for the blackdetect/freezedetect filter output.
///
/// ffmpeg interleaves three kinds of stderr lines this cares about: progress
/// lines carrying `frame=`, one-line blackdetect summaries, and freezedetect
/// metadata printed one field per line. Everything else passes through
/// without producing an event.
pub struct LineClassifier {
    channel_name: String,
    patterns: DetectPatterns,
    abnormal: bool,
    pending_freeze: HashMap<String, String>,
}

impl LineClassifier {
    pub fn new(channel_name: &str) -> Self {
        Self {
            channel_name: channel_name.to_string(),
            patterns: DetectPatterns::new(),
            abnormal: false,
            pending_freeze: HashMap::new(),
        }
    }

    /// Classifies one stderr line, returning the events it produced.
    ///
    /// The marker checks are deliberately independent, not an if/else
    /// chain: a single line may satisfy more than one.
    pub fn classify(&mut self, line: &str) -> Vec<StreamEvent> {
        let line = line.trim();
        let mut events = Vec::new();

        if line.contains("frame=") {
            if self.abnormal {
                // First healthy progress line after a detection ends the
                // abnormal episode without logging NORMAL.
                self.abnormal = false;
            } else {
                events.push(StreamEvent::normal(&self.channel_name));
            }
        }

        if line.contains("blackdetect") {
            let duration = self
                .patterns
                .black_pair
                .captures_iter(line)
                .filter(|caps| &caps[1] == "black_duration")
                .last()
                .map(|caps| caps[2].to_string());

            info!(
                "Blank screen detected for {} seconds on {}",
                duration.as_deref().unwrap_or("unknown"),
                self.channel_name
            );

            events.push(StreamEvent::blank(&self.channel_name, duration));
            self.abnormal = true;
        }

        if line.contains("freezedetect") {
            if let Some(caps) = self.patterns.freeze_field.captures(line) {
                self.pending_freeze
                    .insert(caps[1].to_string(), caps[2].to_string());

                let complete = ["freeze_start", "freeze_end", "freeze_duration"]
                    .iter()
                    .all(|key| self.pending_freeze.contains_key(*key));

                if complete {
                    let duration = self.pending_freeze.get("freeze_duration").cloned();

                    info!(
                        "Freeze detected for {} seconds on {}",
                        duration.as_deref().unwrap_or("unknown"),
                        self.channel_name
                    );

                    events.push(StreamEvent::freeze(&self.channel_name, duration));
                    self.pending_freeze.clear();
                    self.abnormal = true;
                }
            }
        }

        events
    }
}
