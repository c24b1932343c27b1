use chrono::Local;
use serde::Serialize;

/// Classified condition of the monitored stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamState {
    Normal,
    Blank,
    Freeze,
}

/// One detection record, serialized as a single JSON line in the channel log.
///
/// Durations keep the decimal text ffmpeg reported rather than a parsed
/// float. A blackdetect line without a usable duration is recorded as null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamEvent {
    pub state: StreamState,
    pub channel_name: String,
    pub duration: Option<String>,
    pub timestamp: String,
}

impl StreamEvent {
    pub fn normal(channel_name: &str) -> Self {
        Self {
            state: StreamState::Normal,
            channel_name: channel_name.to_string(),
            duration: Some("0.00".to_string()),
            timestamp: detection_timestamp(),
        }
    }

    pub fn blank(channel_name: &str, duration: Option<String>) -> Self {
        Self {
            state: StreamState::Blank,
            channel_name: channel_name.to_string(),
            duration,
            timestamp: detection_timestamp(),
        }
    }

    pub fn freeze(channel_name: &str, duration: Option<String>) -> Self {
        Self {
            state: StreamState::Freeze,
            channel_name: channel_name.to_string(),
            duration,
            timestamp: detection_timestamp(),
        }
    }
}

/// Local wall-clock time in the format the channel logs use.
pub fn detection_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
