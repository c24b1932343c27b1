use regex::Regex;

#[derive(Clone)]
pub struct DetectPatterns {
    /// `key:value` pairs as blackdetect prints them, e.g. `black_duration:6.2`
    pub black_pair: Regex,
    /// freezedetect timed-metadata fields, e.g. `lavfi.freezedetect.freeze_start: 10.008`
    pub freeze_field: Regex,
}

impl DetectPatterns {
    pub fn new() -> Self {
        Self {
            black_pair: Regex::new(r"(\w+):([\d.]+)").unwrap(),
            freeze_field: Regex::new(r"lavfi\.freezedetect\.(freeze_\w+):\s*([\d.]+)").unwrap(),
        }
    }
}
