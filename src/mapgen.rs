use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Reads a list file: one entry per line, trimmed, blank lines skipped.
fn read_list(path: &Path, lowercase: bool) -> Result<Vec<String>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if lowercase {
                line.to_lowercase()
            } else {
                line.to_string()
            }
        })
        .collect())
}

fn read_pairs(channel_file: &Path, url_file: &Path) -> Result<Vec<(String, String)>> {
    let channels = read_list(channel_file, true)?;
    let urls = read_list(url_file, false)?;

    if channels.len() != urls.len() {
        anyhow::bail!(
            "The number of channels ({}) and URLs ({}) must match",
            channels.len(),
            urls.len()
        );
    }

    Ok(channels.into_iter().zip(urls).collect())
}

/// Writes the channel map as pretty-printed JSON, keys sorted.
pub fn generate_url_map(channel_file: &Path, url_file: &Path, output_file: &Path) -> Result<()> {
    let map: BTreeMap<String, String> = read_pairs(channel_file, url_file)?.into_iter().collect();

    let json = serde_json::to_string_pretty(&map).context("Failed to serialize channel map")?;
    fs::write(output_file, json)
        .with_context(|| format!("Failed to write {}", output_file.display()))?;

    info!("URL map saved to {}", output_file.display());
    Ok(())
}

/// Writes one `<channel>.conf` per channel containing `URL=<url>`.
pub fn generate_conf_files(channel_file: &Path, url_file: &Path, output_dir: &Path) -> Result<()> {
    let pairs = read_pairs(channel_file, url_file)?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    for (channel, url) in &pairs {
        let path = output_dir.join(format!("{}.conf", channel));
        fs::write(&path, format!("URL={}\n", url))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    info!("Wrote {} conf files to {}", pairs.len(), output_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_lists(dir: &Path, channels: &str, urls: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let channel_file = dir.join("channel.txt");
        let url_file = dir.join("url.txt");
        fs::write(&channel_file, channels).unwrap();
        fs::write(&url_file, urls).unwrap();
        (channel_file, url_file)
    }

    #[test]
    fn generates_lowercased_sorted_map() {
        let dir = tempfile::tempdir().unwrap();
        let (channels, urls) = write_lists(
            dir.path(),
            "CNN\n\n  bbc  \n",
            "http://example.com/cnn.m3u8\nhttp://example.com/bbc.m3u8\n",
        );
        let output = dir.path().join("url_map.json");

        generate_url_map(&channels, &urls, &output).unwrap();

        let map: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(map["cnn"], "http://example.com/cnn.m3u8");
        assert_eq!(map["bbc"], "http://example.com/bbc.m3u8");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn rejects_mismatched_list_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let (channels, urls) = write_lists(dir.path(), "cnn\nbbc\n", "http://example.com/cnn.m3u8\n");
        let output = dir.path().join("url_map.json");

        let err = generate_url_map(&channels, &urls, &output).unwrap_err();
        assert!(err.to_string().contains("must match"));
        assert!(!output.exists());
    }

    #[test]
    fn writes_one_conf_file_per_channel() {
        let dir = tempfile::tempdir().unwrap();
        let (channels, urls) = write_lists(
            dir.path(),
            "CNN\nbbc\n",
            "http://example.com/cnn.m3u8\nhttp://example.com/bbc.m3u8\n",
        );
        let out_dir = dir.path().join("confs");

        generate_conf_files(&channels, &urls, &out_dir).unwrap();

        let cnn = fs::read_to_string(out_dir.join("cnn.conf")).unwrap();
        assert_eq!(cnn, "URL=http://example.com/cnn.m3u8\n");
        assert!(out_dir.join("bbc.conf").exists());
    }
}
