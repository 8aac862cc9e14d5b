use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use zpup_core::{format_segment_time, part_index, segment_output_pattern, ErrorKind, UploadError};
use zpup_logging::{zpup_debug, zpup_info};

use crate::SplitterSettings;

#[async_trait::async_trait]
pub trait Splitter: Send + Sync {
    /// Splits `path` into roughly `part_count` sibling files, returned in order.
    async fn split(&self, path: &Path, part_count: u64) -> Result<Vec<PathBuf>, UploadError>;
}

/// Splits videos by duration with ffprobe and ffmpeg's segment muxer.
#[derive(Debug, Clone, Default)]
pub struct FfmpegSplitter {
    settings: SplitterSettings,
}

impl FfmpegSplitter {
    pub fn new(settings: SplitterSettings) -> Self {
        Self { settings }
    }

    async fn probe_duration(&self, source: &Path) -> Result<f64, UploadError> {
        let output = Command::new(&self.settings.ffprobe)
            .args([
                "-v",
                "quiet",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(source)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| split_failed(format!("could not run ffprobe: {err}")))?;

        if !output.status.success() {
            return Err(split_failed(format!("ffprobe exited with {}", output.status)));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let seconds: f64 = text
            .trim()
            .parse()
            .map_err(|_| split_failed(format!("unexpected ffprobe output {:?}", text.trim())))?;
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(split_failed(format!("unusable duration {seconds}")));
        }
        Ok(seconds)
    }

    async fn segment(&self, source: &Path, segment_time: &str) -> Result<(), UploadError> {
        let status = Command::new(&self.settings.ffmpeg)
            .arg("-i")
            .arg(source)
            .args([
                "-c",
                "copy",
                "-map",
                "0",
                "-f",
                "segment",
                "-segment_time",
                segment_time,
                "-reset_timestamps",
                "1",
                "-v",
                "quiet",
            ])
            .arg(segment_output_pattern(source))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|err| split_failed(format!("could not run ffmpeg: {err}")))?;

        if !status.success() {
            return Err(split_failed(format!("ffmpeg exited with {status}")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Splitter for FfmpegSplitter {
    async fn split(&self, path: &Path, part_count: u64) -> Result<Vec<PathBuf>, UploadError> {
        let source = tokio::fs::canonicalize(path)
            .await
            .map_err(|err| split_failed(format!("{}: {err}", path.display())))?;

        let duration = self.probe_duration(&source).await?;
        let segment_time = format_segment_time(duration / part_count.max(1) as f64);
        zpup_info!(
            "Splitting {} ({duration:.1}s) into {part_count} parts of {segment_time}",
            source.display()
        );

        self.segment(&source, &segment_time).await?;

        let parts = collect_parts(&source)
            .await
            .map_err(|err| split_failed(format!("listing parts: {err}")))?;
        if parts.is_empty() {
            return Err(split_failed("segmenter produced no parts"));
        }
        zpup_debug!("{} split into {} parts", source.display(), parts.len());
        Ok(parts)
    }
}

/// Sibling files named `<stem>.<NN><ext>`, ascending by index.
pub async fn collect_parts(source: &Path) -> io::Result<Vec<PathBuf>> {
    let dir = match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut parts = Vec::new();
    let mut entries = tokio::fs::read_dir(&dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let candidate = entry.path();
        let Some(index) = part_index(source, &candidate) else {
            continue;
        };
        if entry.file_type().await?.is_file() {
            parts.push((index, candidate));
        }
    }
    parts.sort();
    Ok(parts.into_iter().map(|(_, path)| path).collect())
}

fn split_failed(message: impl Into<String>) -> UploadError {
    UploadError::new(ErrorKind::SplitFailed, message)
}
