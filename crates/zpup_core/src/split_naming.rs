use std::path::{Path, PathBuf};

/// Render a per-segment duration as `H:MM:SS`, dropping fractional seconds.
pub fn format_segment_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours}:{minutes:02}:{secs:02}")
}

/// Output pattern handed to the segmenter: `<dir>/<stem>.%02d<ext>`.
///
/// Any `%` already in the path is doubled so the segmenter writes it literally.
pub fn segment_output_pattern(source: &Path) -> PathBuf {
    let (stem, ext) = stem_and_ext(source);
    let name = format!(
        "{}.%02d{}",
        escape_percent(&stem),
        escape_percent(&ext)
    );
    match source.parent() {
        Some(parent) => escape_percent_path(parent).join(name),
        None => PathBuf::from(name),
    }
}

fn escape_percent(text: &str) -> String {
    text.replace('%', "%%")
}

fn escape_percent_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(text) if text.contains('%') => PathBuf::from(escape_percent(text)),
        _ => path.to_path_buf(),
    }
}

/// Index of `candidate` when it is a split part of `source`
/// (named `<stem>.<NN><ext>` with exactly two digits).
pub fn part_index(source: &Path, candidate: &Path) -> Option<u32> {
    let (stem, ext) = stem_and_ext(source);
    let name = candidate.file_name()?.to_str()?;
    let rest = name.strip_prefix(stem.as_str())?.strip_prefix('.')?;
    let digits = rest.strip_suffix(ext.as_str())?;
    if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn stem_and_ext(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}
