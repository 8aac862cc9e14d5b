use std::path::Path;

/// Largest file the host accepts, in bytes.
pub const SIZE_LIMIT: u64 = 500_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Other,
    Unknown,
}

/// Media kind guessed from the file extension only.
pub fn media_kind(path: &Path) -> MediaKind {
    match mime_guess::from_path(path).first() {
        Some(mime) if mime.type_() == mime_guess::mime::VIDEO => MediaKind::Video,
        Some(_) => MediaKind::Other,
        None => MediaKind::Unknown,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeDecision {
    Accept,
    SplitRequired(u64),
    Reject(String),
}

/// Decide whether a file of `size` bytes can be uploaded as-is.
pub fn decide(path: &Path, size: u64, limit: u64, split_enabled: bool) -> SizeDecision {
    if size <= limit {
        return SizeDecision::Accept;
    }
    if limit == 0 {
        return SizeDecision::Reject(format!("{size} bytes exceeds a zero byte limit"));
    }
    if !split_enabled {
        return SizeDecision::Reject(format!(
            "{size} bytes exceeds the {limit} byte limit and splitting is disabled"
        ));
    }
    match media_kind(path) {
        MediaKind::Video => SizeDecision::SplitRequired(part_count(size, limit)),
        MediaKind::Other => SizeDecision::Reject(format!(
            "{size} bytes exceeds the {limit} byte limit and only videos can be split"
        )),
        MediaKind::Unknown => SizeDecision::Reject(format!(
            "{size} bytes exceeds the {limit} byte limit and the media type cannot be determined"
        )),
    }
}

/// Number of parts needed so that each one fits `limit`.
///
/// A zero `limit` counts as one byte.
pub fn part_count(size: u64, limit: u64) -> u64 {
    size / limit.max(1) + 1
}
