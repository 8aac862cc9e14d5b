use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One file's upload, created when the expanded file list is finalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    id: TaskId,
    path: PathBuf,
    display_name: String,
    size: u64,
}

impl UploadTask {
    pub fn new(id: TaskId, path: PathBuf, size: u64) -> Self {
        let display_name = display_name(&path);
        Self {
            id,
            path,
            display_name,
            size,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Base name of `path`, falling back to the full path when it has none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TooLarge,
    SplitFailed,
    ResolutionFailed,
    TransportError,
    ParseError,
    FileUnreadable,
    Cancelled,
}

impl ErrorKind {
    /// Kinds worth another attempt with a freshly resolved server.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::ResolutionFailed | ErrorKind::TransportError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::TooLarge => write!(f, "too large"),
            ErrorKind::SplitFailed => write!(f, "split failed"),
            ErrorKind::ResolutionFailed => write!(f, "server resolution failed"),
            ErrorKind::TransportError => write!(f, "transport error"),
            ErrorKind::ParseError => write!(f, "share url not found"),
            ErrorKind::FileUnreadable => write!(f, "file unreadable"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct UploadError {
    pub kind: ErrorKind,
    pub message: String,
}

impl UploadError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

impl UploadFailure {
    pub fn new(path: impl Into<PathBuf>, error: UploadError) -> Self {
        Self {
            path: path.into(),
            kind: error.kind,
            message: error.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    Success { path: PathBuf, share_url: String },
    Failure(UploadFailure),
}

impl UploadResult {
    pub fn from_outcome(path: PathBuf, outcome: Result<String, UploadError>) -> Self {
        match outcome {
            Ok(share_url) => UploadResult::Success { path, share_url },
            Err(err) => UploadResult::Failure(UploadFailure::new(path, err)),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            UploadResult::Success { path, .. } => path,
            UploadResult::Failure(failure) => &failure.path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Success { .. })
    }
}

/// Everything a caller learns about one batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    pub uploaded: BTreeMap<PathBuf, String>,
    pub failures: Vec<UploadFailure>,
    pub not_attempted: Vec<PathBuf>,
}

impl BatchReport {
    /// True when every file was uploaded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.not_attempted.is_empty()
    }

    pub fn total(&self) -> usize {
        self.uploaded.len() + self.failures.len() + self.not_attempted.len()
    }
}
