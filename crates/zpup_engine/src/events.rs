use std::sync::mpsc;

use zpup_core::{BatchPhase, TaskId, UploadResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    PhaseChanged(BatchPhase),
    TaskStarted {
        task_id: TaskId,
        display_name: String,
        total_bytes: u64,
    },
    /// Bytes of the file body handed to the connection so far.
    Progress {
        task_id: TaskId,
        bytes_sent: u64,
        total_bytes: u64,
    },
    /// Another attempt is about to start after a retryable failure.
    Retrying {
        task_id: TaskId,
        attempt: u32,
        reason: String,
    },
    TaskFinished {
        task_id: TaskId,
        result: UploadResult,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: UploadEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<UploadEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<UploadEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: UploadEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: UploadEvent) {}
}
