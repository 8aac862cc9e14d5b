#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Size checks and splitting are about to run.
    ExpansionStarted,
    /// Expansion finished: `tasks` are ready to upload, `rejected` never will be.
    FilesExpanded {
        tasks: Vec<crate::UploadTask>,
        rejected: Vec<crate::UploadFailure>,
    },
    /// A dispatched task produced its result.
    TaskFinished {
        task_id: crate::TaskId,
        result: crate::UploadResult,
    },
    /// External stop request (e.g. Ctrl-C).
    StopRequested(crate::StopPolicy),
}
