use crate::UploadTask;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start uploading this task.
    Dispatch(UploadTask),
    /// Abort every in-flight task now.
    AbortInFlight,
    /// Batch is over; release workers and connections.
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// Let in-flight tasks finish, drop queued ones.
    Finish,
    /// Drop queued tasks and abort in-flight ones.
    Immediate,
}
