//! zpup core: pure upload-batch model, size policy and the batch state machine.
mod effect;
mod msg;
mod policy;
mod split_naming;
mod state;
mod task;
mod update;

pub use effect::{Effect, StopPolicy};
pub use msg::Msg;
pub use policy::{decide, media_kind, part_count, MediaKind, SizeDecision, SIZE_LIMIT};
pub use split_naming::{format_segment_time, part_index, segment_output_pattern};
pub use state::{BatchPhase, BatchState, DEFAULT_CONCURRENCY};
pub use task::{
    display_name, BatchReport, ErrorKind, TaskId, UploadError, UploadFailure, UploadResult,
    UploadTask,
};
pub use update::update;
