//! zpup engine: HTTP, filesystem and child-process side of an upload batch.
mod client;
mod error;
mod events;
mod orchestrator;
mod persist;
mod resolver;
mod scrape;
mod settings;
mod splitter;
mod transport;

pub use client::{build_client, with_timeout};
pub use error::EngineError;
pub use events::{ChannelProgressSink, NullProgressSink, ProgressSink, UploadEvent};
pub use orchestrator::{Expansion, Orchestrator, StopHandle};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use resolver::{LandingPageResolver, ServerResolver};
pub use scrape::{extract_server_id, ShareLinkScraper};
pub use settings::{SplitterSettings, UploadSettings, DEFAULT_REFERER, DEFAULT_USER_AGENT};
pub use splitter::{collect_parts, FfmpegSplitter, Splitter};
pub use transport::{ByteProgress, MultipartTransport, UploadTransport, BODY_CHUNK_SIZE};
