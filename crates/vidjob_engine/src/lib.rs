//! Vidjob engine: remote job API, observation tasks and artifact saving.
mod api;
mod download;
mod engine;
mod persist;
mod poll;
mod push;
mod retry;
mod sink;
mod types;

pub use api::{
    channel_url, download_url, process_url, progress_url, ApiSettings, DownloadMode, JobApi,
    ReqwestJobApi, DEFAULT_TOPIC,
};
pub use download::{download_artifact, DownloadRequest, DownloadSettings};
pub use engine::{EngineHandle, EngineSettings};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poll::{poll_until_terminal, PollEnd};
pub use push::{listen, parse_frame, ListenEnd};
pub use retry::{Backoff, RetryPolicy};
pub use sink::{ChannelProgressSink, ProgressSink};
pub use types::{ApiError, ChannelSignal, EngineEvent, FailureKind, PollOutcome, SessionKey};
