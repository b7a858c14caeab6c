//! Vidjob core: pure job-session state machine and view-model helpers.
mod effect;
mod job;
mod msg;
pub mod observe;
mod source;
mod state;
pub mod status;
mod update;
mod view_model;

pub use effect::Effect;
pub use job::{artifact_file_name, ArtifactRef, JobPhase, ObservationMode, SessionId};
pub use msg::Msg;
pub use observe::{on_event, ChannelEvent, ObservationEvent, PollEvent, Step};
pub use source::{extract_video_id, SourceError, SourceRef};
pub use state::SessionState;
pub use update::update;
pub use view_model::{DownloadProgressView, SessionView};
