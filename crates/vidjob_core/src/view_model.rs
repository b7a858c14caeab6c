use crate::{ArtifactRef, JobPhase, ObservationMode, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgressView {
    pub received: u64,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    pub session: SessionId,
    pub endpoint: String,
    pub mode: ObservationMode,
    pub phase: JobPhase,
    pub job_id: Option<String>,
    pub status: String,
    pub observing: bool,
    /// Submission sent, no answer yet.
    pub submitting: bool,
    pub download_ready: bool,
    pub downloading: bool,
    pub download_progress: Option<DownloadProgressView>,
    pub artifact: Option<ArtifactRef>,
    pub saved_path: Option<String>,
    pub dirty: bool,
}

impl SessionView {
    /// Nothing is in flight for the current session.
    pub fn is_settled(&self) -> bool {
        !self.submitting && !self.observing && !self.downloading
    }
}
