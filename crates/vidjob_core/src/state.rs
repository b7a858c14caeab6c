use crate::view_model::{DownloadProgressView, SessionView};
use crate::{ArtifactRef, JobPhase, ObservationMode, SessionId, SourceRef};

/// The job a session is tracking, with the endpoint it was submitted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveJob {
    pub(crate) source: SourceRef,
    pub(crate) endpoint: String,
}

/// All client state for one page-equivalent lifetime. Only [`crate::update`]
/// mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    endpoint: String,
    source_input: String,
    mode: ObservationMode,
    session: SessionId,
    /// Effects were emitted for `session` and may still be running.
    active: bool,
    job: Option<ActiveJob>,
    phase: JobPhase,
    status: String,
    artifact: Option<ArtifactRef>,
    observing: bool,
    downloading: bool,
    download_progress: Option<DownloadProgressView>,
    saved_path: Option<String>,
    dirty: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs(endpoint: impl Into<String>, mode: ObservationMode) -> Self {
        Self {
            endpoint: endpoint.into().trim().to_string(),
            mode,
            ..Self::default()
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session: self.session,
            endpoint: self.endpoint.clone(),
            mode: self.mode,
            phase: self.phase,
            job_id: self.job.as_ref().map(|job| job.source.video_id.clone()),
            status: self.status.clone(),
            observing: self.observing,
            submitting: self.job.is_some() && self.phase == JobPhase::Idle,
            download_ready: self.artifact.is_some(),
            downloading: self.downloading,
            download_progress: self.download_progress,
            artifact: self.artifact.clone(),
            saved_path: self.saved_path.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_current(&self, session: SessionId) -> bool {
        self.active && session == self.session
    }

    pub(crate) fn set_endpoint(&mut self, endpoint: String) {
        self.endpoint = endpoint.trim().to_string();
        self.mark_dirty();
    }

    pub(crate) fn set_source_input(&mut self, input: String) {
        self.source_input = input;
        self.mark_dirty();
    }

    pub(crate) fn set_mode(&mut self, mode: ObservationMode) {
        self.mode = mode;
        self.mark_dirty();
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn source_input(&self) -> &str {
        &self.source_input
    }

    pub(crate) fn mode(&self) -> ObservationMode {
        self.mode
    }

    pub(crate) fn job(&self) -> Option<&ActiveJob> {
        self.job.as_ref()
    }

    /// Clears every job-related field and opens a new session. Returns the
    /// previous session when it may still have work running.
    pub(crate) fn reset_for_submission(&mut self) -> Option<SessionId> {
        let superseded = self.active.then_some(self.session);
        self.session = self.session.next();
        self.active = false;
        self.job = None;
        self.phase = JobPhase::Idle;
        self.status.clear();
        self.artifact = None;
        self.observing = false;
        self.downloading = false;
        self.download_progress = None;
        self.saved_path = None;
        self.mark_dirty();
        superseded
    }

    pub(crate) fn start_job(&mut self, job: ActiveJob) {
        self.job = Some(job);
        self.active = true;
        self.mark_dirty();
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.mark_dirty();
    }

    pub(crate) fn set_phase(&mut self, phase: JobPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.mark_dirty();
        }
    }

    pub(crate) fn observing(&self) -> bool {
        self.observing
    }

    pub(crate) fn set_observing(&mut self, observing: bool) {
        self.observing = observing;
        self.mark_dirty();
    }

    pub(crate) fn artifact(&self) -> Option<&ArtifactRef> {
        self.artifact.as_ref()
    }

    pub(crate) fn set_artifact(&mut self, artifact: ArtifactRef) {
        self.artifact = Some(artifact);
        self.mark_dirty();
    }

    pub(crate) fn downloading(&self) -> bool {
        self.downloading
    }

    pub(crate) fn begin_download(&mut self) {
        self.downloading = true;
        self.download_progress = None;
        self.saved_path = None;
        self.mark_dirty();
    }

    pub(crate) fn apply_download_progress(&mut self, received: u64, total: Option<u64>) {
        self.download_progress = Some(DownloadProgressView { received, total });
        self.mark_dirty();
    }

    pub(crate) fn finish_download(&mut self, saved_path: Option<String>) {
        self.downloading = false;
        self.saved_path = saved_path;
        self.mark_dirty();
    }
}
