use crate::SessionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Abandon everything still running for a superseded session.
    CancelSession { session: SessionId },
    /// Open the push channel for `job_id`.
    OpenChannel {
        session: SessionId,
        endpoint: String,
        job_id: String,
    },
    SubmitJob {
        session: SessionId,
        endpoint: String,
        video_url: String,
    },
    StartPolling {
        session: SessionId,
        endpoint: String,
        job_id: String,
    },
    /// Stop the poll loop or close the push channel; downloads keep running.
    EndObservation { session: SessionId },
    StartDownload {
        session: SessionId,
        endpoint: String,
        job_id: String,
        file_name: String,
    },
}
