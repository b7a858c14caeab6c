use crate::{ObservationEvent, ObservationMode, SessionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the service endpoint.
    EndpointChanged(String),
    /// User edited the video URL input.
    SourceChanged(String),
    /// User picked the observation strategy for the next submission.
    ModeSelected(ObservationMode),
    /// User submitted the current inputs.
    SubmitClicked,
    /// Engine: the job-creation request returned a 2xx.
    SubmissionAccepted { session: SessionId },
    /// Engine: the job-creation request failed.
    SubmissionFailed { session: SessionId, message: String },
    /// Engine: one poll result or push-channel signal.
    Observed {
        session: SessionId,
        event: ObservationEvent,
    },
    /// User asked for the artifact.
    DownloadClicked,
    /// Engine: bytes received so far for the running download.
    DownloadProgress {
        session: SessionId,
        received: u64,
        total: Option<u64>,
    },
    /// Engine: download ended with the saved path or an error description.
    DownloadFinished {
        session: SessionId,
        result: Result<String, String>,
    },
    /// Render tick.
    Tick,
    NoOp,
}
