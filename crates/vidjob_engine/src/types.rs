use std::fmt;
use std::path::PathBuf;

/// Session number assigned by the caller; echoed on every event so the
/// caller can drop events from sessions it has abandoned.
pub type SessionKey = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Server answered with a non-terminal status.
    Pending { status: String },
    Completed,
    Failed { reason: Option<String> },
    /// This check failed; the loop keeps going.
    Transient(ApiError),
}

impl PollOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollOutcome::Completed | PollOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSignal {
    Opened,
    Status(String),
    /// Raw text of a frame that did not decode.
    Malformed(String),
    Error(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SubmissionFinished {
        session: SessionKey,
        result: Result<(), ApiError>,
    },
    Polled {
        session: SessionKey,
        attempt: u32,
        outcome: PollOutcome,
    },
    PollingExhausted {
        session: SessionKey,
        attempts: u32,
    },
    Channel {
        session: SessionKey,
        signal: ChannelSignal,
    },
    DownloadProgress {
        session: SessionKey,
        received: u64,
        total: Option<u64>,
    },
    DownloadFinished {
        session: SessionKey,
        result: Result<PathBuf, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    UnexpectedContent { content_type: String },
    MalformedBody,
    Persist,
    /// The session was superseded before the work finished.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::UnexpectedContent { content_type } => {
                write!(f, "unexpected content type {content_type}")
            }
            FailureKind::MalformedBody => write!(f, "malformed response body"),
            FailureKind::Persist => write!(f, "could not save artifact"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
