//! Observation transition table shared by the polling and push strategies.
//!
//! [`on_event`] is a pure function of the current phase and one event, so
//! every path can be exercised without a server or a socket.

use crate::status;
use crate::JobPhase;

/// Message text on the push channel that marks the job as done.
pub const COMPLETION_SIGNAL: &str = "completed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservationEvent {
    Poll(PollEvent),
    Channel(ChannelEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// Server reported a non-terminal status.
    Pending,
    Completed,
    Failed { reason: Option<String> },
    /// One status check failed (network, HTTP status, non-JSON body).
    Transient { attempt: u32 },
    /// Retry budget used up without a terminal status.
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Status(String),
    /// A frame that did not decode as a status message.
    Malformed,
    Error(String),
    Closed,
}

/// Result of applying one observation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub phase: JobPhase,
    /// Replacement status text; `None` leaves the current text in place.
    pub status: Option<String>,
    pub artifact_ready: bool,
    /// The observation task should stop (poll loop ends, channel closes).
    pub end_observation: bool,
}

impl Step {
    fn stay(phase: JobPhase) -> Self {
        Self {
            phase,
            status: None,
            artifact_ready: false,
            end_observation: false,
        }
    }

    fn to(phase: JobPhase, status: impl Into<String>) -> Self {
        Self {
            phase,
            status: Some(status.into()),
            artifact_ready: false,
            end_observation: false,
        }
    }

    fn ending(mut self) -> Self {
        self.end_observation = true;
        self
    }

    fn completed() -> Self {
        Self {
            phase: JobPhase::Completed,
            status: Some(status::COMPLETED.to_string()),
            artifact_ready: true,
            end_observation: true,
        }
    }
}

pub fn on_event(phase: JobPhase, event: &ObservationEvent) -> Step {
    if phase.is_terminal() {
        return Step::stay(phase);
    }

    match event {
        ObservationEvent::Poll(poll) => match poll {
            PollEvent::Pending => Step::to(JobPhase::InProgress, status::PROCESSING),
            PollEvent::Completed => Step::completed(),
            PollEvent::Failed { reason } => {
                let reason = reason.as_deref().unwrap_or(status::UNKNOWN_ERROR);
                Step::to(JobPhase::Failed, status::job_error(reason)).ending()
            }
            PollEvent::Transient { attempt } => Step::to(phase, status::retrying(*attempt)),
            PollEvent::Exhausted { .. } => {
                Step::to(JobPhase::TimedOut, status::MAX_RETRIES).ending()
            }
        },
        ObservationEvent::Channel(channel) => match channel {
            ChannelEvent::Opened => Step::to(phase, status::CONNECTED),
            ChannelEvent::Status(message) if message == COMPLETION_SIGNAL => Step::completed(),
            ChannelEvent::Status(message) => Step::to(JobPhase::InProgress, message.clone()),
            ChannelEvent::Malformed => Step::stay(phase),
            ChannelEvent::Error(detail) => {
                Step::to(phase, status::connection_error(detail)).ending()
            }
            ChannelEvent::Closed => Step::to(phase, status::CONNECTION_CLOSED).ending(),
        },
    }
}
