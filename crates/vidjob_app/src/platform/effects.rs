use std::sync::mpsc;
use std::thread;

use client_logging::{client_debug, client_info};
use vidjob_core::{ChannelEvent, Effect, Msg, ObservationEvent, PollEvent, SessionId};
use vidjob_engine::{
    ApiError, ChannelSignal, DownloadRequest, EngineEvent, EngineHandle, EngineSettings,
    PollOutcome,
};

use super::app::Incoming;

/// Runs core effects on the engine and feeds engine events back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(settings: EngineSettings, inbox: mpsc::Sender<Incoming>) -> Result<Self, ApiError> {
        client_debug!("Starting engine with {:?}", settings);
        let (engine, events) = EngineHandle::spawn(settings)?;
        spawn_event_pump(events, inbox);
        Ok(Self { engine })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CancelSession { session } => self.engine.cancel_session(session.0),
                Effect::OpenChannel {
                    session,
                    endpoint,
                    job_id,
                } => self.engine.open_channel(session.0, endpoint, job_id),
                Effect::SubmitJob {
                    session,
                    endpoint,
                    video_url,
                } => self.engine.submit(session.0, endpoint, video_url),
                Effect::StartPolling {
                    session,
                    endpoint,
                    job_id,
                } => self.engine.start_polling(session.0, endpoint, job_id),
                Effect::EndObservation { session } => self.engine.end_observation(session.0),
                Effect::StartDownload {
                    session,
                    endpoint,
                    job_id,
                    file_name,
                } => self.engine.download(DownloadRequest {
                    session: session.0,
                    endpoint,
                    job_id,
                    file_name,
                }),
            }
        }
    }

    pub fn shutdown(&self) {
        client_info!("Stopping engine");
        self.engine.shutdown();
    }
}

fn spawn_event_pump(events: mpsc::Receiver<EngineEvent>, inbox: mpsc::Sender<Incoming>) {
    thread::spawn(move || {
        for event in events {
            if inbox.send(Incoming::Core(map_event(event))).is_err() {
                break;
            }
        }
        client_debug!("Engine event stream closed");
    });
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::SubmissionFinished { session, result } => match result {
            Ok(()) => Msg::SubmissionAccepted {
                session: SessionId(session),
            },
            Err(err) => Msg::SubmissionFailed {
                session: SessionId(session),
                message: err.to_string(),
            },
        },
        EngineEvent::Polled {
            session,
            attempt,
            outcome,
        } => Msg::Observed {
            session: SessionId(session),
            event: ObservationEvent::Poll(match outcome {
                PollOutcome::Pending { .. } => PollEvent::Pending,
                PollOutcome::Completed => PollEvent::Completed,
                PollOutcome::Failed { reason } => PollEvent::Failed { reason },
                PollOutcome::Transient(_) => PollEvent::Transient { attempt },
            }),
        },
        EngineEvent::PollingExhausted { session, attempts } => Msg::Observed {
            session: SessionId(session),
            event: ObservationEvent::Poll(PollEvent::Exhausted { attempts }),
        },
        EngineEvent::Channel { session, signal } => Msg::Observed {
            session: SessionId(session),
            event: ObservationEvent::Channel(match signal {
                ChannelSignal::Opened => ChannelEvent::Opened,
                ChannelSignal::Status(message) => ChannelEvent::Status(message),
                ChannelSignal::Malformed(_) => ChannelEvent::Malformed,
                ChannelSignal::Error(message) => ChannelEvent::Error(message),
                ChannelSignal::Closed => ChannelEvent::Closed,
            }),
        },
        EngineEvent::DownloadProgress {
            session,
            received,
            total,
        } => Msg::DownloadProgress {
            session: SessionId(session),
            received,
            total,
        },
        EngineEvent::DownloadFinished { session, result } => Msg::DownloadFinished {
            session: SessionId(session),
            result: result
                .map(|path| path.display().to_string())
                .map_err(|err| err.to_string()),
        },
    }
}
