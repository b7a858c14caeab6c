use client_logging::{client_debug, client_info, client_warn};

use crate::observe::{on_event, ChannelEvent};
use crate::state::ActiveJob;
use crate::{
    status, ArtifactRef, Effect, JobPhase, Msg, ObservationEvent, ObservationMode, SessionId,
    SessionState, SourceRef,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: SessionState, msg: Msg) -> (SessionState, Vec<Effect>) {
    let effects = match msg {
        Msg::EndpointChanged(endpoint) => {
            state.set_endpoint(endpoint);
            Vec::new()
        }
        Msg::SourceChanged(input) => {
            state.set_source_input(input);
            Vec::new()
        }
        Msg::ModeSelected(mode) => {
            state.set_mode(mode);
            Vec::new()
        }
        Msg::SubmitClicked => submit(&mut state),
        Msg::SubmissionAccepted { session } => {
            if !accepts(&state, session, "SubmissionAccepted") {
                return (state, Vec::new());
            }
            submission_accepted(&mut state, session)
        }
        Msg::SubmissionFailed { session, message } => {
            if !accepts(&state, session, "SubmissionFailed") {
                return (state, Vec::new());
            }
            if state.phase().is_terminal() {
                client_warn!(
                    "Session {} submission failed after the job reached {:?}: {}",
                    session,
                    state.phase(),
                    message
                );
            } else {
                client_warn!("Session {} submission failed: {}", session, message);
                state.set_phase(JobPhase::Failed);
                state.set_status(status::SUBMISSION_FAILED);
            }
            end_observation(&mut state, session)
        }
        Msg::Observed { session, event } => {
            if !accepts(&state, session, "Observed") {
                return (state, Vec::new());
            }
            observed(&mut state, session, event)
        }
        Msg::DownloadClicked => download_clicked(&mut state),
        Msg::DownloadProgress {
            session,
            received,
            total,
        } => {
            if accepts(&state, session, "DownloadProgress") && state.downloading() {
                state.apply_download_progress(received, total);
                state.set_status(status::downloading(received, total));
            }
            Vec::new()
        }
        Msg::DownloadFinished { session, result } => {
            if !accepts(&state, session, "DownloadFinished") {
                return (state, Vec::new());
            }
            match result {
                Ok(path) => {
                    client_info!("Session {} artifact saved to {}", session, path);
                    state.set_status(status::saved_to(&path));
                    state.finish_download(Some(path));
                }
                Err(message) => {
                    client_warn!("Session {} download failed: {}", session, message);
                    state.set_status(status::DOWNLOAD_FAILED);
                    state.finish_download(None);
                }
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn accepts(state: &SessionState, session: SessionId, what: &str) -> bool {
    if state.is_current(session) {
        true
    } else {
        client_debug!(
            "Discarding stale {} for session {} (current {})",
            what,
            session,
            state.session()
        );
        false
    }
}

fn submit(state: &mut SessionState) -> Vec<Effect> {
    let mut effects = Vec::new();
    if let Some(superseded) = state.reset_for_submission() {
        client_info!("Session {} superseded by {}", superseded, state.session());
        effects.push(Effect::CancelSession {
            session: superseded,
        });
    }

    let endpoint = state.endpoint().to_string();
    if endpoint.is_empty() {
        client_warn!("Submission rejected: no API base URL");
        state.set_status(status::MISSING_ENDPOINT);
        return effects;
    }

    let source = match SourceRef::parse(state.source_input()) {
        Ok(source) => source,
        Err(err) => {
            client_warn!("Submission rejected: {}", err);
            state.set_status(status::INVALID_SOURCE);
            return effects;
        }
    };

    let session = state.session();
    client_info!(
        "Session {} submitting video {} to {}",
        session,
        source.video_id,
        endpoint
    );

    if state.mode() == ObservationMode::Push {
        effects.push(Effect::OpenChannel {
            session,
            endpoint: endpoint.clone(),
            job_id: source.video_id.clone(),
        });
        state.set_observing(true);
    }
    effects.push(Effect::SubmitJob {
        session,
        endpoint: endpoint.clone(),
        video_url: source.url.clone(),
    });
    state.start_job(ActiveJob { source, endpoint });
    state.set_status(status::SUBMITTING);
    effects
}

fn submission_accepted(state: &mut SessionState, session: SessionId) -> Vec<Effect> {
    let Some(job) = state.job().cloned() else {
        return Vec::new();
    };
    // A push channel may already have reported progress before the POST returned.
    if state.phase() == JobPhase::Idle {
        state.set_phase(JobPhase::Submitted);
        state.set_status(status::PROCESSING_STARTED);
    }
    client_info!("Session {} job {} submitted", session, job.source.video_id);

    match state.mode() {
        ObservationMode::Polling if !state.phase().is_terminal() => {
            state.set_observing(true);
            vec![Effect::StartPolling {
                session,
                endpoint: job.endpoint,
                job_id: job.source.video_id,
            }]
        }
        _ => Vec::new(),
    }
}

fn observed(state: &mut SessionState, session: SessionId, event: ObservationEvent) -> Vec<Effect> {
    let Some(job) = state.job().cloned() else {
        return Vec::new();
    };
    if let ObservationEvent::Channel(ChannelEvent::Malformed) = event {
        client_debug!("Session {} ignoring malformed channel frame", session);
    }

    let before = state.phase();
    let step = on_event(before, &event);
    if step.phase != before {
        client_info!(
            "Session {} job {}: {:?} -> {:?}",
            session,
            job.source.video_id,
            before,
            step.phase
        );
    }
    state.set_phase(step.phase);
    if let Some(text) = step.status {
        state.set_status(text);
    }
    if step.artifact_ready && state.artifact().is_none() {
        state.set_artifact(ArtifactRef::for_job(&job.endpoint, &job.source.video_id));
    }

    if step.end_observation {
        end_observation(state, session)
    } else {
        Vec::new()
    }
}

fn end_observation(state: &mut SessionState, session: SessionId) -> Vec<Effect> {
    if state.observing() {
        state.set_observing(false);
        vec![Effect::EndObservation { session }]
    } else {
        Vec::new()
    }
}

fn download_clicked(state: &mut SessionState) -> Vec<Effect> {
    let Some(artifact) = state.artifact().cloned() else {
        client_debug!("Download ignored: no artifact ready");
        return Vec::new();
    };
    if state.downloading() {
        client_debug!("Download ignored: one is already in flight");
        return Vec::new();
    }
    let Some(job) = state.job() else {
        return Vec::new();
    };
    let endpoint = job.endpoint.clone();

    state.begin_download();
    state.set_status(status::downloading(0, None));
    vec![Effect::StartDownload {
        session: state.session(),
        endpoint,
        job_id: artifact.job_id,
        file_name: artifact.file_name,
    }]
}
