use vidjob_core::{
    status, update, DownloadProgressView, Effect, Msg, ObservationEvent, ObservationMode,
    PollEvent, SessionId, SessionState,
};

const SESSION: SessionId = SessionId(1);

fn completed_state() -> SessionState {
    client_logging::initialize_for_tests();
    let state = SessionState::with_inputs("https://api.example.com/", ObservationMode::Polling);
    let (state, _) = update(
        state,
        Msg::SourceChanged("https://youtu.be/abc123".to_string()),
    );
    let (state, _) = update(state, Msg::SubmitClicked);
    let (state, _) = update(state, Msg::SubmissionAccepted { session: SESSION });
    let (state, _) = update(
        state,
        Msg::Observed {
            session: SESSION,
            event: ObservationEvent::Poll(PollEvent::Completed),
        },
    );
    state
}

fn start_download_effect() -> Effect {
    Effect::StartDownload {
        session: SESSION,
        endpoint: "https://api.example.com/".to_string(),
        job_id: "abc123".to_string(),
        file_name: "processed_abc123.mp4".to_string(),
    }
}

#[test]
fn download_is_ignored_until_artifact_is_ready() {
    client_logging::initialize_for_tests();
    let state = SessionState::with_inputs("https://api.example.com", ObservationMode::Polling);
    let (next, effects) = update(state.clone(), Msg::DownloadClicked);

    assert!(effects.is_empty());
    assert_eq!(next, state);
}

#[test]
fn artifact_url_tolerates_trailing_slash_on_endpoint() {
    let state = completed_state();
    let artifact = state.view().artifact.expect("artifact ready");
    assert_eq!(artifact.url, "https://api.example.com/download/abc123");
}

#[test]
fn reentrant_download_is_suppressed_until_finished() {
    let state = completed_state();

    let (state, effects) = update(state, Msg::DownloadClicked);
    assert_eq!(effects, vec![start_download_effect()]);
    assert!(state.view().downloading);

    let (state, effects) = update(state, Msg::DownloadClicked);
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        Msg::DownloadFinished {
            session: SESSION,
            result: Ok("output/processed_abc123.mp4".to_string()),
        },
    );
    let view = state.view();
    assert!(!view.downloading);
    assert_eq!(view.status, "Saved to output/processed_abc123.mp4");
    assert_eq!(view.saved_path.as_deref(), Some("output/processed_abc123.mp4"));

    let (_state, effects) = update(state, Msg::DownloadClicked);
    assert_eq!(effects, vec![start_download_effect()]);
}

#[test]
fn failed_download_clears_guard_for_retry() {
    let state = completed_state();
    let (state, _) = update(state, Msg::DownloadClicked);

    let (state, effects) = update(
        state,
        Msg::DownloadFinished {
            session: SESSION,
            result: Err("http status 500".to_string()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.status(), status::DOWNLOAD_FAILED);
    assert!(!state.view().downloading);
    assert!(state.view().download_ready);

    let (_state, effects) = update(state, Msg::DownloadClicked);
    assert_eq!(effects, vec![start_download_effect()]);
}

#[test]
fn progress_reports_fraction_when_total_known() {
    let state = completed_state();
    let (state, _) = update(state, Msg::DownloadClicked);
    assert_eq!(state.status(), "Downloading... 0 bytes");

    let (state, _) = update(
        state,
        Msg::DownloadProgress {
            session: SESSION,
            received: 512,
            total: Some(2048),
        },
    );
    assert_eq!(state.status(), "Downloading... 25%");
    assert_eq!(
        state.view().download_progress,
        Some(DownloadProgressView {
            received: 512,
            total: Some(2048)
        })
    );

    let (state, _) = update(
        state,
        Msg::DownloadProgress {
            session: SESSION,
            received: 4096,
            total: None,
        },
    );
    assert_eq!(state.status(), "Downloading... 4096 bytes");
}

#[test]
fn progress_without_running_download_is_ignored() {
    let mut state = completed_state();
    state.consume_dirty();
    let before = state.clone();

    let (next, _) = update(
        state,
        Msg::DownloadProgress {
            session: SESSION,
            received: 1,
            total: None,
        },
    );
    assert_eq!(next, before);
}
