use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use client_logging::{client_debug, client_error, client_info, client_warn};
use tokio::sync::mpsc as async_mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::api::{ApiSettings, JobApi, ReqwestJobApi};
use crate::download::{download_artifact, DownloadRequest, DownloadSettings};
use crate::poll::poll_until_terminal;
use crate::push::listen;
use crate::retry::RetryPolicy;
use crate::sink::{ChannelProgressSink, ProgressSink};
use crate::{ApiError, EngineEvent, SessionKey};

/// How long shutdown waits for tasks to close their sockets.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub api: ApiSettings,
    pub retry: RetryPolicy,
    pub download: DownloadSettings,
}

enum EngineCommand {
    Submit {
        session: SessionKey,
        endpoint: String,
        video_url: String,
    },
    StartPolling {
        session: SessionKey,
        endpoint: String,
        job_id: String,
    },
    OpenChannel {
        session: SessionKey,
        endpoint: String,
        job_id: String,
    },
    EndObservation {
        session: SessionKey,
    },
    CancelSession {
        session: SessionKey,
    },
    Download(DownloadRequest),
    Shutdown,
}

/// Per-session cancellation. Observation tasks hang off a child token so
/// ending observation leaves a download running; cancelling the root stops
/// everything.
struct SessionTokens {
    root: CancellationToken,
    observation: CancellationToken,
}

impl SessionTokens {
    fn new() -> Self {
        let root = CancellationToken::new();
        let observation = root.child_token();
        Self { root, observation }
    }
}

/// Handle to the engine thread. Cheap to clone; dropping every clone shuts
/// the engine down without waiting for it.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: async_mpsc::UnboundedSender<EngineCommand>,
    thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EngineHandle {
    /// Starts the engine on its own thread with the HTTP client from `settings`.
    pub fn spawn(
        settings: EngineSettings,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>), ApiError> {
        let api: Arc<dyn JobApi> = Arc::new(ReqwestJobApi::new(settings.api.clone())?);
        Self::spawn_with_api(api, settings)
    }

    /// Starts the engine with a caller-supplied API implementation.
    pub fn spawn_with_api(
        api: Arc<dyn JobApi>,
        settings: EngineSettings,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>), ApiError> {
        let (cmd_tx, cmd_rx) = async_mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| ApiError::new(crate::FailureKind::Network, err.to_string()))?;

        let thread = thread::Builder::new()
            .name("vidjob-engine".to_string())
            .spawn(move || {
                runtime.block_on(run(api, settings, cmd_rx, event_tx));
            })
            .map_err(|err| ApiError::new(crate::FailureKind::Network, err.to_string()))?;

        let handle = Self {
            cmd_tx,
            thread: Arc::new(Mutex::new(Some(thread))),
        };
        Ok((handle, event_rx))
    }

    pub fn submit(
        &self,
        session: SessionKey,
        endpoint: impl Into<String>,
        video_url: impl Into<String>,
    ) {
        self.send(EngineCommand::Submit {
            session,
            endpoint: endpoint.into(),
            video_url: video_url.into(),
        });
    }

    pub fn start_polling(
        &self,
        session: SessionKey,
        endpoint: impl Into<String>,
        job_id: impl Into<String>,
    ) {
        self.send(EngineCommand::StartPolling {
            session,
            endpoint: endpoint.into(),
            job_id: job_id.into(),
        });
    }

    pub fn open_channel(
        &self,
        session: SessionKey,
        endpoint: impl Into<String>,
        job_id: impl Into<String>,
    ) {
        self.send(EngineCommand::OpenChannel {
            session,
            endpoint: endpoint.into(),
            job_id: job_id.into(),
        });
    }

    pub fn end_observation(&self, session: SessionKey) {
        self.send(EngineCommand::EndObservation { session });
    }

    pub fn cancel_session(&self, session: SessionKey) {
        self.send(EngineCommand::CancelSession { session });
    }

    pub fn download(&self, request: DownloadRequest) {
        self.send(EngineCommand::Download(request));
    }

    /// Cancels all sessions and blocks until the engine thread has exited.
    /// Push channels get a short grace period to send their close frames.
    pub fn shutdown(&self) {
        self.send(EngineCommand::Shutdown);

        let thread = match self.thread.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => {
                client_error!("Engine thread handle lock poisoned; not waiting for shutdown");
                None
            }
        };
        if let Some(thread) = thread {
            if thread.join().is_err() {
                client_error!("Engine thread panicked during shutdown");
            }
        }
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            client_warn!("Engine is no longer running; command dropped");
        }
    }
}

async fn run(
    api: Arc<dyn JobApi>,
    settings: EngineSettings,
    mut cmd_rx: async_mpsc::UnboundedReceiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let settings = Arc::new(settings);
    let tracker = TaskTracker::new();
    let mut sessions: HashMap<SessionKey, SessionTokens> = HashMap::new();

    while let Some(command) = cmd_rx.recv().await {
        match command {
            EngineCommand::Submit {
                session,
                endpoint,
                video_url,
            } => {
                let api = api.clone();
                let sink = ChannelProgressSink::new(event_tx.clone());
                let cancel = tokens_for(&mut sessions, session).root.clone();
                tracker.spawn(async move {
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return,
                        result = api.submit(&endpoint, &video_url) => result,
                    };
                    match &result {
                        Ok(()) => client_info!("Session {} submission accepted", session),
                        Err(err) => client_warn!("Session {} submission failed: {}", session, err),
                    }
                    sink.emit(EngineEvent::SubmissionFinished { session, result });
                });
            }
            EngineCommand::StartPolling {
                session,
                endpoint,
                job_id,
            } => {
                let api = api.clone();
                let settings = settings.clone();
                let sink = ChannelProgressSink::new(event_tx.clone());
                let cancel = tokens_for(&mut sessions, session).observation.clone();
                tracker.spawn(async move {
                    let end = poll_until_terminal(
                        api.as_ref(),
                        session,
                        &endpoint,
                        &job_id,
                        &settings.retry,
                        &cancel,
                        &sink,
                    )
                    .await;
                    client_debug!("Session {} polling ended: {:?}", session, end);
                });
            }
            EngineCommand::OpenChannel {
                session,
                endpoint,
                job_id,
            } => {
                let sink = ChannelProgressSink::new(event_tx.clone());
                let cancel = tokens_for(&mut sessions, session).observation.clone();
                tracker.spawn(async move {
                    let end = listen(session, &endpoint, &job_id, &cancel, &sink).await;
                    client_debug!("Session {} push channel ended: {:?}", session, end);
                });
            }
            EngineCommand::EndObservation { session } => {
                if let Some(tokens) = sessions.get(&session) {
                    tokens.observation.cancel();
                }
            }
            EngineCommand::CancelSession { session } => {
                if let Some(tokens) = sessions.remove(&session) {
                    client_debug!("Session {} cancelled", session);
                    tokens.root.cancel();
                }
            }
            EngineCommand::Download(request) => {
                let api = api.clone();
                let settings = settings.clone();
                let sink = ChannelProgressSink::new(event_tx.clone());
                let cancel = tokens_for(&mut sessions, request.session).root.clone();
                tracker.spawn(async move {
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return,
                        result = download_artifact(
                            api.as_ref(),
                            &request,
                            &settings.download,
                            &cancel,
                            &sink,
                        ) => result,
                    };
                    if let Err(err) = &result {
                        client_warn!("Session {} download failed: {}", request.session, err);
                    }
                    sink.emit(EngineEvent::DownloadFinished {
                        session: request.session,
                        result,
                    });
                });
            }
            EngineCommand::Shutdown => break,
        }
    }

    client_info!("Engine shutting down ({} live sessions)", sessions.len());
    for (_, tokens) in sessions.drain() {
        tokens.root.cancel();
    }
    tracker.close();
    if tokio::time::timeout(SHUTDOWN_GRACE, tracker.wait())
        .await
        .is_err()
    {
        client_error!("Engine tasks did not stop within {:?}", SHUTDOWN_GRACE);
    }
}

fn tokens_for(
    sessions: &mut HashMap<SessionKey, SessionTokens>,
    session: SessionKey,
) -> &SessionTokens {
    sessions.entry(session).or_insert_with(SessionTokens::new)
}
