mod common;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use common::{init_logging, TestSink};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use vidjob_engine::{
    poll_until_terminal, ApiError, Backoff, DownloadMode, EngineEvent, FailureKind, JobApi,
    PollEnd, PollOutcome, ProgressSink, RetryPolicy, SessionKey,
};

/// Answers progress checks from a script; once the script runs dry every
/// answer is the fallback.
struct ScriptedApi {
    script: Mutex<VecDeque<PollOutcome>>,
    fallback: PollOutcome,
    checks: AtomicU32,
    checked_at: Mutex<Vec<Instant>>,
}

impl ScriptedApi {
    fn new(script: Vec<PollOutcome>, fallback: PollOutcome) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            checks: AtomicU32::new(0),
            checked_at: Mutex::new(Vec::new()),
        }
    }

    fn checks(&self) -> u32 {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl JobApi for ScriptedApi {
    async fn submit(&self, _endpoint: &str, _video_url: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn check_progress(&self, _endpoint: &str, _job_id: &str) -> PollOutcome {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.checked_at.lock().unwrap().push(Instant::now());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn fetch_artifact(
        &self,
        _session: SessionKey,
        _endpoint: &str,
        _job_id: &str,
        _mode: DownloadMode,
        _sink: &dyn ProgressSink,
    ) -> Result<Bytes, ApiError> {
        Ok(Bytes::new())
    }
}

fn pending() -> PollOutcome {
    PollOutcome::Pending {
        status: "processing".to_string(),
    }
}

fn transient() -> PollOutcome {
    PollOutcome::Transient(ApiError {
        kind: FailureKind::HttpStatus(502),
        message: "502 Bad Gateway".to_string(),
    })
}

async fn run(api: &ScriptedApi, policy: RetryPolicy, sink: &TestSink) -> PollEnd {
    let cancel = CancellationToken::new();
    poll_until_terminal(api, 4, "http://svc", "abc123", &policy, &cancel, sink).await
}

#[tokio::test(start_paused = true)]
async fn completed_stops_polling_immediately() {
    init_logging();
    let api = ScriptedApi::new(vec![pending(), transient(), PollOutcome::Completed], pending());
    let sink = TestSink::new();

    let end = run(&api, RetryPolicy::default(), &sink).await;

    assert_eq!(end, PollEnd::Terminal { attempts: 3 });
    assert_eq!(api.checks(), 3);
    let events = sink.take();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events.last(),
        Some(&EngineEvent::Polled {
            session: 4,
            attempt: 3,
            outcome: PollOutcome::Completed,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn server_error_status_stops_polling() {
    init_logging();
    let failed = PollOutcome::Failed {
        reason: Some("X".to_string()),
    };
    let api = ScriptedApi::new(vec![pending(), failed.clone()], pending());
    let sink = TestSink::new();

    let end = run(&api, RetryPolicy::default(), &sink).await;

    assert_eq!(end, PollEnd::Terminal { attempts: 2 });
    assert_eq!(api.checks(), 2);
    assert!(matches!(
        sink.take().last(),
        Some(EngineEvent::Polled { outcome, .. }) if *outcome == failed
    ));
}

#[tokio::test(start_paused = true)]
async fn budget_of_1000_is_never_exceeded() {
    init_logging();
    let api = ScriptedApi::new(Vec::new(), transient());
    let sink = TestSink::new();

    let end = run(&api, RetryPolicy::default(), &sink).await;

    assert_eq!(end, PollEnd::Exhausted { attempts: 1000 });
    assert_eq!(api.checks(), 1000);
    let events = sink.take();
    assert_eq!(events.len(), 1001);
    assert_eq!(
        events.last(),
        Some(&EngineEvent::PollingExhausted {
            session: 4,
            attempts: 1000
        })
    );
    assert!(matches!(
        events[999],
        EngineEvent::Polled { attempt: 1000, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn each_check_waits_the_policy_delay_first() {
    init_logging();
    let api = ScriptedApi::new(Vec::new(), pending());
    let sink = TestSink::new();
    let start = Instant::now();

    run(&api, RetryPolicy::fixed(3, Duration::from_secs(20)), &sink).await;

    let offsets: Vec<Duration> = api
        .checked_at
        .lock()
        .unwrap()
        .iter()
        .map(|at| at.duration_since(start))
        .collect();
    assert_eq!(
        offsets,
        vec![
            Duration::from_secs(20),
            Duration::from_secs(40),
            Duration::from_secs(60)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn exponential_backoff_spaces_checks() {
    init_logging();
    let api = ScriptedApi::new(Vec::new(), transient());
    let sink = TestSink::new();
    let start = Instant::now();
    let policy = RetryPolicy {
        max_attempts: 4,
        delay: Duration::from_secs(1),
        backoff: Backoff::Exponential {
            factor: 3,
            max_delay: Duration::from_secs(5),
        },
    };

    run(&api, policy, &sink).await;

    let offsets: Vec<u64> = api
        .checked_at
        .lock()
        .unwrap()
        .iter()
        .map(|at| at.duration_since(start).as_secs())
        .collect();
    assert_eq!(offsets, vec![1, 4, 9, 14]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_the_loop_silently() {
    init_logging();
    let api = Arc::new(ScriptedApi::new(Vec::new(), pending()));
    let sink = TestSink::new();
    let cancel = CancellationToken::new();

    let task = {
        let api = api.clone();
        let sink = sink.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let policy = RetryPolicy::default();
            poll_until_terminal(api.as_ref(), 1, "http://svc", "abc", &policy, &cancel, &sink)
                .await
        })
    };

    // Two checks happen at 20s and 40s; cancel before the third.
    tokio::time::sleep(Duration::from_secs(50)).await;
    cancel.cancel();
    let end = task.await.unwrap();

    assert_eq!(end, PollEnd::Cancelled { attempts: 2 });
    assert_eq!(api.checks(), 2);
    assert_eq!(sink.len(), 2);

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(api.checks(), 2);
}
