use client_logging::{client_debug, client_info, client_warn};
use tokio_util::sync::CancellationToken;

use crate::api::JobApi;
use crate::retry::RetryPolicy;
use crate::{EngineEvent, PollOutcome, ProgressSink, SessionKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEnd {
    Terminal { attempts: u32 },
    Exhausted { attempts: u32 },
    Cancelled { attempts: u32 },
}

/// Polls `job_id` until the server reports a terminal status, the budget in
/// `policy` runs out, or `cancel` fires. Each attempt waits first, then
/// checks once. Nothing is emitted after cancellation.
pub async fn poll_until_terminal(
    api: &dyn JobApi,
    session: SessionKey,
    endpoint: &str,
    job_id: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    sink: &dyn ProgressSink,
) -> PollEnd {
    for attempt in 1..=policy.max_attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                client_debug!("Session {} polling cancelled before attempt {}", session, attempt);
                return PollEnd::Cancelled { attempts: attempt - 1 };
            }
            _ = tokio::time::sleep(policy.delay_for(attempt)) => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                client_debug!("Session {} polling cancelled during attempt {}", session, attempt);
                return PollEnd::Cancelled { attempts: attempt };
            }
            outcome = api.check_progress(endpoint, job_id) => outcome,
        };

        match &outcome {
            PollOutcome::Transient(err) => {
                client_warn!(
                    "Session {} progress check {}/{} failed: {}",
                    session,
                    attempt,
                    policy.max_attempts,
                    err
                );
            }
            PollOutcome::Pending { status } => {
                client_debug!("Session {} job {} status {:?}", session, job_id, status);
            }
            PollOutcome::Completed | PollOutcome::Failed { .. } => {
                client_info!(
                    "Session {} job {} finished after {} checks",
                    session,
                    job_id,
                    attempt
                );
            }
        }

        let terminal = outcome.is_terminal();
        sink.emit(EngineEvent::Polled {
            session,
            attempt,
            outcome,
        });
        if terminal {
            return PollEnd::Terminal { attempts: attempt };
        }
    }

    client_warn!(
        "Session {} job {} still pending after {} checks",
        session,
        job_id,
        policy.max_attempts
    );
    sink.emit(EngineEvent::PollingExhausted {
        session,
        attempts: policy.max_attempts,
    });
    PollEnd::Exhausted {
        attempts: policy.max_attempts,
    }
}
