use std::fmt;

/// Identifies one submission attempt. Bumped on every submit so late events
/// from a superseded attempt can be recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Idle,
    Submitted,
    InProgress,
    Completed,
    Failed,
    TimedOut,
}

impl JobPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed | JobPhase::TimedOut)
    }
}

/// How progress is observed after submission. The two are never combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObservationMode {
    #[default]
    Polling,
    Push,
}

/// Reference to the processed output of a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub job_id: String,
    pub url: String,
    pub file_name: String,
}

impl ArtifactRef {
    pub fn for_job(endpoint: &str, job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            url: format!("{}/download/{}", endpoint.trim_end_matches('/'), job_id),
            file_name: artifact_file_name(job_id),
        }
    }
}

/// Local file name for a job's artifact: `processed_{job_id}.mp4`, with any
/// character that is unsafe in a path replaced by `_`.
pub fn artifact_file_name(job_id: &str) -> String {
    let safe: String = job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("processed_{safe}.mp4")
}
