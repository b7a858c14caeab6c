use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use vidjob_core::{JobPhase, ObservationMode, SessionView};

/// Minimum spacing between two download-progress lines.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

pub fn status_line(view: &SessionView) -> String {
    let phase_label = phase_label(view.phase);
    match &view.job_id {
        Some(job_id) => format!(
            "{} {} [{}] {}",
            view.session, job_id, phase_label, view.status
        ),
        None => format!("{} [{}] {}", view.session, phase_label, view.status),
    }
}

pub fn stamp(now: DateTime<Local>, line: &str) -> String {
    format!("{} {}", now.format("%H:%M:%S"), line)
}

/// Full session summary for the `status` command.
pub fn describe(view: &SessionView) -> String {
    let mode = match view.mode {
        ObservationMode::Polling => "polling",
        ObservationMode::Push => "push channel",
    };
    let endpoint = if view.endpoint.is_empty() {
        "(not set)"
    } else {
        view.endpoint.as_str()
    };

    let mut lines = vec![
        format!("Session:   {}", view.session),
        format!("Endpoint:  {endpoint}"),
        format!("Observing: {mode}{}", if view.observing { " (active)" } else { "" }),
        format!("Phase:     {}", phase_label(view.phase)),
        format!("Status:    {}", view.status),
    ];
    if let Some(job_id) = &view.job_id {
        lines.push(format!("Job:       {job_id}"));
    }
    if let Some(artifact) = &view.artifact {
        lines.push(format!("Artifact:  {}", artifact.url));
    }
    if let Some(path) = &view.saved_path {
        lines.push(format!("Saved:     {path}"));
    }
    lines.join("\n")
}

fn phase_label(phase: JobPhase) -> &'static str {
    match phase {
        JobPhase::Idle => "idle",
        JobPhase::Submitted => "submitted",
        JobPhase::InProgress => "in progress",
        JobPhase::Completed => "completed",
        JobPhase::Failed => "failed",
        JobPhase::TimedOut => "timed out",
    }
}

/// Decides which status lines reach the terminal: repeats are dropped and
/// download progress is rate limited.
#[derive(Debug, Default)]
pub struct Renderer {
    last_line: Option<String>,
    last_at: Option<Instant>,
}

impl Renderer {
    pub fn render(&mut self, view: &SessionView, now: Instant) -> Option<String> {
        let line = status_line(view);
        if self.last_line.as_deref() == Some(line.as_str()) {
            return None;
        }
        if view.downloading {
            if let Some(last_at) = self.last_at {
                if now.duration_since(last_at) < PROGRESS_INTERVAL {
                    return None;
                }
            }
        }
        self.last_line = Some(line.clone());
        self.last_at = Some(now);
        Some(line)
    }
}
