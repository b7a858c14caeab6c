//! User-facing status texts. Every observation replaces the current one.

pub const MISSING_ENDPOINT: &str = "Please provide the API base URL.";
pub const INVALID_SOURCE: &str = "Invalid YouTube URL. Please check and try again.";
pub const SUBMITTING: &str = "Submitting...";
pub const SUBMISSION_FAILED: &str = "Error starting process. Please try again.";
pub const PROCESSING_STARTED: &str = "Processing started...";
pub const PROCESSING: &str = "Processing... Please wait.";
pub const COMPLETED: &str = "Processing completed. You can download the video now.";
pub const MAX_RETRIES: &str = "Max retries reached. Please try again later.";
pub const CONNECTED: &str = "Connected. Waiting for progress...";
pub const CONNECTION_CLOSED: &str = "Connection closed.";
pub const DOWNLOAD_FAILED: &str = "Download failed";
pub const UNKNOWN_ERROR: &str = "unknown error";

pub fn job_error(reason: &str) -> String {
    format!("Error: {reason}")
}

pub fn retrying(attempt: u32) -> String {
    format!("Continue Checking... {attempt}")
}

pub fn connection_error(detail: &str) -> String {
    format!("Connection error: {detail}")
}

pub fn downloading(received: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => {
            let pct = (received.min(total) as f64 / total as f64) * 100.0;
            format!("Downloading... {pct:.0}%")
        }
        _ => format!("Downloading... {received} bytes"),
    }
}

pub fn saved_to(path: &str) -> String {
    format!("Saved to {path}")
}
