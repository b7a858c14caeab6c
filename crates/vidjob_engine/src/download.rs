use std::path::PathBuf;

use client_logging::{client_debug, client_info};
use tokio_util::sync::CancellationToken;

use crate::api::{DownloadMode, JobApi};
use crate::persist::AtomicFileWriter;
use crate::{ApiError, FailureKind, ProgressSink, SessionKey};

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub mode: DownloadMode,
    pub output_dir: PathBuf,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            mode: DownloadMode::default(),
            output_dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub session: SessionKey,
    pub endpoint: String,
    pub job_id: String,
    pub file_name: String,
}

/// Fetches the artifact, then saves it under the output directory.
///
/// Bytes are held in memory until the transfer completes; nothing touches the
/// disk for a failed transfer. `cancel` is checked again on the blocking
/// thread right before the file is written, so a superseded session does not
/// save. A write that has already started runs to completion.
pub async fn download_artifact(
    api: &dyn JobApi,
    request: &DownloadRequest,
    settings: &DownloadSettings,
    cancel: &CancellationToken,
    sink: &dyn ProgressSink,
) -> Result<PathBuf, ApiError> {
    let bytes = api
        .fetch_artifact(
            request.session,
            &request.endpoint,
            &request.job_id,
            settings.mode,
            sink,
        )
        .await?;
    let size = bytes.len();

    let writer = AtomicFileWriter::new(settings.output_dir.clone());
    let file_name = request.file_name.clone();
    let cancel = cancel.clone();
    let saved = tokio::task::spawn_blocking(move || {
        if cancel.is_cancelled() {
            return Err(ApiError::new(FailureKind::Cancelled, "session cancelled before saving"));
        }
        writer
            .write(&file_name, &bytes)
            .map_err(|err| ApiError::new(FailureKind::Persist, err.to_string()))
    })
    .await
    .map_err(|err| ApiError::new(FailureKind::Persist, err.to_string()))?;
    let saved = match saved {
        Ok(path) => path,
        Err(err) => {
            client_debug!("Session {} artifact not saved: {}", request.session, err);
            return Err(err);
        }
    };

    client_info!(
        "Session {} saved {} bytes for job {} to {:?}",
        request.session,
        size,
        request.job_id,
        saved
    );
    Ok(saved)
}
