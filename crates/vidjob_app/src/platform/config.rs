//! Client configuration: an optional RON file overlaid by the environment and
//! the command line.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use client_logging::{client_debug, client_info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vidjob_core::ObservationMode;
use vidjob_engine::{
    ApiSettings, Backoff, DownloadMode, DownloadSettings, EngineSettings, RetryPolicy,
    DEFAULT_TOPIC,
};

use super::cli::Cli;

pub const TOKEN_ENV: &str = "VIDJOB_TOKEN";
const DEFAULT_CONFIG_FILE: &str = "vidjob.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObserveWith {
    #[default]
    Polling,
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownloadStyle {
    SingleShot,
    #[default]
    Streamed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackoffSetting {
    #[default]
    Fixed,
    Exponential { factor: u32, max_delay_secs: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
    pub backoff: BackoffSetting,
}

impl Default for PollConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            delay_secs: policy.delay.as_secs(),
            backoff: BackoffSetting::Fixed,
        }
    }
}

impl PollConfig {
    fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_secs(self.delay_secs),
            backoff: match self.backoff {
                BackoffSetting::Fixed => Backoff::Fixed,
                BackoffSetting::Exponential {
                    factor,
                    max_delay_secs,
                } => Backoff::Exponential {
                    factor,
                    max_delay: Duration::from_secs(max_delay_secs),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub topic: String,
    pub mode: ObserveWith,
    pub download_mode: DownloadStyle,
    pub output_dir: PathBuf,
    pub poll: PollConfig,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let api = ApiSettings::default();
        Self {
            api_url: None,
            token: None,
            topic: DEFAULT_TOPIC.to_string(),
            mode: ObserveWith::default(),
            download_mode: DownloadStyle::default(),
            output_dir: DownloadSettings::default().output_dir,
            poll: PollConfig::default(),
            connect_timeout_secs: api.connect_timeout.as_secs(),
            request_timeout_secs: api.request_timeout.as_secs(),
        }
    }
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        client_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    fn load_if_present(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            client_debug!("No config at {:?}; using defaults", path);
            Ok(Self::default())
        }
    }

    fn apply_env_token(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.token = Some(token);
        }
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(api_url) = &cli.api_url {
            self.api_url = Some(api_url.clone());
        }
        if let Some(token) = &cli.token {
            self.token = Some(token.clone());
        }
        if cli.push {
            self.mode = ObserveWith::Push;
        }
        if cli.single_shot {
            self.download_mode = DownloadStyle::SingleShot;
        }
        if let Some(output) = &cli.output {
            self.output_dir = output.clone();
        }
    }

    pub fn observation_mode(&self) -> ObservationMode {
        match self.mode {
            ObserveWith::Polling => ObservationMode::Polling,
            ObserveWith::Push => ObservationMode::Push,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            api: ApiSettings {
                bearer_token: self.token.clone(),
                topic: self.topic.clone(),
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                ..ApiSettings::default()
            },
            retry: self.poll.policy(),
            download: DownloadSettings {
                mode: match self.download_mode {
                    DownloadStyle::SingleShot => DownloadMode::SingleShot,
                    DownloadStyle::Streamed => DownloadMode::Streamed,
                },
                output_dir: self.output_dir.clone(),
            },
        }
    }
}

/// Merges defaults, the config file, `VIDJOB_TOKEN` and the command line, in
/// increasing order of precedence. An explicit `--config` must exist.
pub fn resolve(cli: &Cli, env_token: Option<String>) -> Result<ClientConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::load_if_present(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    config.apply_env_token(env_token);
    config.apply_cli(cli);
    Ok(config)
}
