use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Debug, Default, Parser)]
#[command(name = "vidjob")]
#[command(version, about = "Submit a video for processing, follow the job and save the result")]
pub struct Cli {
    /// Video to submit right away
    pub video_url: Option<String>,

    /// Service endpoint, e.g. https://api.example.com
    #[arg(short = 'a', long = "api-url", value_name = "URL")]
    pub api_url: Option<String>,

    /// Bearer credential for progress and download requests
    #[arg(short, long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Observe through the push channel instead of polling
    #[arg(long)]
    pub push: bool,

    /// Download in one read instead of streaming
    #[arg(long)]
    pub single_shot: bool,

    /// Artifact directory
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// RON config file (./vidjob.ron is read when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request the download as soon as the job completes
    #[arg(long)]
    pub download: bool,

    /// Raise log level (info, debug, trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Also write ./vidjob.log
    #[arg(long)]
    pub log_file: bool,
}
