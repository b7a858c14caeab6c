use std::env;
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Local;
use client_logging::{client_debug, client_info, client_warn, level_for_verbosity};
use vidjob_core::{update, Effect, Msg, SessionId, SessionState};

use super::cli::Cli;
use super::config::{self, TOKEN_ENV};
use super::effects::EffectRunner;
use super::logging::{self, LogDestination};
use super::ui::input::{parse_line, Command, USAGE};
use super::ui::render::{describe, stamp, Renderer};

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Everything the main loop reacts to.
pub(crate) enum Incoming {
    Core(Msg),
    Command(Command),
    InputClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    let config = config::resolve(&cli, env::var(TOKEN_ENV).ok()).context("loading configuration")?;
    logging::initialize(
        LogDestination::from_flag(cli.log_file),
        level_for_verbosity(cli.verbose),
    );
    client_info!(
        "vidjob starting: endpoint {:?}, {:?} observation, output {:?}",
        config.api_url,
        config.mode,
        config.output_dir
    );

    let (inbox_tx, inbox_rx) = mpsc::channel::<Incoming>();
    let runner =
        EffectRunner::new(config.engine_settings(), inbox_tx.clone()).context("starting engine")?;
    spawn_stdin_reader(inbox_tx.clone());

    // Background tick to flush rate-limited progress lines.
    thread::spawn(move || {
        while inbox_tx.send(Incoming::Core(Msg::Tick)).is_ok() {
            thread::sleep(TICK_INTERVAL);
        }
    });

    let state = SessionState::with_inputs(
        config.api_url.clone().unwrap_or_default(),
        config.observation_mode(),
    );
    let mut session = AppSession::new(state, cli.download, io::stdout());

    if let Some(url) = cli.video_url {
        let (effects, _) = session.handle(Incoming::Command(Command::Submit(url)));
        runner.enqueue(effects);
    }

    while let Ok(incoming) = inbox_rx.recv() {
        let (effects, flow) = session.handle(incoming);
        runner.enqueue(effects);
        if flow == Flow::Exit {
            break;
        }
    }

    runner.shutdown();
    Ok(())
}

fn spawn_stdin_reader(inbox: mpsc::Sender<Incoming>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    client_warn!("Reading stdin failed: {}", err);
                    break;
                }
            };
            if inbox.send(Incoming::Command(parse_line(&line))).is_err() {
                return;
            }
        }
        let _ = inbox.send(Incoming::InputClosed);
    });
}

/// Owns the session state on the main thread and turns incoming messages,
/// prompt commands and ticks into effects and status lines.
pub(crate) struct AppSession<W: Write> {
    state: SessionState,
    renderer: Renderer,
    out: W,
    download_on_complete: bool,
    auto_downloaded: Option<SessionId>,
    input_closed: bool,
}

impl<W: Write> AppSession<W> {
    pub(crate) fn new(state: SessionState, download_on_complete: bool, out: W) -> Self {
        Self {
            state,
            renderer: Renderer::default(),
            out,
            download_on_complete,
            auto_downloaded: None,
            input_closed: false,
        }
    }

    pub(crate) fn handle(&mut self, incoming: Incoming) -> (Vec<Effect>, Flow) {
        let tick = matches!(incoming, Incoming::Core(Msg::Tick));
        let mut effects = Vec::new();

        match incoming {
            Incoming::Core(msg) => effects.extend(self.dispatch(msg)),
            Incoming::Command(command) => match command {
                Command::Submit(url) => {
                    effects.extend(self.dispatch(Msg::SourceChanged(url)));
                    effects.extend(self.dispatch(Msg::SubmitClicked));
                }
                Command::Endpoint(url) => {
                    effects.extend(self.dispatch(Msg::EndpointChanged(url)));
                    let line = format!("Endpoint set to {}", self.state.view().endpoint);
                    self.print(&line);
                }
                Command::Download => {
                    if !self.state.view().download_ready {
                        self.print("Nothing to download yet.");
                    }
                    effects.extend(self.dispatch(Msg::DownloadClicked));
                }
                Command::Status => {
                    let text = describe(&self.state.view());
                    self.print(&text);
                }
                Command::Quit => return (effects, Flow::Exit),
                Command::Empty => {}
                Command::Unknown(line) => {
                    self.print(&format!("Unrecognized command {line:?}; {USAGE}"));
                }
            },
            Incoming::InputClosed => {
                client_debug!("Input closed; exiting once the session settles");
                self.input_closed = true;
            }
        }

        effects.extend(self.auto_download());
        self.render(tick);

        let flow = if self.input_closed && self.state.view().is_settled() {
            Flow::Exit
        } else {
            Flow::Continue
        };
        (effects, flow)
    }

    fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        effects
    }

    /// Requests the download once per session when `--download` is set.
    fn auto_download(&mut self) -> Vec<Effect> {
        if !self.download_on_complete {
            return Vec::new();
        }
        let view = self.state.view();
        if !view.download_ready || view.downloading || self.auto_downloaded == Some(view.session) {
            return Vec::new();
        }
        self.auto_downloaded = Some(view.session);
        client_info!("Session {} downloading artifact automatically", view.session);
        self.dispatch(Msg::DownloadClicked)
    }

    fn render(&mut self, tick: bool) {
        let dirty = self.state.consume_dirty();
        if !dirty && !tick {
            return;
        }
        if let Some(line) = self.renderer.render(&self.state.view(), Instant::now()) {
            self.print(&stamp(Local::now(), &line));
        }
    }

    fn print(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}") {
            client_warn!("Writing to stdout failed: {}", err);
        }
    }
}
