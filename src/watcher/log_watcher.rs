//! Log watcher with notify integration.
//!
//! Runs the tailer and the classification pipeline on one tokio task.
//! Lines are read in bounded bursts on a poll timer; filesystem events
//! only make the next poll happen sooner. Callers talk to the task
//! through a [`WatcherHandle`] and receive [`WatchEvent`]s on a bounded
//! channel.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify_debouncer_full::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::discovery::{candidate_paths, find_first_existing};
use super::error::WatcherError;
use super::tailer::{read_last_lines, LogTailer};
use crate::config::WatchConfig;
use crate::event::RawLine;
use crate::pipeline::{Emitted, Pipeline, PipelineError, SessionFacts, UnknownSnapshot};
use crate::recognizer::{CustomPatternSpec, OverrideError, PatternOverride, PatternSetError};

const COMMAND_BUFFER: usize = 32;
const FS_DEBOUNCE: Duration = Duration::from_millis(100);

/// Connection state reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    Locating,
    Watching,
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Locating => "locating",
            Self::Watching => "watching",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Health and session labels for the host UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WatchStatus {
    pub state: ConnectionState,
    pub path: Option<PathBuf>,
    /// Human readable reason while in [`ConnectionState::Error`].
    pub reason: Option<String>,
    pub facts: SessionFacts,
    /// Lines classified so far.
    pub lines: u64,
    /// Recognizer panics so far.
    pub faults: u64,
}

/// Output of the watcher task.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Game(Emitted),
    /// The log shrank; line continuity is broken.
    Rotated(PathBuf),
    Unknowns(UnknownSnapshot),
}

#[derive(Debug)]
enum Command {
    SetPath(PathBuf),
    SetCustomPatterns {
        specs: Vec<CustomPatternSpec>,
        reply: oneshot::Sender<Result<usize, PatternSetError>>,
    },
    SetCustomEnabled(bool),
    SetPatternOverrides {
        overrides: BTreeMap<String, PatternOverride>,
        reply: oneshot::Sender<Result<usize, OverrideError>>,
    },
    SetCooldown { key: String, window: Duration },
    UnknownSnapshot(oneshot::Sender<UnknownSnapshot>),
    IgnoreUnknown(String),
    ClearUnknowns,
}

/// Control surface of a running watcher.
#[derive(Debug)]
pub struct WatcherHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<WatchStatus>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    async fn send(&self, command: Command) -> Result<(), WatcherError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| WatcherError::ChannelClosed)
    }

    /// Switch to another log file. Correlation state is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::ChannelClosed`] if the watcher has stopped.
    pub async fn set_path(&self, path: PathBuf) -> Result<(), WatcherError> {
        self.send(Command::SetPath(path)).await
    }

    /// Replace the custom pattern set, returning the number of active rules.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Pattern`] for the first invalid entry, in
    /// which case the previous set stays active.
    pub async fn set_custom_patterns(&self, specs: Vec<CustomPatternSpec>) -> Result<usize, WatcherError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetCustomPatterns { specs, reply }).await?;
        let count = rx.await.map_err(|_| WatcherError::ChannelClosed)??;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns [`WatcherError::ChannelClosed`] if the watcher has stopped.
    pub async fn set_custom_enabled(&self, enabled: bool) -> Result<(), WatcherError> {
        self.send(Command::SetCustomEnabled(enabled)).await
    }

    /// Replace the built-in pattern overrides. An empty map restores every
    /// built-in pattern.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Override`] for the first bad entry, in which
    /// case the previous overrides stay active.
    pub async fn set_pattern_overrides(&self, overrides: BTreeMap<String, PatternOverride>) -> Result<usize, WatcherError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetPatternOverrides { overrides, reply }).await?;
        let count = rx.await.map_err(|_| WatcherError::ChannelClosed)??;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns [`WatcherError::ChannelClosed`] if the watcher has stopped.
    pub async fn set_cooldown(&self, key: impl Into<String>, window: Duration) -> Result<(), WatcherError> {
        self.send(Command::SetCooldown {
            key: key.into(),
            window,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`WatcherError::ChannelClosed`] if the watcher has stopped.
    pub async fn unknown_snapshot(&self) -> Result<UnknownSnapshot, WatcherError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::UnknownSnapshot(reply)).await?;
        rx.await.map_err(|_| WatcherError::ChannelClosed)
    }

    /// Stop grouping a signature. A fresh snapshot is published.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::ChannelClosed`] if the watcher has stopped.
    pub async fn ignore_unknown(&self, key: impl Into<String>) -> Result<(), WatcherError> {
        self.send(Command::IgnoreUnknown(key.into())).await
    }

    /// # Errors
    ///
    /// Returns [`WatcherError::ChannelClosed`] if the watcher has stopped.
    pub async fn clear_unknowns(&self) -> Result<(), WatcherError> {
        self.send(Command::ClearUnknowns).await
    }

    #[must_use]
    pub fn status(&self) -> WatchStatus {
        self.status.borrow().clone()
    }

    /// A receiver that observes every status change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WatchStatus> {
        self.status.clone()
    }

    /// Stop the task and wait for it to release the file.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Watcher task ended abnormally");
        }
    }
}

/// The watcher task state.
pub struct LogWatcher {
    config: WatchConfig,
    pipeline: Pipeline,
    path: Option<PathBuf>,
    tailer: Option<LogTailer>,
    events: mpsc::Sender<WatchEvent>,
    status: watch::Sender<WatchStatus>,
    nudge: mpsc::Sender<()>,
    cancel: CancellationToken,
    lines: u64,
    /// The filesystem watch must follow a newly attached path.
    rearm: bool,
}

impl LogWatcher {
    /// Start watching on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the first custom pattern or pattern override in `config`
    /// that is invalid.
    pub fn spawn(config: WatchConfig) -> Result<(WatcherHandle, mpsc::Receiver<WatchEvent>), PipelineError> {
        let pipeline = Pipeline::new(&config)?;
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (nudge_tx, nudge_rx) = mpsc::channel(1);
        let (status_tx, status_rx) = watch::channel(WatchStatus::default());
        let cancel = CancellationToken::new();

        let watcher = Self {
            path: config.log_path.clone(),
            config,
            pipeline,
            tailer: None,
            events: event_tx,
            status: status_tx,
            nudge: nudge_tx,
            cancel: cancel.clone(),
            lines: 0,
            rearm: false,
        };
        let task = tokio::spawn(watcher.run(command_rx, nudge_rx));

        Ok((
            WatcherHandle {
                commands: command_tx,
                status: status_rx,
                cancel,
                task,
            },
            event_rx,
        ))
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>, mut nudges: mpsc::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut fs_watch = None;

        self.set_state(ConnectionState::Locating, None);
        let mut running = self.attach().await;
        while running {
            if self.rearm {
                self.rearm = false;
                fs_watch = self.arm_fs_events();
            }

            running = tokio::select! {
                biased;
                () = self.cancel.cancelled() => false,
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => false,
                },
                Some(()) = nudges.recv() => self.poll().await,
                _ = ticker.tick() => self.poll().await,
            };
        }

        drop(fs_watch);
        self.tailer = None;
        self.status.send_modify(|s| {
            s.state = ConnectionState::Idle;
            s.reason = None;
        });
        tracing::debug!("Watcher stopped");
    }

    fn arm_fs_events(&self) -> Option<impl Send> {
        if !self.config.fs_events {
            return None;
        }
        let path = self.tailer.as_ref()?.path();
        match watch_fs(path, self.nudge.clone()) {
            Ok(guard) => Some(guard),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Filesystem events unavailable, polling only");
                None
            }
        }
    }

    /// Handle a command. Returns `false` once the event channel is closed.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::SetPath(path) => {
                tracing::info!(path = %path.display(), "Log path changed");
                self.path = Some(path);
                self.tailer = None;
                self.pipeline.reset();
                self.set_state(ConnectionState::Locating, None);
                return self.attach().await;
            }
            Command::SetCustomPatterns { specs, reply } => {
                let result = self.pipeline.set_custom_patterns(&specs);
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "Rejected custom pattern set");
                }
                let _ = reply.send(result);
            }
            Command::SetCustomEnabled(enabled) => self.pipeline.set_custom_enabled(enabled),
            Command::SetPatternOverrides { overrides, reply } => {
                let result = self.pipeline.set_pattern_overrides(&overrides);
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "Rejected pattern overrides");
                }
                let _ = reply.send(result);
            }
            Command::SetCooldown { key, window } => {
                tracing::debug!(alert = %key, window = ?window, "Cooldown set");
                self.pipeline.set_cooldown(key, window);
            }
            Command::UnknownSnapshot(reply) => {
                let _ = reply.send(self.pipeline.unknown_snapshot());
            }
            Command::IgnoreUnknown(key) => {
                let snapshot = self.pipeline.ignore_unknown(&key);
                return self.emit(WatchEvent::Unknowns(snapshot)).await;
            }
            Command::ClearUnknowns => {
                let snapshot = self.pipeline.clear_unknowns();
                return self.emit(WatchEvent::Unknowns(snapshot)).await;
            }
        }
        true
    }

    /// Resolve the log path, optionally backfill, and start tailing from the
    /// end of the file. Failure is reported through status and retried on
    /// the next poll. Returns `false` once the event channel is closed.
    async fn attach(&mut self) -> bool {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => {
                let candidates = candidate_paths();
                match find_first_existing(&candidates) {
                    Some(found) => found,
                    None => {
                        self.report(&WatcherError::NotFound {
                            searched: candidates.len(),
                        });
                        return !self.events.is_closed();
                    }
                }
            }
        };

        let tailer = if self.config.backfill_lines > 0 {
            match read_last_lines(&path, self.config.backfill_lines).await {
                Ok((lines, len)) => {
                    if !self.backfill(&lines).await {
                        return false;
                    }
                    Ok(LogTailer::with_offset(path.clone(), len))
                }
                Err(e) => Err(e),
            }
        } else {
            LogTailer::at_end(path.clone()).await
        };

        match tailer {
            Ok(tailer) => {
                tracing::info!(path = %path.display(), offset = tailer.offset(), "Watching log");
                self.tailer = Some(tailer.with_max_read(self.config.max_read_bytes));
                self.status.send_modify(|s| s.path = Some(path));
                self.set_state(ConnectionState::Watching, None);
                self.rearm = true;
            }
            Err(e) => {
                self.status.send_modify(|s| s.path = Some(path));
                self.report(&e);
            }
        }
        !self.events.is_closed()
    }

    /// Classify historical lines without growing the unknown groups.
    async fn backfill(&mut self, lines: &[RawLine]) -> bool {
        let capture = self.pipeline.capture_unknowns();
        self.pipeline.set_capture_unknowns(false);
        let mut open = true;
        for line in lines {
            if !self.process(&line.text).await {
                open = false;
                break;
            }
        }
        self.pipeline.set_capture_unknowns(capture);
        tracing::info!(lines = lines.len(), "Backfill complete");
        self.publish_progress();
        open
    }

    /// Read one bounded burst. Returns `false` once the event channel is
    /// closed.
    async fn poll(&mut self) -> bool {
        let Some(mut tailer) = self.tailer.take() else {
            return self.attach().await;
        };

        let open = match tailer.read_new_lines().await {
            Ok(batch) => {
                if self.status.borrow().state != ConnectionState::Watching {
                    tracing::info!(path = %tailer.path().display(), "Log available again");
                    self.set_state(ConnectionState::Watching, None);
                }
                let mut open = true;
                if batch.rotated {
                    let restart = self.pipeline.rotate();
                    open = self.emit(WatchEvent::Rotated(tailer.path().to_path_buf())).await
                        && self.emit(WatchEvent::Game(restart)).await;
                }
                for line in &batch.lines {
                    if !open {
                        break;
                    }
                    open = self.process(&line.text).await;
                }
                if batch.remaining > 0 {
                    let _ = self.nudge.try_send(());
                }
                if !batch.lines.is_empty() || batch.rotated {
                    self.publish_progress();
                }
                open
            }
            Err(e) => {
                self.report(&e);
                !self.events.is_closed()
            }
        };

        self.tailer = Some(tailer);
        open
    }

    async fn process(&mut self, text: &str) -> bool {
        let outcome = self.pipeline.process_line(text, Instant::now());
        self.lines += 1;
        for emitted in outcome.events {
            if !self.emit(WatchEvent::Game(emitted)).await {
                return false;
            }
        }
        if outcome.snapshot_due {
            return self.emit(WatchEvent::Unknowns(self.pipeline.unknown_snapshot())).await;
        }
        true
    }

    /// Send an event, giving up if the watcher is being stopped.
    async fn emit(&self, event: WatchEvent) -> bool {
        tokio::select! {
            sent = self.events.send(event) => {
                if sent.is_err() {
                    tracing::debug!("Event receiver dropped");
                }
                sent.is_ok()
            }
            () = self.cancel.cancelled() => false,
        }
    }

    fn report(&self, error: &WatcherError) {
        let reason = error.to_string();
        if self.status.borrow().reason.as_deref() != Some(reason.as_str()) {
            tracing::warn!(error = %error, "Log unavailable");
        }
        self.set_state(ConnectionState::Error, Some(reason));
    }

    fn set_state(&self, state: ConnectionState, reason: Option<String>) {
        self.status.send_if_modified(|s| {
            if s.state == state && s.reason == reason {
                return false;
            }
            tracing::debug!(from = %s.state, to = %state, "Watcher state changed");
            s.state = state;
            s.reason = reason;
            true
        });
    }

    fn publish_progress(&self) {
        let facts = self.pipeline.facts().clone();
        let faults = self.pipeline.faults();
        let lines = self.lines;
        self.status.send_if_modified(|s| {
            let changed = s.facts != facts || s.faults != faults || s.lines != lines;
            s.facts = facts;
            s.faults = faults;
            s.lines = lines;
            changed
        });
    }
}

/// Watch the log's directory and nudge the poll loop on any change. The
/// returned guard stops watching when dropped.
fn watch_fs(path: &Path, nudges: mpsc::Sender<()>) -> Result<impl Send, WatcherError> {
    let mut debouncer = new_debouncer(FS_DEBOUNCE, None, move |result: DebounceEventResult| match result {
        Ok(_) => {
            let _ = nudges.try_send(());
        }
        Err(errors) => {
            for error in errors {
                tracing::warn!(error = %error, "Filesystem watch error");
            }
        }
    })?;

    let target = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    debouncer.watch(&target, RecursiveMode::NonRecursive)?;
    Ok(debouncer)
}
