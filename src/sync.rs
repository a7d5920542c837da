//! Change propagation between teamtodo processes.
//!
//! Every process sharing a data directory plays the part of a browser tab.
//! [`SyncNotifier`] watches the directory and calls back whenever a team
//! task collection is rewritten, by this process or any other; the caller
//! is expected to re-read. [`PeriodicRefresh`] is the fixed-interval
//! re-fetch timer that runs alongside it while a team is active.

use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{Error, Result};
use crate::storage::{is_team_tasks_key, key_for_path, Storage};

/// Default quiet period before a burst of changes is reported
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

const IDLE_WAIT: Duration = Duration::from_secs(3600);

enum WatchMsg {
    Fs(notify::Result<Event>),
    Stop,
}

/// Whether a watcher event rewrote a team task collection.
fn touches_team_tasks(event: &Event) -> bool {
    match event.kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => {}
        EventKind::Access(_) | EventKind::Other | EventKind::Any => return false,
        _ => {}
    }
    event
        .paths
        .iter()
        .filter_map(|path| key_for_path(path))
        .any(|key| is_team_tasks_key(&key))
}

#[derive(Debug, Clone)]
pub struct SyncNotifier {
    root: PathBuf,
    debounce: Duration,
}

impl SyncNotifier {
    pub fn new(storage: &Storage) -> Self {
        Self {
            root: storage.root().to_path_buf(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Call `on_change` after any `team_*_tasks` value changes.
    ///
    /// Bursts of filesystem events inside the debounce window are coalesced
    /// into one call. The returned [`Subscription`] deregisters on
    /// [`unsubscribe`](Subscription::unsubscribe) or drop.
    pub fn subscribe<F>(&self, mut on_change: F) -> Result<Subscription>
    where
        F: FnMut() + Send + 'static,
    {
        std::fs::create_dir_all(&self.root)?;

        let (tx, rx) = mpsc::channel();
        let event_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.send(WatchMsg::Fs(res));
        })?;
        watcher.watch(&self.root, RecursiveMode::NonRecursive)?;

        let debounce = self.debounce;
        let root = self.root.clone();
        let handle = thread::Builder::new()
            .name("teamtodo-sync".to_string())
            .spawn(move || {
                let mut pending: Option<Instant> = None;
                loop {
                    let timeout = pending
                        .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                        .unwrap_or(IDLE_WAIT);
                    match rx.recv_timeout(timeout) {
                        Ok(WatchMsg::Fs(Ok(event))) => {
                            if touches_team_tasks(&event) {
                                pending = Some(Instant::now() + debounce);
                            }
                        }
                        Ok(WatchMsg::Fs(Err(err))) => {
                            tracing::warn!(dir = %root.display(), error = %err, "watch error");
                        }
                        Ok(WatchMsg::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {
                            if pending.take().is_some() {
                                tracing::debug!(dir = %root.display(), "team tasks changed");
                                on_change();
                            }
                        }
                    }
                }
            })
            .map_err(|err| Error::OperationFailed(format!("failed to start sync thread: {err}")))?;

        tracing::debug!(dir = %self.root.display(), "sync subscription started");
        Ok(Subscription {
            watcher: Some(watcher),
            stop: tx,
            handle: Some(handle),
        })
    }
}

/// Live registration returned by [`SyncNotifier::subscribe`].
pub struct Subscription {
    watcher: Option<RecommendedWatcher>,
    stop: Sender<WatchMsg>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop watching; no callback runs after this returns.
    pub fn unsubscribe(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.watcher.take();
        let _ = self.stop.send(WatchMsg::Stop);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("sync thread panicked");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Fixed-interval re-fetch timer.
pub struct PeriodicRefresh {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicRefresh {
    /// Call `on_tick` every `interval` until stopped.
    pub fn start<F>(interval: Duration, mut on_tick: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("teamtodo-refresh".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => on_tick(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|err| {
                Error::OperationFailed(format!("failed to start refresh timer: {err}"))
            })?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("refresh timer panicked");
            }
        }
    }
}

impl Drop for PeriodicRefresh {
    fn drop(&mut self) {
        self.shutdown();
    }
}
