use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::edit::gateway::LogObserver;
use crate::foundation::error::{MasklineError, MasklineResult};
use crate::persist::store::{LogStore, SessionId, save_log};
use crate::region::log::RegionEventLog;

/// Counters describing the saver's history.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct AutoSaveStats {
    /// Successful saves.
    pub saves_completed: u64,
    /// Failed save attempts.
    pub saves_failed: u64,
    /// Message of the most recent failure, cleared by the next success.
    pub last_error: Option<String>,
}

enum Msg {
    Changed(RegionEventLog),
    Flush(mpsc::Sender<MasklineResult<()>>),
    Shutdown,
}

/// Debounced background persistence of one session's log.
///
/// Change signals replace the pending snapshot and restart the quiet period; a save is
/// issued once `debounce` passes without a new signal. Saves run on a single worker, so a
/// burst arriving during a save results in exactly one follow-up save of the latest state.
/// A failed save keeps the snapshot and is retried after another quiet period.
pub struct AutoSaver {
    session: SessionId,
    tx: mpsc::Sender<Msg>,
    worker: Option<JoinHandle<()>>,
    stats: Arc<Mutex<AutoSaveStats>>,
}

impl std::fmt::Debug for AutoSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSaver")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl AutoSaver {
    /// Start the worker thread for `session`.
    pub fn spawn(
        store: Arc<dyn LogStore>,
        session: SessionId,
        debounce: Duration,
    ) -> MasklineResult<Self> {
        let (tx, rx) = mpsc::channel::<Msg>();
        let stats = Arc::new(Mutex::new(AutoSaveStats::default()));
        let worker = Worker {
            store,
            session: session.clone(),
            debounce,
            stats: stats.clone(),
        };
        let handle = std::thread::Builder::new()
            .name(format!("maskline-autosave-{session}"))
            .spawn(move || worker.run(rx))
            .map_err(|e| MasklineError::transient_io(format!("failed to start auto-saver: {e}")))?;
        Ok(Self {
            session,
            tx,
            worker: Some(handle),
            stats,
        })
    }

    /// Observer to register on the session's gateway.
    pub fn observer(&self) -> Box<dyn LogObserver> {
        Box::new(ChangeSignal {
            tx: self.tx.clone(),
        })
    }

    /// Queue a snapshot directly, as a change signal would.
    pub fn notify(&self, log: &RegionEventLog) {
        let _ = self.tx.send(Msg::Changed(log.clone()));
    }

    /// Save any pending snapshot now and wait for the result.
    pub fn flush(&self) -> MasklineResult<()> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.tx
            .send(Msg::Flush(ack_tx))
            .map_err(|_| MasklineError::transient_io("auto-saver worker has stopped"))?;
        ack_rx
            .recv()
            .map_err(|_| MasklineError::transient_io("auto-saver worker has stopped"))?
    }

    /// Current counters.
    pub fn stats(&self) -> AutoSaveStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Session this saver writes.
    pub fn session(&self) -> &SessionId {
        &self.session
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        let _ = self.tx.send(Msg::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

struct ChangeSignal {
    tx: mpsc::Sender<Msg>,
}

impl LogObserver for ChangeSignal {
    fn log_changed(&mut self, log: &RegionEventLog) {
        // The saver may already be gone; edits continue regardless.
        let _ = self.tx.send(Msg::Changed(log.clone()));
    }
}

struct Worker {
    store: Arc<dyn LogStore>,
    session: SessionId,
    debounce: Duration,
    stats: Arc<Mutex<AutoSaveStats>>,
}

impl Worker {
    fn run(self, rx: mpsc::Receiver<Msg>) {
        let mut pending: Option<RegionEventLog> = None;
        let mut deadline: Option<Instant> = None;

        loop {
            let msg = match deadline {
                Some(at) => match at.checked_duration_since(Instant::now()) {
                    Some(wait) if !wait.is_zero() => rx.recv_timeout(wait),
                    _ => Err(RecvTimeoutError::Timeout),
                },
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match msg {
                Ok(Msg::Changed(log)) => {
                    pending = Some(log);
                    deadline = Some(Instant::now() + self.debounce);
                }
                Ok(Msg::Flush(ack)) => {
                    let res = match pending.take() {
                        Some(log) => self.save(log, &mut pending),
                        None => Ok(()),
                    };
                    if pending.is_none() {
                        deadline = None;
                    }
                    let _ = ack.send(res);
                }
                Err(RecvTimeoutError::Timeout) => {
                    deadline = None;
                    if let Some(log) = pending.take()
                        && self.save(log, &mut pending).is_err()
                    {
                        deadline = Some(Instant::now() + self.debounce);
                    }
                }
                Ok(Msg::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                    if let Some(log) = pending.take() {
                        let _ = self.save(log, &mut pending);
                    }
                    break;
                }
            }
        }
    }

    // On failure the snapshot goes back into `pending` unless a newer one arrived meanwhile.
    fn save(
        &self,
        log: RegionEventLog,
        pending: &mut Option<RegionEventLog>,
    ) -> MasklineResult<()> {
        let res = save_log(self.store.as_ref(), &self.session, &log);
        match &res {
            Ok(()) => {
                tracing::debug!(
                    session = %self.session,
                    events = log.event_count(),
                    "auto-save completed"
                );
            }
            Err(e) => {
                tracing::warn!(session = %self.session, error = %e, "auto-save failed; will retry");
                pending.get_or_insert(log);
            }
        }
        if let Ok(mut stats) = self.stats.lock() {
            match &res {
                Ok(()) => {
                    stats.saves_completed += 1;
                    stats.last_error = None;
                }
                Err(e) => {
                    stats.saves_failed += 1;
                    stats.last_error = Some(e.to_string());
                }
            }
        }
        res
    }
}

#[cfg(test)]
#[path = "../../tests/unit/persist/autosave.rs"]
mod tests;
