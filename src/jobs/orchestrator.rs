use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::foundation::config::JobOpts;
use crate::foundation::error::{MasklineError, MasklineResult};
use crate::jobs::collaborators::RenderConfig;
use crate::jobs::state::{JobId, JobKind, JobOutput, JobPhase, JobSnapshot};
use crate::jobs::tasks::{
    Collaborators, JobRequest, RenderParams, TaskCtx, run_extraction, run_render, run_tracking,
};

struct JobEntry {
    snapshot: Arc<RwLock<JobSnapshot>>,
    cancel: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl JobEntry {
    fn read(&self) -> MasklineResult<JobSnapshot> {
        self.snapshot
            .read()
            .map(|s| s.clone())
            .map_err(|_| MasklineError::Other(anyhow::anyhow!("job snapshot lock poisoned")))
    }
}

/// Runs background jobs, one worker thread each.
///
/// Callers interact through [`submit`](Self::submit), [`poll`](Self::poll) and
/// [`cancel`](Self::cancel). Polling clones a snapshot under a short read lock and never
/// waits on a worker. Cancellation is cooperative: workers observe the flag once per unit
/// of work. Every job ends in exactly one of `completed`, `error` or `cancelled`; a panic
/// in a task body becomes `error`.
pub struct JobOrchestrator {
    collab: Collaborators,
    opts: JobOpts,
    jobs: RwLock<BTreeMap<JobId, Arc<JobEntry>>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for JobOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOrchestrator")
            .field("opts", &self.opts)
            .field("jobs", &self.jobs.read().map(|j| j.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

impl JobOrchestrator {
    /// Orchestrator using `collab` for external work and `opts` for request defaults.
    pub fn new(collab: Collaborators, opts: JobOpts) -> Self {
        Self {
            collab,
            opts,
            jobs: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Defaults applied to requests.
    pub fn opts(&self) -> &JobOpts {
        &self.opts
    }

    fn entry(&self, id: JobId) -> MasklineResult<Arc<JobEntry>> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| MasklineError::Other(anyhow::anyhow!("job table lock poisoned")))?;
        jobs.get(&id)
            .cloned()
            .ok_or_else(|| MasklineError::not_found(format!("job {id}")))
    }

    /// Validate `req` and start it on a new worker thread.
    pub fn submit(&self, req: JobRequest) -> MasklineResult<JobId> {
        req.validate()?;
        let id = JobId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let kind = req.kind();
        let snapshot = Arc::new(RwLock::new(JobSnapshot::queued(id, kind)));
        let cancel = Arc::new(AtomicBool::new(false));
        let entry = Arc::new(JobEntry {
            snapshot: snapshot.clone(),
            cancel: cancel.clone(),
            worker: Mutex::new(None),
        });
        self.jobs
            .write()
            .map_err(|_| MasklineError::Other(anyhow::anyhow!("job table lock poisoned")))?
            .insert(id, entry.clone());

        let collab = self.collab.clone();
        let opts = self.opts.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("maskline-{kind}-{id}"))
            .spawn(move || {
                let ctx = TaskCtx::new(snapshot, cancel);
                run_job(&ctx, &collab, &opts, req);
            });

        match spawned {
            Ok(handle) => {
                if let Ok(mut w) = entry.worker.lock() {
                    *w = Some(handle);
                }
                tracing::info!(job = %id, kind = %kind, "job submitted");
                Ok(id)
            }
            Err(e) => {
                let msg = format!("failed to spawn worker: {e}");
                if let Ok(mut s) = entry.snapshot.write() {
                    let _ = s.advance(JobPhase::Error, 0, msg.clone());
                    s.error = Some(msg.clone());
                }
                Err(MasklineError::Other(anyhow::anyhow!(msg)))
            }
        }
    }

    /// Current snapshot of `id`.
    pub fn poll(&self, id: JobId) -> MasklineResult<JobSnapshot> {
        self.entry(id)?.read()
    }

    /// Request cooperative cancellation of `id`.
    ///
    /// Returns `false` when the job had already finished.
    pub fn cancel(&self, id: JobId) -> MasklineResult<bool> {
        let entry = self.entry(id)?;
        if entry.read()?.is_finished() {
            return Ok(false);
        }
        entry.cancel.store(true, Ordering::SeqCst);
        tracing::info!(job = %id, "job cancellation requested");
        Ok(true)
    }

    /// Snapshots of every retained job, by id.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let Ok(jobs) = self.jobs.read() else {
            return Vec::new();
        };
        jobs.values().filter_map(|e| e.read().ok()).collect()
    }

    /// Drop a finished job from the table and return its final snapshot.
    pub fn forget(&self, id: JobId) -> MasklineResult<JobSnapshot> {
        let entry = self.entry(id)?;
        let snap = entry.read()?;
        if !snap.is_finished() {
            return Err(MasklineError::validation(format!(
                "job {id} is still {}",
                snap.phase
            )));
        }
        if let Ok(mut jobs) = self.jobs.write() {
            jobs.remove(&id);
        }
        join_worker(&entry);
        Ok(snap)
    }

    /// Poll `id` until it finishes or `timeout` elapses; returns the last snapshot seen.
    pub fn wait(&self, id: JobId, timeout: Duration) -> MasklineResult<JobSnapshot> {
        let entry = self.entry(id)?;
        let until = Instant::now() + timeout;
        loop {
            let snap = entry.read()?;
            if snap.is_finished() || Instant::now() >= until {
                return Ok(snap);
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

impl Drop for JobOrchestrator {
    fn drop(&mut self) {
        let entries = match self.jobs.get_mut() {
            Ok(jobs) => std::mem::take(jobs),
            Err(poisoned) => std::mem::take(poisoned.into_inner()),
        };
        for entry in entries.values() {
            entry.cancel.store(true, Ordering::SeqCst);
        }
        for entry in entries.values() {
            join_worker(entry);
        }
    }
}

fn join_worker(entry: &JobEntry) {
    let handle = entry.worker.lock().ok().and_then(|mut w| w.take());
    if let Some(handle) = handle {
        let _ = handle.join();
    }
}

fn render_config(kind: JobKind, p: &RenderParams, opts: &JobOpts) -> RenderConfig {
    RenderConfig {
        kind,
        session: p.session.clone(),
        range: p.range,
        size: p.size,
        fps: p.fps,
        blur_radius: p.blur_radius.unwrap_or(opts.default_blur_radius),
        codec: p
            .codec
            .clone()
            .unwrap_or_else(|| opts.default_codec.clone()),
        output: p.output.clone(),
    }
}

fn run_job(ctx: &TaskCtx, collab: &Collaborators, opts: &JobOpts, req: JobRequest) {
    let kind = req.kind();
    let body = std::panic::catch_unwind(AssertUnwindSafe(|| -> MasklineResult<JobOutput> {
        match &req {
            JobRequest::Extraction(p) => run_extraction(ctx, collab.source.as_ref(), p),
            JobRequest::Export(p) | JobRequest::Preview(p) => {
                run_render(ctx, collab.sinks.as_ref(), render_config(kind, p, opts), &p.plan)
            }
            JobRequest::Tracking(p) => run_tracking(ctx, collab.tracker.as_ref(), p),
        }
    }));

    let outcome = match body {
        Ok(res) => res,
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "task panicked".to_string());
            Err(MasklineError::Other(anyhow::anyhow!("task panicked: {msg}")))
        }
    };

    let _ = ctx.update(|s| {
        match outcome {
            Ok(output) => {
                s.advance(JobPhase::Completed, 100, format!("{kind} completed"))?;
                s.output = Some(output);
                tracing::info!(job = %s.job_id, kind = %kind, "job completed");
            }
            Err(e) if e.is_cancelled() => {
                s.advance(JobPhase::Cancelled, 0, format!("{kind} cancelled"))?;
                tracing::info!(job = %s.job_id, kind = %kind, "job cancelled");
            }
            Err(e) => {
                let msg = e.to_string();
                s.advance(JobPhase::Error, 0, format!("{kind} failed"))?;
                s.error = Some(msg.clone());
                tracing::error!(job = %s.job_id, kind = %kind, error = %msg, "job failed");
            }
        }
        Ok(())
    });
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/orchestrator.rs"]
mod tests;
