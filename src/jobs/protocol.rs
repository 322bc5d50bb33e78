use serde_json::{Value, json};

use crate::foundation::error::{MasklineError, MasklineResult};
use crate::jobs::orchestrator::JobOrchestrator;
use crate::jobs::state::{JobId, JobKind};
use crate::jobs::tasks::JobRequest;

/// Transport-agnostic JSON surface over [`JobOrchestrator`].
impl JobOrchestrator {
    /// `create_job(kind, params) -> {"job_id": id}`.
    pub fn create_job(&self, kind: &str, params: Value) -> MasklineResult<Value> {
        let kind = kind.parse::<JobKind>()?;
        let id = self.submit(JobRequest::from_json(kind, params)?)?;
        Ok(json!({ "job_id": id }))
    }

    /// `get_job(job_id) -> snapshot`.
    pub fn get_job(&self, job_id: JobId) -> MasklineResult<Value> {
        let snap = self.poll(job_id)?;
        serde_json::to_value(&snap).map_err(|e| MasklineError::serde(e.to_string()))
    }

    /// `cancel_job(job_id) -> {"job_id": id, "cancelled": bool}`.
    ///
    /// `cancelled` is `false` when the job had already finished.
    pub fn cancel_job(&self, job_id: JobId) -> MasklineResult<Value> {
        let requested = self.cancel(job_id)?;
        Ok(json!({ "job_id": job_id, "cancelled": requested }))
    }
}
