// crates/core/src/registry.rs
//! Process-wide map from job id to its live job, used to route cancels.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::TimelapseError;
use crate::job::TimelapseJob;
use crate::types::{ProgressSnapshot, TimelapseId};

/// Holds at most one entry per id. Entries live until removed; the owning
/// scheduler task removes its job once the chain has terminated.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<TimelapseId, Arc<TimelapseJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert by id, replacing (and returning) any previous entry.
    pub fn register(&self, job: Arc<TimelapseJob>) -> Option<Arc<TimelapseJob>> {
        let id = job.id();
        let previous = self
            .jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, job);
        if previous.is_some() {
            tracing::warn!(timelapse_id = %id, "Replaced an existing registry entry");
        }
        previous
    }

    pub fn lookup(&self, id: TimelapseId) -> Result<Arc<TimelapseJob>, TimelapseError> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| TimelapseError::not_found(id))
    }

    /// Look the job up and start its two-phase cancel, holding the map lock
    /// across both steps. Returns whether this call moved the job out of
    /// `Active` (false if a cancel was already pending or it had finished).
    pub fn cancel(&self, id: TimelapseId) -> Result<bool, TimelapseError> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let job = jobs.get(&id).ok_or_else(|| TimelapseError::not_found(id))?;
        let accepted = job.request_cancel();
        if accepted {
            tracing::info!(timelapse_id = %id, "Timelapse cancelling");
        } else {
            tracing::debug!(timelapse_id = %id, status = ?job.status(), "Cancel ignored; job not active");
        }
        Ok(accepted)
    }

    pub fn remove(&self, id: TimelapseId) -> Option<Arc<TimelapseJob>> {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    /// Current snapshots of every registered job, oldest first.
    pub fn list(&self) -> Vec<ProgressSnapshot> {
        let mut snapshots: Vec<ProgressSnapshot> = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|job| job.snapshot())
            .collect();
        snapshots.sort_by(|a, b| {
            a.created
                .cmp(&b.created)
                .then_with(|| a.timelapse_id.cmp(&b.timelapse_id))
        });
        snapshots
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
