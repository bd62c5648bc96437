use std::collections::BTreeMap;

use scan_logging::{scan_debug, scan_warn};

use crate::{BatchJob, ItemDescriptor, ItemResult, ItemStatus, JobHandle, JobId, JobStatus};

/// In-memory state of the one live job: the single source of truth for the
/// live presentation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobStateStore {
    job_id: Option<JobId>,
    status: Option<JobStatus>,
    error_message: Option<String>,
    items: Vec<ItemDescriptor>,
    results: BTreeMap<String, ItemResult>,
    dirty: bool,
}

/// Item counts by status for the current job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    pub pending: usize,
    pub processing: usize,
    pub success: usize,
    pub error: usize,
    pub no_data_found: usize,
    pub total: usize,
    pub processed: usize,
}

impl ScanSummary {
    pub fn from_items<'a>(
        items: &[ItemDescriptor],
        results: impl Fn(&str) -> Option<&'a ItemResult>,
    ) -> Self {
        let mut summary = ScanSummary {
            total: items.len(),
            ..ScanSummary::default()
        };
        for item in items {
            let status = results(&item.item_id)
                .map(|result| result.status)
                .unwrap_or(ItemStatus::Pending);
            match status {
                ItemStatus::Pending => summary.pending += 1,
                ItemStatus::Processing => summary.processing += 1,
                ItemStatus::Success => summary.success += 1,
                ItemStatus::Error => summary.error += 1,
                ItemStatus::NoDataFound => summary.no_data_found += 1,
            }
            if status.is_resolved() {
                summary.processed += 1;
            }
        }
        summary
    }

    /// Fraction of items resolved, in `0.0..=1.0`. An empty job counts as done.
    pub fn completion(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.processed as f64 / self.total as f64
    }

    pub fn count(&self, status: ItemStatus) -> usize {
        match status {
            ItemStatus::Pending => self.pending,
            ItemStatus::Processing => self.processing,
            ItemStatus::Success => self.success,
            ItemStatus::Error => self.error,
            ItemStatus::NoDataFound => self.no_data_found,
        }
    }
}

impl JobStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a freshly submitted job. Anything held for a previous
    /// job is dropped first.
    pub fn seed(&mut self, handle: JobHandle) {
        self.reset();
        self.job_id = Some(handle.job_id);
        self.status = Some(JobStatus::Pending);
        self.items = handle.items;
        self.dirty = true;
    }

    /// Rebuilds state from persisted records (page reload).
    pub fn restore(&mut self, job: BatchJob, results: Vec<ItemResult>) {
        self.reset();
        self.job_id = Some(job.id);
        self.status = Some(job.status);
        self.error_message = job.error_message;
        self.items = job.items;
        self.dirty = true;
        for result in results {
            self.apply_item_result(result);
        }
    }

    /// Applies a job-level status change. Returns whether state changed.
    pub fn apply_job_update(
        &mut self,
        job_id: &JobId,
        status: JobStatus,
        error_message: Option<String>,
    ) -> bool {
        if self.job_id.as_ref() != Some(job_id) {
            scan_debug!(
                "Ignoring job update for {} (tracking {:?})",
                job_id,
                self.job_id.as_ref().map(JobId::as_str)
            );
            return false;
        }
        let Some(current) = self.status else {
            return false;
        };

        if current == status {
            if current.is_terminal() || error_message.is_none() || self.error_message.is_some() {
                return false;
            }
            self.error_message = error_message;
            self.dirty = true;
            return true;
        }

        if !current.can_advance_to(status) {
            scan_warn!(
                "Ignoring out-of-order status for job {}: {} -> {}",
                job_id,
                current,
                status
            );
            return false;
        }

        self.status = Some(status);
        match status {
            JobStatus::Failed | JobStatus::PartiallyFailed => {
                if error_message.is_some() {
                    self.error_message = error_message;
                }
            }
            // A clean finish supersedes any transport warning.
            JobStatus::Completed => self.error_message = None,
            JobStatus::Pending | JobStatus::Processing => {
                if error_message.is_some() {
                    self.error_message = error_message;
                }
            }
        }
        self.dirty = true;
        true
    }

    /// Upserts one item result, last write wins. Returns whether state changed.
    pub fn apply_item_result(&mut self, result: ItemResult) -> bool {
        if self.job_id.as_ref() != Some(&result.job_id) {
            scan_debug!(
                "Ignoring result for item {} of job {}",
                result.item_id,
                result.job_id
            );
            return false;
        }
        if !self.items.iter().any(|item| item.item_id == result.item_id) {
            scan_warn!(
                "Ignoring result for unknown item {} in job {}",
                result.item_id,
                result.job_id
            );
            return false;
        }

        let result = result.normalized();
        if self.results.get(&result.item_id) == Some(&result) {
            return false;
        }
        self.results.insert(result.item_id.clone(), result);
        self.dirty = true;
        true
    }

    /// Notes that the push transport dropped. Only recorded while the job can
    /// still change.
    pub fn record_disconnect(&mut self, reason: &str) -> bool {
        match self.status {
            Some(status) if !status.is_terminal() => {
                self.error_message = Some(format!("Live updates interrupted: {reason}"));
                self.dirty = true;
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        let dirty = self.dirty || self.job_id.is_some();
        *self = Self::default();
        self.dirty = dirty;
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary::from_items(&self.items, |item_id| self.results.get(item_id))
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn items(&self) -> &[ItemDescriptor] {
        &self.items
    }

    pub fn result(&self, item_id: &str) -> Option<&ItemResult> {
        self.results.get(item_id)
    }

    pub fn results(&self) -> impl Iterator<Item = &ItemResult> {
        self.results.values()
    }

    pub fn has_job(&self) -> bool {
        self.job_id.is_some()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(JobStatus::is_terminal)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns and clears the dirty flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
