use std::collections::BTreeMap;

use crate::{BatchJob, BatchJobSummary, ItemDescriptor, ItemResult, JobId, ScanSummary};

/// Which presentation the panel shows. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Live,
    Historical,
}

/// Load state of the history listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryListing {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub summary: BatchJobSummary,
    pub label: String,
}

impl HistoryEntry {
    pub fn from_summary(summary: BatchJobSummary) -> Self {
        let label = history_label(&summary.preview_items, summary.item_count);
        Self { summary, label }
    }
}

/// Read-only snapshot of a past job. Never shares storage with the live store.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalView {
    job: BatchJob,
    results: BTreeMap<String, ItemResult>,
}

impl HistoricalView {
    pub fn new(job: BatchJob, results: Vec<ItemResult>) -> Self {
        let results = results
            .into_iter()
            .filter(|result| result.job_id == job.id)
            .map(|result| {
                let result = result.normalized();
                (result.item_id.clone(), result)
            })
            .collect();
        Self { job, results }
    }

    pub fn job(&self) -> &BatchJob {
        &self.job
    }

    pub fn job_id(&self) -> &JobId {
        &self.job.id
    }

    pub fn result(&self, item_id: &str) -> Option<&ItemResult> {
        self.results.get(item_id)
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary::from_items(&self.job.items, |item_id| self.results.get(item_id))
    }
}

const LABEL_NAMED_ITEMS: usize = 2;

/// Builds "Make Model, Make Model +N more" from the first requested items.
///
/// Cosmetic only: blank descriptors are skipped and a count is used when
/// nothing nameable remains.
pub fn history_label(preview: &[ItemDescriptor], total: usize) -> String {
    let names: Vec<String> = preview
        .iter()
        .map(ItemDescriptor::make_model)
        .filter(|name| !name.is_empty())
        .take(LABEL_NAMED_ITEMS)
        .collect();

    if names.is_empty() {
        return match total {
            1 => "1 vehicle".to_string(),
            n => format!("{n} vehicles"),
        };
    }

    let rest = total.saturating_sub(names.len());
    let mut label = names.join(", ");
    if rest > 0 {
        label.push_str(&format!(" +{rest} more"));
    }
    label
}
