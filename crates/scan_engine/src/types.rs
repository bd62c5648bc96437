use std::fmt;
use std::sync::Arc;

use scan_core::{
    BatchJob, BatchJobSummary, ItemResult, ItemStatus, JobHandle, JobId, JobStatus,
};
use serde::{Deserialize, Serialize};

/// Timestamp source for persisted records (RFC 3339, UTC).
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

pub fn utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Everything the engine reports back to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Submitted(JobHandle),
    SubmitFailed { message: String },
    SubscriptionOpened { job_id: JobId },
    JobChanged {
        job_id: JobId,
        status: JobStatus,
        error_message: Option<String>,
    },
    ItemChanged(ItemResult),
    Disconnected { job_id: JobId, reason: String },
    Resumed {
        job: BatchJob,
        results: Vec<ItemResult>,
    },
    ResumeNotFound { job_id: JobId },
    ResumeFailed { job_id: JobId, message: String },
    HistoryListed(Vec<BatchJobSummary>),
    HistoryFailed { message: String },
    HistoryOpened {
        job: BatchJob,
        results: Vec<ItemResult>,
    },
    HistoryOpenFailed { job_id: JobId, message: String },
}

/// An item result as the external worker writes it. The payload keeps
/// whatever shape the worker produced; it is decoded on the way out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItemResult {
    pub item_id: String,
    pub status: ItemStatus,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub error_detail: Option<String>,
}

impl From<&ItemResult> for RawItemResult {
    fn from(result: &ItemResult) -> Self {
        Self {
            item_id: result.item_id.clone(),
            status: result.status,
            payload: result
                .analysis
                .as_ref()
                .and_then(|analysis| serde_json::to_value(analysis).ok()),
            error_detail: result.error_detail.clone(),
        }
    }
}

/// One logical push channel, filtered to a single job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Jobs(JobId),
    Results(JobId),
}

impl Channel {
    pub fn job_id(&self) -> &JobId {
        match self {
            Channel::Jobs(job_id) | Channel::Results(job_id) => job_id,
        }
    }

    pub fn topic(&self) -> String {
        match self {
            Channel::Jobs(job_id) => format!("jobs:{job_id}"),
            Channel::Results(job_id) => format!("results:{job_id}"),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.topic())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("could not open {channel}: {reason}")]
    Open { channel: String, reason: String },
    #[error("{channel} fell behind and skipped {skipped} event(s)")]
    Lagged { channel: String, skipped: u64 },
}
