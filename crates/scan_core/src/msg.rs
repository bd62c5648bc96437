use crate::{BatchJob, BatchJobSummary, ItemDescriptor, ItemResult, JobHandle, JobId, JobStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Panel constructed; carries the job id persisted before the last reload.
    Initialized { stored_job_id: Option<JobId> },
    /// User asked to analyze the selected vehicles.
    SubmitRequested(Vec<ItemDescriptor>),
    /// The analysis service accepted the batch.
    SubmitAccepted(JobHandle),
    /// Submission was rejected or never reached the service.
    SubmitFailed { message: String },
    /// Push channels for the job are open.
    SubscriptionOpened { job_id: JobId },
    /// Push channel could not be opened or dropped.
    SubscriptionDropped { job_id: JobId, reason: String },
    /// Job-level push event.
    JobUpdate {
        job_id: JobId,
        status: JobStatus,
        error_message: Option<String>,
    },
    /// Item-level push event (insert or update).
    ItemUpdate(ItemResult),
    /// Persisted job restored after a reload.
    Resumed {
        job: BatchJob,
        results: Vec<ItemResult>,
    },
    /// Stored job id no longer resolves for this owner.
    ResumeNotFound { job_id: JobId },
    /// Backing store failed while resuming.
    ResumeFailed { job_id: JobId, message: String },
    /// User opened the history list.
    HistoryRequested,
    HistoryLoaded(Vec<BatchJobSummary>),
    HistoryFailed { message: String },
    /// User picked a past job.
    HistoryOpenRequested { job_id: JobId },
    HistoryOpened {
        job: BatchJob,
        results: Vec<ItemResult>,
    },
    HistoryOpenFailed { job_id: JobId, message: String },
    /// User switched back from a historical job.
    ReturnToLive,
    /// User dismissed the live job.
    DismissClicked,
    /// User asked to resume live updates after a drop.
    ReconnectClicked,
    NoticeDismissed,
    /// Fallback for placeholder wiring.
    NoOp,
}
