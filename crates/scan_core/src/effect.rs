use crate::{ItemDescriptor, JobId};

/// Side effects requested by [`crate::update`]; executed by the owning panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SubmitBatch { items: Vec<ItemDescriptor> },
    Subscribe { job_id: JobId },
    Unsubscribe,
    StorePointer { job_id: JobId },
    ClearPointer,
    ResumeJob { job_id: JobId },
    LoadHistory,
    OpenHistory { job_id: JobId },
}
