//! Market scan core: pure domain types, job state machine and view-model helpers.
mod effect;
mod history;
mod msg;
pub mod presenter;
mod state;
mod store;
mod types;
mod update;

pub use effect::Effect;
pub use history::{history_label, HistoricalView, HistoryEntry, HistoryListing, ViewMode};
pub use msg::Msg;
pub use presenter::PanelViewModel;
pub use state::{Notice, NoticeLevel, PanelState};
pub use store::{JobStateStore, ScanSummary};
pub use types::{
    BatchJob, BatchJobSummary, ComparableRecord, ItemDescriptor, ItemResult, ItemStatus,
    JobHandle, JobId, JobStatus, MarketAnalysis, OwnerId, PriceMetrics, SUMMARY_PREVIEW_ITEMS,
};
pub use update::update;
