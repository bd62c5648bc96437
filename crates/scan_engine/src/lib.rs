//! Scan engine: job submission, durable job records and live updates.
mod bridge;
mod decode;
mod engine;
mod feed;
mod persist;
mod repository;
mod submit;
mod types;

pub use bridge::{
    ChannelEventSink, EventSink, LiveUpdateBridge, PendingSubscription, SubscriptionHandle,
};
pub use decode::{decode_analysis, decode_comparables, decode_result};
pub use engine::{EngineConfig, EngineError, EngineHandle, EngineParts, DEFAULT_HISTORY_LIMIT};
pub use feed::{ChangeFeed, ChangeKind, FeedEvent, FeedStream, PushTransport};
pub use persist::{ensure_data_dir, AtomicFileWriter, PersistError};
pub use repository::{FileJobRepository, HistoryFilter, JobRepository};
pub use submit::{
    AnalysisService, JobRequestSubmitter, ReqwestAnalysisService, SubmitError, SubmitSettings,
};
pub use types::{utc_now, Channel, Clock, EngineEvent, RawItemResult, SubscriptionError};
