//! In-process change feed.
//!
//! The repository publishes every job status change and result write to a
//! topic per job and channel kind; subscribers only ever see the topics they
//! asked for, so filtering by job happens on the publishing side.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt};
use scan_core::{JobId, JobStatus};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};

use crate::{Channel, RawItemResult, SubscriptionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Job {
        job_id: JobId,
        status: JobStatus,
        error_message: Option<String>,
    },
    Result {
        job_id: JobId,
        kind: ChangeKind,
        result: RawItemResult,
    },
}

impl FeedEvent {
    pub fn channel(&self) -> Channel {
        match self {
            FeedEvent::Job { job_id, .. } => Channel::Jobs(job_id.clone()),
            FeedEvent::Result { job_id, .. } => Channel::Results(job_id.clone()),
        }
    }
}

pub type FeedStream = BoxStream<'static, Result<FeedEvent, SubscriptionError>>;

/// Source of push notifications for one channel.
#[async_trait::async_trait]
pub trait PushTransport: Send + Sync {
    async fn open(&self, channel: &Channel) -> Result<FeedStream, SubscriptionError>;

    /// Called once a stream from [`Self::open`] has been dropped.
    async fn release(&self, _channel: &Channel) {}
}

/// Topic-keyed broadcast hub. Cloneable; clones share topics.
#[derive(Clone)]
pub struct ChangeFeed {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<FeedEvent>>>>,
    capacity: usize,
}

impl ChangeFeed {
    /// Create a feed with default capacity (256 events per topic).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Publish to the event's topic. No-op if nobody listens.
    pub async fn publish(&self, event: FeedEvent) {
        let topic = event.channel().topic();
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(&topic) {
            // No active receivers is fine.
            let _ = tx.send(event);
        }
    }

    pub async fn subscribe(&self, channel: &Channel) -> broadcast::Receiver<FeedEvent> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(channel.topic())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Remove `channel`'s topic if nobody listens to it any more.
    pub async fn remove_if_idle(&self, channel: &Channel) {
        let mut channels = self.channels.write().await;
        let topic = channel.topic();
        if channels
            .get(&topic)
            .is_some_and(|tx| tx.receiver_count() == 0)
        {
            channels.remove(&topic);
        }
    }

    pub async fn topic_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PushTransport for ChangeFeed {
    async fn open(&self, channel: &Channel) -> Result<FeedStream, SubscriptionError> {
        let rx = self.subscribe(channel).await;
        let name = channel.topic();
        // A lag error ends the stream after it is reported.
        let stream = stream::unfold(Some(rx), move |state| {
            let name = name.clone();
            async move {
                let mut rx = state?;
                match rx.recv().await {
                    Ok(event) => Some((Ok(event), Some(rx))),
                    Err(RecvError::Lagged(skipped)) => Some((
                        Err(SubscriptionError::Lagged {
                            channel: name,
                            skipped,
                        }),
                        None,
                    )),
                    Err(RecvError::Closed) => None,
                }
            }
        });
        Ok(stream.boxed())
    }

    async fn release(&self, channel: &Channel) {
        self.remove_if_idle(channel).await;
    }
}
