use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use futures_util::StreamExt;
use scan_core::JobId;
use scan_logging::{scan_debug, scan_info, scan_warn};
use tokio_util::sync::CancellationToken;

use crate::decode::decode_result;
use crate::feed::{FeedEvent, FeedStream, PushTransport};
use crate::{Channel, EngineEvent, SubscriptionError};

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Token for an open subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    job_id: JobId,
    cancel: CancellationToken,
}

impl SubscriptionHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

/// Channels that are open but not yet forwarded.
pub struct PendingSubscription {
    job_id: JobId,
    streams: [(Channel, FeedStream); 2],
}

impl PendingSubscription {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }
}

/// Forwards the two push channels of one job to an [`EventSink`].
///
/// At most one subscription is open at a time. A dropped channel is reported
/// once as [`EngineEvent::Disconnected`] and never retried here; the owner
/// decides when to subscribe again. Each forwarding task hands its channel
/// back to the transport when it stops.
pub struct LiveUpdateBridge {
    transport: Arc<dyn PushTransport>,
    sink: Arc<dyn EventSink>,
    active: Option<SubscriptionHandle>,
}

impl LiveUpdateBridge {
    pub fn new(transport: Arc<dyn PushTransport>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            transport,
            sink,
            active: None,
        }
    }

    /// Opens both channels and starts forwarding. Must run inside a tokio
    /// runtime; forwarding tasks are spawned on it.
    pub async fn subscribe(
        &mut self,
        job_id: &JobId,
    ) -> Result<SubscriptionHandle, SubscriptionError> {
        let pending = self.open(job_id).await?;
        Ok(self.start(pending))
    }

    /// First half of [`Self::subscribe`]: tears down any active subscription
    /// and opens the channels. Events published from here on are buffered
    /// until [`Self::start`].
    pub async fn open(&mut self, job_id: &JobId) -> Result<PendingSubscription, SubscriptionError> {
        self.unsubscribe();

        let jobs_channel = Channel::Jobs(job_id.clone());
        let results_channel = Channel::Results(job_id.clone());
        let jobs = self.transport.open(&jobs_channel).await?;
        let results = match self.transport.open(&results_channel).await {
            Ok(results) => results,
            Err(err) => {
                drop(jobs);
                self.transport.release(&jobs_channel).await;
                return Err(err);
            }
        };
        Ok(PendingSubscription {
            job_id: job_id.clone(),
            streams: [(jobs_channel, jobs), (results_channel, results)],
        })
    }

    pub fn start(&mut self, pending: PendingSubscription) -> SubscriptionHandle {
        self.unsubscribe();

        let handle = SubscriptionHandle {
            job_id: pending.job_id,
            cancel: CancellationToken::new(),
        };
        let reported = Arc::new(AtomicBool::new(false));
        for (channel, stream) in pending.streams {
            tokio::spawn(forward(
                handle.clone(),
                channel,
                stream,
                self.transport.clone(),
                self.sink.clone(),
                reported.clone(),
            ));
        }

        scan_info!("Subscribed to live updates for job {}", handle.job_id);
        self.active = Some(handle.clone());
        handle
    }

    /// Idempotent; a no-op without an active subscription. Forwarding stops
    /// at the next await point of each task.
    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.active.take() {
            scan_debug!("Unsubscribing from job {}", handle.job_id);
            handle.cancel.cancel();
        }
    }

    pub fn active_job(&self) -> Option<&JobId> {
        self.active
            .as_ref()
            .filter(|handle| handle.is_active())
            .map(|handle| &handle.job_id)
    }
}

impl Drop for LiveUpdateBridge {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

async fn forward(
    handle: SubscriptionHandle,
    channel: Channel,
    mut stream: FeedStream,
    transport: Arc<dyn PushTransport>,
    sink: Arc<dyn EventSink>,
    reported: Arc<AtomicBool>,
) {
    let dropped = loop {
        let next = tokio::select! {
            biased;
            _ = handle.cancel.cancelled() => break None,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(event)) => sink.emit(to_engine_event(event)),
            Some(Err(err)) => break Some(err.to_string()),
            None => break Some("channel closed".to_string()),
        }
    };

    // Whichever channel fails first reports; the sibling is cancelled.
    if let Some(reason) = dropped {
        if !handle.cancel.is_cancelled() && !reported.swap(true, Ordering::SeqCst) {
            scan_warn!("Live updates for job {} dropped: {}", handle.job_id, reason);
            handle.cancel.cancel();
            sink.emit(EngineEvent::Disconnected {
                job_id: handle.job_id.clone(),
                reason,
            });
        }
    }

    drop(stream);
    transport.release(&channel).await;
}

fn to_engine_event(event: FeedEvent) -> EngineEvent {
    match event {
        FeedEvent::Job {
            job_id,
            status,
            error_message,
        } => EngineEvent::JobChanged {
            job_id,
            status,
            error_message,
        },
        FeedEvent::Result { job_id, result, .. } => {
            EngineEvent::ItemChanged(decode_result(&job_id, &result))
        }
    }
}
