use std::time::Duration;

use scan_core::{Effect, Msg};
use scan_engine::{EngineEvent, EngineHandle};
use scan_logging::{scan_debug, scan_error, scan_info};

use crate::ActiveJobPointer;

/// Turns [`Effect`]s into engine commands and pointer writes, and engine
/// events back into [`Msg`]s.
pub struct EffectRunner {
    engine: EngineHandle,
    pointer: ActiveJobPointer,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, pointer: ActiveJobPointer) -> Self {
        Self { engine, pointer }
    }

    pub fn pointer(&self) -> &ActiveJobPointer {
        &self.pointer
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SubmitBatch { items } => {
                    scan_info!("SubmitBatch item_count={}", items.len());
                    self.engine.submit(items);
                }
                Effect::Subscribe { job_id } => {
                    scan_debug!("Subscribe job_id={}", job_id);
                    self.engine.subscribe(job_id);
                }
                Effect::Unsubscribe => self.engine.unsubscribe(),
                Effect::StorePointer { job_id } => {
                    if let Err(err) = self.pointer.store(&job_id) {
                        scan_error!("Failed to store active job pointer {}: {}", job_id, err);
                    }
                }
                Effect::ClearPointer => {
                    if let Err(err) = self.pointer.clear() {
                        scan_error!("Failed to clear active job pointer: {}", err);
                    }
                }
                Effect::ResumeJob { job_id } => {
                    scan_info!("Resuming job {}", job_id);
                    self.engine.resume(job_id);
                }
                Effect::LoadHistory => self.engine.list_history(),
                Effect::OpenHistory { job_id } => self.engine.open_history(job_id),
            }
        }
    }

    /// Engine events that are already waiting, as messages.
    pub fn drain(&self) -> Vec<Msg> {
        std::iter::from_fn(|| self.engine.try_recv())
            .map(msg_from_event)
            .collect()
    }

    pub fn wait(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(msg_from_event)
    }
}

pub fn msg_from_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Submitted(handle) => Msg::SubmitAccepted(handle),
        EngineEvent::SubmitFailed { message } => Msg::SubmitFailed { message },
        EngineEvent::SubscriptionOpened { job_id } => Msg::SubscriptionOpened { job_id },
        EngineEvent::JobChanged {
            job_id,
            status,
            error_message,
        } => Msg::JobUpdate {
            job_id,
            status,
            error_message,
        },
        EngineEvent::ItemChanged(result) => Msg::ItemUpdate(result),
        EngineEvent::Disconnected { job_id, reason } => {
            Msg::SubscriptionDropped { job_id, reason }
        }
        EngineEvent::Resumed { job, results } => Msg::Resumed { job, results },
        EngineEvent::ResumeNotFound { job_id } => Msg::ResumeNotFound { job_id },
        EngineEvent::ResumeFailed { job_id, message } => Msg::ResumeFailed { job_id, message },
        EngineEvent::HistoryListed(summaries) => Msg::HistoryLoaded(summaries),
        EngineEvent::HistoryFailed { message } => Msg::HistoryFailed { message },
        EngineEvent::HistoryOpened { job, results } => Msg::HistoryOpened { job, results },
        EngineEvent::HistoryOpenFailed { job_id, message } => {
            Msg::HistoryOpenFailed { job_id, message }
        }
    }
}
