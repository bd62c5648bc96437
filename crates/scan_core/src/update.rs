use scan_logging::{scan_debug, scan_info, scan_warn};

use crate::{Effect, HistoricalView, HistoryEntry, Msg, Notice, PanelState};

const EMPTY_SELECTION_NOTICE: &str = "Select at least one vehicle to analyze.";
const RESUME_FAILED_NOTICE: &str = "Couldn't restore the previous market scan.";
const HISTORY_FAILED_NOTICE: &str = "Couldn't load past market scans.";
const HISTORY_OPEN_FAILED_NOTICE: &str = "Couldn't open that market scan.";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: PanelState, msg: Msg) -> (PanelState, Vec<Effect>) {
    let effects = match msg {
        Msg::Initialized { stored_job_id } => match stored_job_id {
            Some(job_id) if !state.live().has_job() => vec![Effect::ResumeJob { job_id }],
            _ => Vec::new(),
        },
        Msg::SubmitRequested(items) => {
            if state.is_submitting() {
                scan_debug!("Submission already in flight; ignoring request");
                return (state, Vec::new());
            }
            if items.is_empty() {
                state.set_notice(Some(Notice::error(EMPTY_SELECTION_NOTICE)));
                return (state, Vec::new());
            }
            state.set_submitting(true);
            state.set_notice(None);
            vec![Effect::SubmitBatch { items }]
        }
        Msg::SubmitAccepted(handle) => {
            state.set_submitting(false);
            let job_id = handle.job_id.clone();
            scan_info!(
                "Tracking job {} with {} item(s)",
                job_id,
                handle.items.len()
            );
            // The previous job's subscription goes before the store is reseeded.
            state.set_subscription_live(false);
            state.live_mut().seed(handle);
            vec![
                Effect::Unsubscribe,
                Effect::Subscribe {
                    job_id: job_id.clone(),
                },
                Effect::StorePointer { job_id },
            ]
        }
        Msg::SubmitFailed { message } => {
            state.set_submitting(false);
            state.set_notice(Some(Notice::error(message)));
            Vec::new()
        }
        Msg::SubscriptionOpened { job_id } => {
            if state.live().job_id() == Some(&job_id) {
                state.set_subscription_live(true);
            }
            Vec::new()
        }
        Msg::SubscriptionDropped { job_id, reason } => {
            if state.live().job_id() == Some(&job_id) {
                scan_warn!("Live updates for job {} stopped: {}", job_id, reason);
                state.set_subscription_live(false);
                state.live_mut().record_disconnect(&reason);
            }
            Vec::new()
        }
        Msg::JobUpdate {
            job_id,
            status,
            error_message,
        } => {
            state
                .live_mut()
                .apply_job_update(&job_id, status, error_message);
            Vec::new()
        }
        Msg::ItemUpdate(result) => {
            state.live_mut().apply_item_result(result);
            Vec::new()
        }
        Msg::Resumed { job, results } => {
            if state.live().has_job() {
                scan_debug!("Resume of job {} arrived after a newer job; ignoring", job.id);
                return (state, Vec::new());
            }
            let job_id = job.id.clone();
            let terminal = job.status.is_terminal();
            scan_info!(
                "Resumed job {} ({}) with {} stored result(s)",
                job_id,
                job.status,
                results.len()
            );
            state.live_mut().restore(job, results);
            if terminal {
                Vec::new()
            } else {
                vec![Effect::Subscribe { job_id }]
            }
        }
        Msg::ResumeNotFound { job_id } => {
            if state.live().has_job() {
                // The pointer now belongs to the newer job.
                scan_debug!("Stored job {} is gone; newer job is live", job_id);
                return (state, Vec::new());
            }
            scan_debug!("Stored job {} is gone; clearing pointer", job_id);
            vec![Effect::ClearPointer]
        }
        Msg::ResumeFailed { job_id, message } => {
            scan_warn!("Could not resume job {}: {}", job_id, message);
            state.set_notice(Some(Notice::warning(RESUME_FAILED_NOTICE)));
            Vec::new()
        }
        Msg::HistoryRequested => {
            state.begin_history_listing();
            vec![Effect::LoadHistory]
        }
        Msg::HistoryLoaded(summaries) => {
            let entries = summaries
                .into_iter()
                .map(HistoryEntry::from_summary)
                .collect();
            state.set_history(entries);
            Vec::new()
        }
        Msg::HistoryFailed { message } => {
            scan_warn!("History listing failed: {}", message);
            state.mark_history_unavailable();
            state.set_notice(Some(Notice::warning(HISTORY_FAILED_NOTICE)));
            Vec::new()
        }
        Msg::HistoryOpenRequested { job_id } => {
            state.begin_opening_history(job_id.clone());
            vec![Effect::OpenHistory { job_id }]
        }
        Msg::HistoryOpened { job, results } => {
            if state.opening_history() != Some(&job.id) {
                scan_debug!("Discarding stale history load for job {}", job.id);
                return (state, Vec::new());
            }
            state.take_opening_history();
            state.show_historical(HistoricalView::new(job, results));
            Vec::new()
        }
        Msg::HistoryOpenFailed { job_id, message } => {
            if state.opening_history() == Some(&job_id) {
                state.take_opening_history();
                scan_warn!("Could not open job {}: {}", job_id, message);
                state.set_notice(Some(Notice::warning(HISTORY_OPEN_FAILED_NOTICE)));
            }
            Vec::new()
        }
        Msg::ReturnToLive => {
            state.show_live();
            Vec::new()
        }
        Msg::DismissClicked => {
            if !state.live().has_job() {
                return (state, Vec::new());
            }
            state.set_subscription_live(false);
            state.live_mut().reset();
            vec![Effect::Unsubscribe, Effect::ClearPointer]
        }
        Msg::ReconnectClicked => match state.live().job_id() {
            Some(job_id) if !state.is_subscription_live() && !state.live().is_terminal() => {
                vec![Effect::Subscribe {
                    job_id: job_id.clone(),
                }]
            }
            _ => Vec::new(),
        },
        Msg::NoticeDismissed => {
            state.set_notice(None);
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
