use crate::presenter::{panel_view, PanelViewModel};
use crate::{HistoricalView, HistoryEntry, HistoryListing, JobId, JobStateStore, ViewMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// Transient, user-visible message. Never blocks the rest of the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Everything the analysis panel shows. The live store and the historical
/// snapshot are separate fields and are never written through each other.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PanelState {
    live: JobStateStore,
    historical: Option<HistoricalView>,
    mode: ViewMode,
    submitting: bool,
    subscription_live: bool,
    history: Vec<HistoryEntry>,
    history_listing: HistoryListing,
    opening_history: Option<JobId>,
    notice: Option<Notice>,
    dirty: bool,
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> PanelViewModel {
        panel_view(self)
    }

    pub fn live(&self) -> &JobStateStore {
        &self.live
    }

    pub fn historical(&self) -> Option<&HistoricalView> {
        self.historical.as_ref()
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_subscription_live(&self) -> bool {
        self.subscription_live
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn history_listing(&self) -> HistoryListing {
        self.history_listing
    }

    pub fn opening_history(&self) -> Option<&JobId> {
        self.opening_history.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty || self.live.is_dirty()
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        let live = self.live.consume_dirty();
        std::mem::take(&mut self.dirty) || live
    }

    pub(crate) fn live_mut(&mut self) -> &mut JobStateStore {
        &mut self.live
    }

    pub(crate) fn set_submitting(&mut self, submitting: bool) {
        self.submitting = submitting;
        self.dirty = true;
    }

    pub(crate) fn set_subscription_live(&mut self, live: bool) {
        if self.subscription_live != live {
            self.subscription_live = live;
            self.dirty = true;
        }
    }

    pub(crate) fn set_notice(&mut self, notice: Option<Notice>) {
        if self.notice != notice {
            self.notice = notice;
            self.dirty = true;
        }
    }

    pub(crate) fn begin_history_listing(&mut self) {
        self.history_listing = HistoryListing::Loading;
        self.dirty = true;
    }

    pub(crate) fn set_history(&mut self, entries: Vec<HistoryEntry>) {
        self.history = entries;
        self.history_listing = HistoryListing::Loaded;
        self.dirty = true;
    }

    pub(crate) fn mark_history_unavailable(&mut self) {
        self.history.clear();
        self.history_listing = HistoryListing::Unavailable;
        self.dirty = true;
    }

    pub(crate) fn begin_opening_history(&mut self, job_id: JobId) {
        self.opening_history = Some(job_id);
        self.dirty = true;
    }

    pub(crate) fn take_opening_history(&mut self) -> Option<JobId> {
        self.opening_history.take()
    }

    pub(crate) fn show_historical(&mut self, view: HistoricalView) {
        self.historical = Some(view);
        self.mode = ViewMode::Historical;
        self.dirty = true;
    }

    pub(crate) fn show_live(&mut self) {
        self.historical = None;
        self.opening_history = None;
        self.mode = ViewMode::Live;
        self.dirty = true;
    }
}
