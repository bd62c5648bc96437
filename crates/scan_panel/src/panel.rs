use std::time::{Duration, Instant};

use anyhow::Context;
use scan_core::{update, ItemDescriptor, JobId, Msg, PanelState, PanelViewModel};
use scan_engine::{EngineHandle, EngineParts};

use crate::{ActiveJobPointer, EffectRunner, PanelConfig};

/// The component that owns the live job: panel state, the effect runner
/// and, through it, the engine. Messages are applied on the caller's thread.
pub struct AnalysisPanel {
    state: PanelState,
    runner: EffectRunner,
}

impl AnalysisPanel {
    /// Starts the engine from configuration and resumes the stored job, if any.
    pub fn new(config: &PanelConfig) -> anyhow::Result<Self> {
        let engine = EngineHandle::new(&config.engine_config())
            .with_context(|| format!("starting scan engine in {:?}", config.data_dir))?;
        Ok(Self::with_engine(
            engine,
            ActiveJobPointer::new(config.data_dir.clone()),
        ))
    }

    pub fn with_parts(parts: EngineParts, pointer: ActiveJobPointer) -> anyhow::Result<Self> {
        let engine = EngineHandle::with_parts(parts).context("starting scan engine")?;
        Ok(Self::with_engine(engine, pointer))
    }

    fn with_engine(engine: EngineHandle, pointer: ActiveJobPointer) -> Self {
        let stored_job_id = pointer.load();
        let mut panel = Self {
            state: PanelState::new(),
            runner: EffectRunner::new(engine, pointer),
        };
        panel.dispatch(Msg::Initialized { stored_job_id });
        panel
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn view(&self) -> PanelViewModel {
        self.state.view()
    }

    /// The view, if anything changed since the last call.
    pub fn take_view(&mut self) -> Option<PanelViewModel> {
        let view = self.state.view();
        self.state.consume_dirty().then_some(view)
    }

    pub fn pointer(&self) -> &ActiveJobPointer {
        self.runner.pointer()
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.run(effects);
    }

    /// Applies every engine event that has arrived. Returns how many.
    pub fn pump(&mut self) -> usize {
        let inbox = self.runner.drain();
        let count = inbox.len();
        for msg in inbox {
            self.dispatch(msg);
        }
        count
    }

    /// Applies engine events as they arrive until `done` holds or `timeout`
    /// passes. Returns whether `done` was reached.
    pub fn pump_until(&mut self, timeout: Duration, done: impl Fn(&PanelState) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if done(&self.state) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let slice = (deadline - now).min(Duration::from_millis(50));
            if let Some(msg) = self.runner.wait(slice) {
                self.dispatch(msg);
            }
        }
    }

    pub fn submit(&mut self, items: Vec<ItemDescriptor>) {
        self.dispatch(Msg::SubmitRequested(items));
    }

    pub fn request_history(&mut self) {
        self.dispatch(Msg::HistoryRequested);
    }

    pub fn open_history(&mut self, job_id: JobId) {
        self.dispatch(Msg::HistoryOpenRequested { job_id });
    }

    pub fn return_to_live(&mut self) {
        self.dispatch(Msg::ReturnToLive);
    }

    pub fn dismiss(&mut self) {
        self.dispatch(Msg::DismissClicked);
    }

    pub fn reconnect(&mut self) {
        self.dispatch(Msg::ReconnectClicked);
    }
}
