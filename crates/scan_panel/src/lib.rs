//! Market scan panel: owns the panel state and drives the scan engine.
pub mod config;
mod effects;
pub mod logging;
mod panel;
mod pointer;

pub use config::{PanelConfig, CONFIG_FILENAME};
pub use effects::{msg_from_event, EffectRunner};
pub use logging::LogDestination;
pub use panel::AnalysisPanel;
pub use pointer::{ActiveJobPointer, PointerError};
