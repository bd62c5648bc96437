//! Panel configuration, read from a RON file.
//!
//! Every field has a default, so a partial file (or none at all) is fine.
//! A file that exists but can't be parsed falls back to the defaults with a
//! warning rather than failing startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use scan_core::OwnerId;
use scan_engine::{EngineConfig, SubmitSettings, DEFAULT_HISTORY_LIMIT};
use scan_logging::{scan_debug, scan_warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILENAME: &str = "scan_panel.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Owner of every job this panel creates and lists.
    pub owner_id: String,
    /// Job records and the active job pointer live here.
    pub data_dir: PathBuf,
    pub analysis_endpoint: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub history_limit: usize,
    /// `error`, `warn`, `info`, `debug`, `trace` or `off`.
    pub log_level: String,
    /// File target for [`crate::LogDestination::File`] and `Both`.
    pub log_file: Option<PathBuf>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        let submit = SubmitSettings::default();
        Self {
            owner_id: "local".to_string(),
            data_dir: PathBuf::from("./scan_data"),
            analysis_endpoint: submit.endpoint,
            connect_timeout_ms: duration_ms(submit.connect_timeout),
            request_timeout_ms: duration_ms(submit.request_timeout),
            history_limit: DEFAULT_HISTORY_LIMIT,
            log_level: "info".to_string(),
            log_file: Some(PathBuf::from("./scan_panel.log")),
        }
    }
}

impl PanelConfig {
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                scan_debug!("No config at {:?}; using defaults", path);
                return Self::default();
            }
            Err(err) => {
                scan_warn!("Failed to read config {:?}: {}; using defaults", path, err);
                return Self::default();
            }
        };

        match ron::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                scan_warn!("Failed to parse config {:?}: {}; using defaults", path, err);
                Self::default()
            }
        }
    }

    pub fn owner(&self) -> OwnerId {
        OwnerId::new(self.owner_id.trim())
    }

    pub fn submit_settings(&self) -> SubmitSettings {
        SubmitSettings {
            endpoint: self.analysis_endpoint.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            owner_id: self.owner(),
            data_dir: self.data_dir.clone(),
            submit: self.submit_settings(),
            history_limit: self.history_limit,
        }
    }

    /// Unknown names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        scan_logging::parse_level(&self.log_level).unwrap_or_else(|| {
            scan_warn!("Unknown log level {:?}; using info", self.log_level);
            LevelFilter::Info
        })
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
