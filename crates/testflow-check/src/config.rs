//! Which checks to run.
//!
//! Reads `TESTFLOW_CHECKS`, a comma-separated list of check names
//! (`loops`, `chronology`, `tagging`, `identity`). Unset means every check.

use serde::{Deserialize, Serialize};

pub const CHECKS_ENV: &str = "TESTFLOW_CHECKS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub loops: bool,
    pub chronology: bool,
    pub tagging: bool,
    pub identity: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            loops: true,
            chronology: true,
            tagging: true,
            identity: true,
        }
    }
}

impl CheckConfig {
    pub fn none() -> Self {
        CheckConfig {
            loops: false,
            chronology: false,
            tagging: false,
            identity: false,
        }
    }

    pub fn from_env() -> Self {
        match std::env::var(CHECKS_ENV) {
            Ok(list) => Self::only(&list),
            Err(_) => Self::default(),
        }
    }

    /// Enables exactly the checks named in a comma-separated `list`.
    /// Unknown names are logged and ignored.
    pub fn only(list: &str) -> Self {
        let mut config = Self::none();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match name {
                "loops" => config.loops = true,
                "chronology" => config.chronology = true,
                "tagging" => config.tagging = true,
                "identity" => config.identity = true,
                other => tracing::warn!(check = other, "ignoring unknown check name"),
            }
        }
        config
    }
}
