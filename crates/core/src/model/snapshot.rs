use serde::{Deserialize, Serialize};

use crate::model::achievement::{Achievement, default_achievements};
use crate::model::history::SessionHistory;
use crate::model::settings::SessionSettings;

/// Everything the engine persists, saved and restored as one blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    #[serde(default)]
    pub settings: SessionSettings,
    #[serde(default)]
    pub history: SessionHistory,
    #[serde(default = "default_achievements")]
    pub achievements: Vec<Achievement>,
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self {
            settings: SessionSettings::default(),
            history: SessionHistory::default(),
            achievements: default_achievements(),
        }
    }
}
