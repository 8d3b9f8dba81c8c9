use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::romanize::{DrillItem, PhoneticUnit};
use crate::session::stats::Stats;

const SCHEMA_VERSION: u32 = 1;

pub const LISTENING_KEY: &str = "listening";
pub const PHONETIC_KEY: &str = "phonetic";

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Position within a listening queue.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillSession {
    #[serde(default)]
    pub queue: Vec<DrillItem>,
    #[serde(default, alias = "index")]
    pub current_index: usize,
    #[serde(default)]
    pub hint_index: usize,
    #[serde(default)]
    pub completed: bool,
    /// Every unit of the current item was answered; waiting for an advance.
    #[serde(default)]
    pub item_done: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListeningData {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(flatten)]
    pub session: DrillSession,
    #[serde(default)]
    pub stats: Stats,
}

impl Default for ListeningData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            session: DrillSession::default(),
            stats: Stats::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneticData {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub rotation: Vec<PhoneticUnit>,
    #[serde(default)]
    pub stats: Stats,
}

impl Default for PhoneticData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            rotation: Vec::new(),
            stats: Stats::default(),
        }
    }
}

pub const EXPORT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub tingli_export_version: u32,
    pub exported_at: DateTime<Utc>,
    pub config: Config,
    pub listening: ListeningData,
    pub phonetic: PhoneticData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_listening_state_loads() {
        let json = r#"{
            "queue": [{"char": "你", "syllables": []}],
            "index": 0,
            "completed": false
        }"#;
        let data: ListeningData = serde_json::from_str(json).unwrap();
        assert_eq!(data.schema_version, SCHEMA_VERSION);
        assert_eq!(data.session.queue.len(), 1);
        assert_eq!(data.session.queue[0].text, "你");
        assert!(!data.session.queue[0].is_resolved());
        assert_eq!(data.stats, Stats::default());
    }
}
