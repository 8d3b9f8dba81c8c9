use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Oldest attempts are dropped past this many records.
pub const MAX_HISTORY: usize = 200;

/// One evaluated answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    #[serde(alias = "char")]
    pub source_text: String,
    pub correct: bool,
    #[serde(alias = "answer")]
    pub user_answer: String,
    #[serde(alias = "expected")]
    pub expected_code: String,
    #[serde(alias = "ts", with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub correct: u32,
    #[serde(default)]
    pub incorrect: u32,
    #[serde(default)]
    pub history: Vec<AttemptRecord>,
}

impl Stats {
    pub fn record(&mut self, record: AttemptRecord) {
        if record.correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
        self.history.push(record);
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }

    pub fn attempts(&self) -> u32 {
        self.correct + self.incorrect
    }

    pub fn accuracy(&self) -> f64 {
        match self.attempts() {
            0 => 0.0,
            n => self.correct as f64 / n as f64 * 100.0,
        }
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &AttemptRecord> {
        self.history.iter().rev().take(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(n: usize, correct: bool) -> AttemptRecord {
        AttemptRecord {
            source_text: format!("item{n}"),
            correct,
            user_answer: "ni 3".to_string(),
            expected_code: "ni3".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn record_updates_counters() {
        let mut stats = Stats::default();
        stats.record(attempt(0, true));
        stats.record(attempt(1, false));
        stats.record(attempt(2, true));
        assert_eq!(stats.correct, 2);
        assert_eq!(stats.incorrect, 1);
        assert_eq!(stats.attempts(), 3);
        assert!((stats.accuracy() - 66.666).abs() < 0.01);
    }

    #[test]
    fn history_is_bounded_fifo() {
        let mut stats = Stats::default();
        for n in 0..MAX_HISTORY + 5 {
            stats.record(attempt(n, true));
        }
        assert_eq!(stats.history.len(), MAX_HISTORY);
        assert_eq!(stats.history[0].source_text, "item5");
        assert_eq!(stats.correct as usize, MAX_HISTORY + 5);
        assert_eq!(
            stats.recent(1).next().unwrap().source_text,
            format!("item{}", MAX_HISTORY + 4)
        );
    }

    #[test]
    fn accepts_legacy_field_names() {
        let json = r#"{"char":"你","correct":false,"answer":"ni 2","expected":"ni3","ts":1700000000000}"#;
        let record: AttemptRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.source_text, "你");
        assert_eq!(record.user_answer, "ni 2");
        assert_eq!(record.expected_code, "ni3");
        assert_eq!(record.timestamp.timestamp_millis(), 1_700_000_000_000);
    }
}
