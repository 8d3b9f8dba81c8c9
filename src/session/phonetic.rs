use std::collections::VecDeque;
use std::rc::Rc;

use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::info;

use crate::audio::Catalog;
use crate::error::DrillError;
use crate::romanize::PhoneticUnit;
use crate::session::check::evaluate;
use crate::session::stats::{AttemptRecord, Stats};
use crate::store::schema::{PHONETIC_KEY, PhoneticData};
use crate::store::{KvStore, load_or_default, persist};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhoneticOutcome {
    pub correct: bool,
    pub expected: PhoneticUnit,
    /// The rotation emptied and the drill is over.
    pub finished: bool,
}

/// Round-robin drill over bare syllables. Misses come back after one other
/// item instead of immediately.
pub struct PhoneticDrill {
    rotation: VecDeque<PhoneticUnit>,
    stats: Stats,
    store: Rc<dyn KvStore>,
}

impl PhoneticDrill {
    pub fn rehydrate(store: Rc<dyn KvStore>) -> Self {
        let data: PhoneticData = load_or_default(store.as_ref(), PHONETIC_KEY);
        Self {
            rotation: data.rotation.into(),
            stats: data.stats,
            store,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.rotation.is_empty()
    }

    pub fn current(&self) -> Option<&PhoneticUnit> {
        self.rotation.front()
    }

    pub fn rotation(&self) -> &VecDeque<PhoneticUnit> {
        &self.rotation
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Pick `size` distinct catalog syllables at random.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        catalog: &Catalog,
        size: usize,
        rng: &mut R,
    ) -> Result<usize, DrillError> {
        let rotation: VecDeque<PhoneticUnit> = catalog
            .entries()
            .choose_multiple(rng, size)
            .filter_map(|entry| entry.to_unit())
            .collect();
        if rotation.is_empty() {
            return Err(DrillError::Resolution);
        }
        info!(size = rotation.len(), "phonetic drill started");
        self.rotation = rotation;
        self.persist();
        Ok(self.rotation.len())
    }

    pub fn check_answer(
        &mut self,
        text: &str,
        tone: Option<u8>,
    ) -> Result<PhoneticOutcome, DrillError> {
        let expected = self.rotation.front().cloned().ok_or(DrillError::NotActive)?;
        let verdict = evaluate(&expected, text, tone)?;
        self.stats.record(AttemptRecord {
            source_text: expected.display.clone(),
            correct: verdict.correct,
            user_answer: verdict.user_answer,
            expected_code: expected.code.clone(),
            timestamp: Utc::now(),
        });

        if let Some(unit) = self.rotation.pop_front() {
            if verdict.correct {
                if !self.rotation.is_empty() {
                    self.rotation.push_back(unit);
                }
            } else {
                let at = self.rotation.len().min(1);
                self.rotation.insert(at, unit);
            }
        }
        let finished = self.rotation.is_empty();
        if finished {
            info!("phonetic drill finished");
        }
        self.persist();
        Ok(PhoneticOutcome {
            correct: verdict.correct,
            expected,
            finished,
        })
    }

    pub fn reset(&mut self) {
        self.rotation.clear();
        self.stats = Stats::default();
        self.persist();
    }

    fn persist(&self) {
        let data = PhoneticData {
            rotation: self.rotation.iter().cloned().collect(),
            stats: self.stats.clone(),
            ..PhoneticData::default()
        };
        persist(self.store.as_ref(), PHONETIC_KEY, &data);
    }
}
