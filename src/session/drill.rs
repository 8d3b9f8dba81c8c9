use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info};

use crate::error::DrillError;
use crate::romanize::resolver::{Romanizer, resolve, resolve_one};
use crate::romanize::{DrillItem, PhoneticUnit};
use crate::session::check::evaluate;
use crate::session::stats::{AttemptRecord, Stats};
use crate::session::timer::AdvanceTimer;
use crate::store::schema::{DrillSession, LISTENING_KEY, ListeningData};
use crate::store::{KvStore, load_or_default, persist};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrillState {
    Idle,
    Active,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Wrong answer; nothing moved.
    Incorrect { expected: PhoneticUnit },
    /// Right answer and the item has more units; `hint_index` now points at
    /// the next one.
    Correct { unit: PhoneticUnit, hint_index: usize },
    /// Last unit of the item answered. `advance_at` is set when auto-advance
    /// armed the timer; otherwise the caller must call `advance()`.
    ItemComplete {
        unit: PhoneticUnit,
        advance_at: Option<Instant>,
    },
}

/// Queue-driven listening drill over resolved characters and words.
pub struct ListeningDrill {
    session: DrillSession,
    stats: Stats,
    romanizer: Box<dyn Romanizer>,
    store: Rc<dyn KvStore>,
    auto_advance: bool,
    advance_delay: Duration,
    timer: AdvanceTimer,
}

impl ListeningDrill {
    /// Restore the drill from `store`, repairing whatever is stale.
    pub fn rehydrate(romanizer: Box<dyn Romanizer>, store: Rc<dyn KvStore>) -> Self {
        let data: ListeningData = load_or_default(store.as_ref(), LISTENING_KEY);
        let session = repair_session(romanizer.as_ref(), data.session);
        Self {
            session,
            stats: data.stats,
            romanizer,
            store,
            auto_advance: true,
            advance_delay: Duration::from_millis(1300),
            timer: AdvanceTimer::default(),
        }
    }

    pub fn with_auto_advance(mut self, enabled: bool, delay: Duration) -> Self {
        self.auto_advance = enabled;
        self.advance_delay = delay;
        self
    }

    pub fn state(&self) -> DrillState {
        if self.session.queue.is_empty() {
            DrillState::Idle
        } else if self.session.completed {
            DrillState::Completed
        } else {
            DrillState::Active
        }
    }

    pub fn session(&self) -> &DrillSession {
        &self.session
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn current_item(&self) -> Option<&DrillItem> {
        if self.session.completed {
            return None;
        }
        self.session.queue.get(self.session.current_index)
    }

    pub fn current_unit(&self) -> Option<&PhoneticUnit> {
        self.current_item()?.units.get(self.session.hint_index)
    }

    /// Units of the current item the learner has already answered.
    pub fn revealed_units(&self) -> &[PhoneticUnit] {
        match self.current_item() {
            Some(item) if self.session.item_done => &item.units,
            Some(item) => &item.units[..self.session.hint_index.min(item.units.len())],
            None => &[],
        }
    }

    pub fn advance_pending(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn start<S: AsRef<str>>(&mut self, texts: &[S]) -> Result<usize, DrillError> {
        let queue = resolve(self.romanizer.as_ref(), texts);
        if queue.is_empty() {
            return Err(DrillError::Resolution);
        }
        info!(items = queue.len(), "listening drill started");
        self.timer.cancel();
        self.session = DrillSession {
            queue,
            ..DrillSession::default()
        };
        self.persist();
        Ok(self.session.queue.len())
    }

    pub fn check_answer(
        &mut self,
        text: &str,
        tone: Option<u8>,
        now: Instant,
    ) -> Result<CheckOutcome, DrillError> {
        if self.state() != DrillState::Active {
            return Err(DrillError::NotActive);
        }
        // A refused answer leaves a pending advance armed.
        if self.session.item_done {
            return Err(DrillError::ItemFinished);
        }
        self.timer.cancel();
        let (item_text, unit, unit_count) = match self.current_item() {
            Some(item) => match item.units.get(self.session.hint_index) {
                Some(unit) => (item.text.clone(), unit.clone(), item.units.len()),
                None => return Err(DrillError::NotActive),
            },
            None => return Err(DrillError::NotActive),
        };

        let verdict = evaluate(&unit, text, tone)?;
        self.stats.record(AttemptRecord {
            source_text: item_text,
            correct: verdict.correct,
            user_answer: verdict.user_answer,
            expected_code: unit.code.clone(),
            timestamp: Utc::now(),
        });

        let outcome = if !verdict.correct {
            CheckOutcome::Incorrect { expected: unit }
        } else if self.session.hint_index + 1 < unit_count {
            self.session.hint_index += 1;
            CheckOutcome::Correct {
                unit,
                hint_index: self.session.hint_index,
            }
        } else {
            self.session.item_done = true;
            let advance_at = self
                .auto_advance
                .then(|| self.timer.arm(now, self.advance_delay));
            CheckOutcome::ItemComplete { unit, advance_at }
        };
        self.persist();
        Ok(outcome)
    }

    pub fn advance(&mut self) -> Result<DrillState, DrillError> {
        self.timer.cancel();
        if self.state() != DrillState::Active {
            return Err(DrillError::NotActive);
        }
        self.session.current_index += 1;
        self.session.hint_index = 0;
        self.session.item_done = false;
        if self.session.current_index >= self.session.queue.len() {
            self.session.current_index = self.session.queue.len();
            self.session.completed = true;
            info!(items = self.session.queue.len(), "listening drill completed");
        }
        self.persist();
        Ok(self.state())
    }

    pub fn reset(&mut self) {
        self.timer.cancel();
        self.session = DrillSession::default();
        self.stats = Stats::default();
        self.persist();
    }

    pub fn restart(&mut self) -> Result<(), DrillError> {
        if self.state() != DrillState::Completed {
            return Err(DrillError::NotCompleted);
        }
        self.session.current_index = 0;
        self.session.hint_index = 0;
        self.session.item_done = false;
        self.session.completed = false;
        self.persist();
        Ok(())
    }

    /// Fire the auto-advance timer if its deadline has passed. Returns the new
    /// state when it fired.
    pub fn tick(&mut self, now: Instant) -> Option<DrillState> {
        if !self.timer.poll(now) {
            return None;
        }
        debug!("auto-advance fired");
        self.advance().ok()
    }

    fn persist(&self) {
        let data = ListeningData {
            session: self.session.clone(),
            stats: self.stats.clone(),
            ..ListeningData::default()
        };
        persist(self.store.as_ref(), LISTENING_KEY, &data);
    }
}

fn repair_session(romanizer: &dyn Romanizer, stored: DrillSession) -> DrillSession {
    let before = stored.queue.len();
    let queue: Vec<DrillItem> = stored
        .queue
        .into_iter()
        .filter_map(|item| {
            if item.is_resolved() {
                Some(item)
            } else {
                resolve_one(romanizer, &item.text)
            }
        })
        .collect();
    if queue.len() != before {
        debug!(before, after = queue.len(), "dropped unresolvable queue entries");
    }
    if queue.is_empty() {
        return DrillSession::default();
    }

    let len = queue.len();
    if stored.completed {
        return DrillSession {
            queue,
            current_index: len,
            hint_index: 0,
            completed: true,
            item_done: false,
        };
    }

    let current_index = stored.current_index.min(len - 1);
    let unit_count = queue[current_index].units.len();
    let (hint_index, item_done) = if stored.hint_index < unit_count {
        (stored.hint_index, stored.item_done)
    } else {
        (0, false)
    };
    DrillSession {
        queue,
        current_index,
        hint_index,
        completed: false,
        item_done,
    }
}
