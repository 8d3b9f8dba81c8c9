use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use crate::audio::output::{AudioSink, Speaker};
use crate::audio::resolver::{AudioRef, AudioResolver};
use crate::romanize::PhoneticUnit;

/// What one requested sequence ended up doing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceReport {
    pub token: u64,
    /// Recordings that played to the end.
    pub played: usize,
    /// Recordings that failed; they still count as settled.
    pub failed: usize,
    /// Units handed to the speech fallback.
    pub spoken: usize,
    /// Units abandoned because a newer sequence was requested.
    pub skipped: usize,
}

#[derive(Clone, Debug)]
pub enum Step {
    Audio(PhoneticUnit, AudioRef),
    Speak(PhoneticUnit),
}

struct PlayRequest {
    token: u64,
    steps: Vec<Step>,
    done: Sender<SequenceReport>,
}

/// Plays units back to back on a dedicated thread.
///
/// Every request bumps the shared sequence token; the playback loop checks the
/// token before each unit, so a superseded sequence stops after whatever unit
/// is already sounding.
pub struct PlaybackSequencer {
    tx: Option<Sender<PlayRequest>>,
    current: Arc<AtomicU64>,
    join: Option<JoinHandle<()>>,
}

impl PlaybackSequencer {
    pub fn spawn(sink: Box<dyn AudioSink>, speaker: Box<dyn Speaker>) -> std::io::Result<Self> {
        let current = Arc::new(AtomicU64::new(0));
        let (tx, rx) = channel::<PlayRequest>();
        let thread_current = Arc::clone(&current);
        let join = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || {
                let mut sink = sink;
                let mut speaker = speaker;
                while let Ok(request) = rx.recv() {
                    let report = run_sequence(
                        request.token,
                        &thread_current,
                        &request.steps,
                        sink.as_mut(),
                        speaker.as_mut(),
                    );
                    let _ = request.done.send(report);
                }
                info!("playback thread exiting");
            })?;
        Ok(Self {
            tx: Some(tx),
            current,
            join: Some(join),
        })
    }

    /// Queue `units` for playback, superseding any sequence still in flight.
    /// The receiver yields the report once the sequence has settled.
    pub fn play_sequence(
        &self,
        resolver: &AudioResolver,
        units: &[PhoneticUnit],
    ) -> Receiver<SequenceReport> {
        let steps = plan(resolver, units);
        let token = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        let (done, report) = channel();
        if let Some(tx) = &self.tx
            && tx.send(PlayRequest { token, steps, done }).is_err()
        {
            tracing::warn!("playback thread is gone; sequence dropped");
        }
        report
    }

    /// Abandon whatever is queued or playing without starting anything new.
    pub fn cancel(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current_token(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

impl Drop for PlaybackSequencer {
    fn drop(&mut self) {
        self.cancel();
        self.tx.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Resolve each unit's recording up front, on the caller's thread.
pub fn plan(resolver: &AudioResolver, units: &[PhoneticUnit]) -> Vec<Step> {
    units
        .iter()
        .map(|unit| match resolver.resolve(unit) {
            Some(audio) => Step::Audio(unit.clone(), audio),
            None => Step::Speak(unit.clone()),
        })
        .collect()
}

pub fn run_sequence(
    token: u64,
    current: &AtomicU64,
    steps: &[Step],
    sink: &mut dyn AudioSink,
    speaker: &mut dyn Speaker,
) -> SequenceReport {
    let mut report = SequenceReport {
        token,
        ..SequenceReport::default()
    };
    for (i, step) in steps.iter().enumerate() {
        if current.load(Ordering::SeqCst) != token {
            report.skipped = steps.len() - i;
            debug!(token, skipped = report.skipped, "sequence superseded");
            break;
        }
        match step {
            Step::Audio(unit, audio) => match sink.play(audio) {
                Ok(()) => report.played += 1,
                Err(e) => {
                    debug!(code = %unit.code, error = %e, "playback failed; treating as settled");
                    report.failed += 1;
                }
            },
            Step::Speak(unit) => {
                speaker.speak(unit);
                report.spoken += 1;
            }
        }
    }
    report
}
