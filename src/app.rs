use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rust_i18n::t;
use tracing::{debug, info, warn};

use crate::audio::{
    AudioResolver, AudioSink, Catalog, CommandSpeaker, PlaybackSequencer, SequenceReport,
};
use crate::config::Config;
use crate::error::{DrillError, ValidationError};
use crate::offline::{
    CacheClient, CacheStorage, OfflineCache, ResourceFetch, SourceFetcher, WorkerConfig,
    WorkerMessage, WorkerNotice,
};
use crate::romanize::resolver::split_source_list;
use crate::romanize::{HanziRomanizer, PhoneticUnit, Romanizer};
use crate::session::{CheckOutcome, DrillState, ListeningDrill, PhoneticDrill, Stats};
use crate::store::KvStore;

const RECENT_ATTEMPTS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrillMode {
    Listening,
    Phonetic,
}

/// Background audio: the offline cache worker and the playback thread.
struct AudioStack {
    cache: Option<OfflineCache>,
    sequencer: PlaybackSequencer,
    notices: Option<Receiver<WorkerNotice>>,
    last_report: Option<Receiver<SequenceReport>>,
}

pub struct App {
    pub config: Config,
    pub mode: DrillMode,
    pub should_quit: bool,
    listening: ListeningDrill,
    phonetic: PhoneticDrill,
    resolver: AudioResolver,
    audio: Option<AudioStack>,
    rng: SmallRng,
}

impl App {
    /// Full application with the cache worker and playback thread running.
    pub fn new(config: Config, store: Rc<dyn KvStore>) -> Result<Self> {
        let catalog = Catalog::load(config.catalog_path.as_deref().map(Path::new))?;
        let mut app = Self::headless(config, store, catalog, Box::new(HanziRomanizer));
        app.audio = start_audio(&app.config);
        Ok(app)
    }

    /// No background threads; nothing is fetched or played.
    pub fn headless(
        config: Config,
        store: Rc<dyn KvStore>,
        catalog: Catalog,
        romanizer: Box<dyn Romanizer>,
    ) -> Self {
        let listening = ListeningDrill::rehydrate(romanizer, Rc::clone(&store))
            .with_auto_advance(config.auto_advance, config.advance_delay());
        let phonetic = PhoneticDrill::rehydrate(store);
        let resolver = AudioResolver::new(catalog, config.audio_base_url.clone());
        Self {
            config,
            mode: DrillMode::Listening,
            should_quit: false,
            listening,
            phonetic,
            resolver,
            audio: None,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn listening(&self) -> &ListeningDrill {
        &self.listening
    }

    pub fn phonetic(&self) -> &PhoneticDrill {
        &self.phonetic
    }

    pub fn resolver(&self) -> &AudioResolver {
        &self.resolver
    }

    pub fn start_listening<S: AsRef<str>>(&mut self, texts: &[S]) -> Vec<String> {
        self.mode = DrillMode::Listening;
        match self.listening.start(texts) {
            Ok(count) => {
                self.play_current();
                vec![t!("started", count = count).to_string(), self.prompt()]
            }
            Err(e) => vec![describe_error(&e)],
        }
    }

    pub fn start_phonetic(&mut self) -> Vec<String> {
        self.mode = DrillMode::Phonetic;
        let size = self.config.phonetic_rotation_size;
        match self
            .phonetic
            .start(self.resolver.catalog(), size, &mut self.rng)
        {
            Ok(count) => {
                self.play_current();
                vec![t!("phonetic_started", count = count).to_string(), self.prompt()]
            }
            Err(e) => vec![describe_error(&e)],
        }
    }

    /// Resume whatever drill was persisted, preferring the listening one.
    pub fn resume(&mut self) -> Vec<String> {
        if self.mode == DrillMode::Listening && self.listening.state() == DrillState::Idle {
            return vec![t!("idle").to_string()];
        }
        self.play_current();
        vec![self.prompt()]
    }

    pub fn handle_line(&mut self, line: &str, now: Instant) -> Vec<String> {
        let line = line.trim();
        if let Some(command) = line.strip_prefix(':') {
            return self.handle_command(command.trim());
        }
        match self.mode {
            DrillMode::Listening => self.answer_listening(line, now),
            DrillMode::Phonetic => self.answer_phonetic(line),
        }
    }

    fn handle_command(&mut self, command: &str) -> Vec<String> {
        match command {
            "next" | "n" => self.next_item(),
            "replay" | "r" => {
                self.play_current();
                vec![self.prompt()]
            }
            "restart" => match self.listening.restart() {
                Ok(()) => {
                    self.mode = DrillMode::Listening;
                    self.play_current();
                    vec![self.prompt()]
                }
                Err(e) => vec![describe_error(&e)],
            },
            "reset" => {
                self.cancel_playback();
                match self.mode {
                    DrillMode::Listening => self.listening.reset(),
                    DrillMode::Phonetic => self.phonetic.reset(),
                }
                vec![t!("reset_done").to_string()]
            }
            "stats" | "s" => self.stats_report(),
            "quit" | "q" => {
                self.should_quit = true;
                Vec::new()
            }
            "help" | "h" | "?" => vec![t!("help").to_string()],
            other => vec![t!("unknown_command", command = other).to_string()],
        }
    }

    /// Clear both drills and their statistics.
    pub fn reset_all(&mut self) -> Vec<String> {
        self.cancel_playback();
        self.listening.reset();
        self.phonetic.reset();
        vec![t!("reset_done").to_string()]
    }

    fn answer_listening(&mut self, line: &str, now: Instant) -> Vec<String> {
        if self.listening.state() == DrillState::Idle {
            if line.is_empty() {
                return vec![t!("idle").to_string()];
            }
            return self.start_listening(&split_source_list(line));
        }
        match self.listening.check_answer(line, None, now) {
            Ok(CheckOutcome::Incorrect { expected }) => {
                vec![t!("incorrect", display = expected.display).to_string()]
            }
            Ok(CheckOutcome::Correct { unit, .. }) => {
                vec![t!("correct_partial", display = unit.display).to_string(), self.prompt()]
            }
            Ok(CheckOutcome::ItemComplete { advance_at, .. }) => {
                let display = self
                    .listening
                    .current_item()
                    .map(|item| format!("{} {}", item.text, item.display))
                    .unwrap_or_default();
                let mut messages = vec![t!("correct_item", display = display).to_string()];
                if advance_at.is_none() {
                    messages.push(t!("press_next").to_string());
                }
                messages
            }
            Err(e) => vec![describe_error(&e)],
        }
    }

    fn answer_phonetic(&mut self, line: &str) -> Vec<String> {
        match self.phonetic.check_answer(line, None) {
            Ok(outcome) => {
                let mut messages = vec![if outcome.correct {
                    t!("correct_item", display = outcome.expected.display).to_string()
                } else {
                    t!("incorrect", display = outcome.expected.display).to_string()
                }];
                if outcome.finished {
                    messages.push(t!("phonetic_finished").to_string());
                } else {
                    self.play_current();
                    messages.push(self.prompt());
                }
                messages
            }
            Err(e) => vec![describe_error(&e)],
        }
    }

    fn next_item(&mut self) -> Vec<String> {
        if self.mode == DrillMode::Phonetic {
            return vec![describe_error(&DrillError::NotActive)];
        }
        match self.listening.advance() {
            Ok(state) => self.after_advance(state),
            Err(e) => vec![describe_error(&e)],
        }
    }

    fn after_advance(&mut self, state: DrillState) -> Vec<String> {
        match state {
            DrillState::Completed => {
                let stats = self.listening.stats();
                vec![
                    t!(
                        "completed",
                        correct = stats.correct,
                        incorrect = stats.incorrect
                    )
                    .to_string(),
                ]
            }
            _ => {
                self.play_current();
                vec![self.prompt()]
            }
        }
    }

    /// Fire due timers and drain background notices.
    pub fn tick(&mut self, now: Instant) -> Vec<String> {
        let mut messages = Vec::new();
        if self.mode == DrillMode::Listening
            && let Some(state) = self.listening.tick(now)
        {
            messages.extend(self.after_advance(state));
        }
        if let Some(audio) = &mut self.audio {
            if let Some(notices) = &audio.notices {
                for notice in notices.try_iter() {
                    if let WorkerNotice::PreloadComplete { count } = notice {
                        messages.push(preload_message(count));
                    }
                }
            }
            if let Some(report) = audio.last_report.as_ref().and_then(|rx| rx.try_recv().ok()) {
                debug!(?report, "sequence settled");
                audio.last_report = None;
            }
        }
        messages
    }

    pub fn prompt(&self) -> String {
        match self.mode {
            DrillMode::Listening => match self.listening.state() {
                DrillState::Idle => t!("idle").to_string(),
                DrillState::Completed => t!("completed_prompt").to_string(),
                DrillState::Active => {
                    let session = self.listening.session();
                    let count = self
                        .listening
                        .current_item()
                        .map_or(0, |item| item.units.len());
                    let revealed: Vec<&str> = self
                        .listening
                        .revealed_units()
                        .iter()
                        .map(|u| u.display.as_str())
                        .collect();
                    t!(
                        "prompt_listen",
                        index = session.current_index + 1,
                        total = session.queue.len(),
                        syllable = session.hint_index + 1,
                        count = count,
                        revealed = revealed.join(" ")
                    )
                    .to_string()
                }
            },
            DrillMode::Phonetic => match self.phonetic.current() {
                Some(_) => t!("prompt_phonetic", left = self.phonetic.rotation().len()).to_string(),
                None => t!("phonetic_finished").to_string(),
            },
        }
    }

    pub fn stats_report(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (name, stats) in [
            (t!("listening_name"), self.listening.stats()),
            (t!("phonetic_name"), self.phonetic.stats()),
        ] {
            lines.push(stats_line(&name, stats));
            for record in stats.recent(RECENT_ATTEMPTS) {
                lines.push(format!(
                    "  {} {} {} -> {} ({})",
                    if record.correct { "+" } else { "-" },
                    record.timestamp.format("%Y-%m-%d %H:%M"),
                    record.source_text,
                    record.user_answer,
                    record.expected_code,
                ));
            }
        }
        lines
    }

    fn current_units(&self) -> Vec<PhoneticUnit> {
        match self.mode {
            DrillMode::Listening => self
                .listening
                .current_item()
                .map(|item| item.units.clone())
                .unwrap_or_default(),
            DrillMode::Phonetic => self.phonetic.current().cloned().into_iter().collect(),
        }
    }

    fn play_current(&mut self) {
        let units = self.current_units();
        if units.is_empty() {
            return;
        }
        if let Some(audio) = &mut self.audio {
            audio.last_report = Some(audio.sequencer.play_sequence(&self.resolver, &units));
        }
    }

    fn cancel_playback(&self) {
        if let Some(audio) = &self.audio {
            audio.sequencer.cancel();
        }
    }

    /// Ask the cache worker to store every catalog recording and wait for it
    /// to report back.
    pub fn preload(&self, timeout: Duration) -> Result<usize> {
        let Some(client) = self.cache_client() else {
            bail!("offline cache is not available");
        };
        let notices = client.subscribe()?;
        let urls = self.resolver.all_urls();
        info!(count = urls.len(), "requesting audio preload");
        client.post(WorkerMessage::PreloadAudio { urls })?;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match notices.recv_timeout(remaining) {
                Ok(WorkerNotice::PreloadComplete { count }) => return Ok(count),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => bail!("audio preload timed out"),
                Err(RecvTimeoutError::Disconnected) => bail!("offline cache stopped"),
            }
        }
    }

    fn cache_client(&self) -> Option<CacheClient> {
        self.audio.as_ref()?.cache.as_ref().map(OfflineCache::client)
    }
}

pub fn preload_message(count: usize) -> String {
    t!("preload_complete", count = count).to_string()
}

pub fn stats_line(name: &str, stats: &Stats) -> String {
    t!(
        "stats_line",
        name = name,
        correct = stats.correct,
        incorrect = stats.incorrect,
        accuracy = format!("{:.0}", stats.accuracy())
    )
    .to_string()
}

pub fn describe_error(error: &DrillError) -> String {
    match error {
        DrillError::Resolution => t!("error.resolution").to_string(),
        DrillError::NotActive => t!("error.not_active").to_string(),
        DrillError::NotCompleted => t!("error.not_completed").to_string(),
        DrillError::ItemFinished => t!("press_next").to_string(),
        DrillError::Validation(ValidationError::MissingSyllable) => {
            t!("error.missing_syllable").to_string()
        }
        DrillError::Validation(ValidationError::MissingTone) => {
            t!("error.missing_tone").to_string()
        }
        DrillError::Validation(ValidationError::UnexpectedTone) => {
            t!("error.unexpected_tone").to_string()
        }
    }
}

fn start_audio(config: &Config) -> Option<AudioStack> {
    let cache = CacheStorage::new().and_then(|storage| {
        let worker_config = WorkerConfig {
            generation: config.cache_generation,
            audio_suffix: config.audio_suffix.clone(),
            static_assets: config.static_assets.clone(),
            asset_base: config.audio_base_url.clone(),
        };
        OfflineCache::spawn(storage, Box::new(SourceFetcher::new()), worker_config)
            .map_err(|e| warn!(error = %e, "offline cache unavailable"))
            .ok()
    });

    let source: Box<dyn ResourceFetch> = match &cache {
        Some(cache) => Box::new(cache.client()),
        None => Box::new(SourceFetcher::new()),
    };
    let notices = cache.as_ref().and_then(|c| c.client().subscribe().ok());
    let speaker = CommandSpeaker::from_command_line(config.speech_command.as_deref());
    match PlaybackSequencer::spawn(make_sink(source), Box::new(speaker)) {
        Ok(sequencer) => Some(AudioStack {
            cache,
            sequencer,
            notices,
            last_report: None,
        }),
        Err(e) => {
            warn!(error = %e, "playback thread unavailable");
            None
        }
    }
}

#[cfg(feature = "audio-out")]
fn make_sink(source: Box<dyn ResourceFetch>) -> Box<dyn AudioSink> {
    Box::new(crate::audio::output::RodioSink::new(source))
}

#[cfg(not(feature = "audio-out"))]
fn make_sink(source: Box<dyn ResourceFetch>) -> Box<dyn AudioSink> {
    warn!("built without the audio-out feature; recordings are cached but not played");
    Box::new(crate::audio::FetchOnlySink::new(source))
}
