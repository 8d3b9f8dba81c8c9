use std::process::{Command, Stdio};

use crate::audio::resolver::AudioRef;
use crate::error::PlaybackError;
use crate::offline::ResourceFetch;
use crate::romanize::PhoneticUnit;

/// Plays one recording and returns once it has finished (or failed).
pub trait AudioSink: Send {
    fn play(&mut self, audio: &AudioRef) -> Result<(), PlaybackError>;
}

/// Speech-synthesis stand-in for syllables without a recording.
pub trait Speaker: Send {
    fn speak(&mut self, unit: &PhoneticUnit);
}

/// Sink for builds without an audio device. The recording is still fetched
/// through the offline cache so the cache warms, but every call ends in
/// `PlaybackError::Output` since nothing reaches a speaker.
pub struct FetchOnlySink {
    source: Box<dyn ResourceFetch>,
}

impl FetchOnlySink {
    pub fn new(source: Box<dyn ResourceFetch>) -> Self {
        Self { source }
    }
}

impl AudioSink for FetchOnlySink {
    fn play(&mut self, audio: &AudioRef) -> Result<(), PlaybackError> {
        let bytes = self.source.fetch_bytes(&audio.url)?;
        tracing::debug!(key = %audio.key, bytes = bytes.len(), "fetched recording (no audio output)");
        Err(PlaybackError::Output(
            "built without the audio-out feature".to_string(),
        ))
    }
}

#[cfg(feature = "audio-out")]
pub use rodio_sink::RodioSink;

#[cfg(feature = "audio-out")]
mod rodio_sink {
    use std::io::Cursor;

    use rodio::{Decoder, OutputStream, Sink};

    use super::*;

    /// Decodes recordings fetched through the offline cache and blocks until
    /// the device has drained them.
    pub struct RodioSink {
        source: Box<dyn ResourceFetch>,
    }

    impl RodioSink {
        pub fn new(source: Box<dyn ResourceFetch>) -> Self {
            Self { source }
        }
    }

    impl AudioSink for RodioSink {
        fn play(&mut self, audio: &AudioRef) -> Result<(), PlaybackError> {
            let bytes = self.source.fetch_bytes(&audio.url)?;
            let decoder = Decoder::new(Cursor::new(bytes))
                .map_err(|e| PlaybackError::Decode(e.to_string()))?;
            let (_stream, handle) =
                OutputStream::try_default().map_err(|e| PlaybackError::Output(e.to_string()))?;
            let sink = Sink::try_new(&handle).map_err(|e| PlaybackError::Output(e.to_string()))?;
            sink.append(decoder);
            sink.sleep_until_end();
            Ok(())
        }
    }
}

/// Runs an external TTS program (`espeak-ng -v cmn`) with the display form
/// of the syllable as its last argument and waits for it to exit.
#[derive(Clone, Debug, Default)]
pub struct CommandSpeaker {
    program: Option<String>,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn from_command_line(command: Option<&str>) -> Self {
        let mut parts = command.unwrap_or_default().split_whitespace().map(String::from);
        let program = parts.next();
        Self {
            program,
            args: parts.collect(),
        }
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&mut self, unit: &PhoneticUnit) {
        let Some(program) = &self.program else {
            tracing::debug!(display = %unit.display, "no speech command configured");
            return;
        };
        let status = Command::new(program)
            .args(&self.args)
            .arg(&unit.display)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(s) if s.success() => {}
            Ok(s) => tracing::warn!(%program, status = %s, "speech command failed"),
            Err(e) => tracing::warn!(%program, error = %e, "could not run speech command"),
        }
    }
}
