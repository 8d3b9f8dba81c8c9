use thiserror::Error;

/// Failures of a drill state-machine transition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DrillError {
    /// No phonetic units could be derived for any of the input texts.
    #[error("could not resolve input")]
    Resolution,
    #[error("no drill is active")]
    NotActive,
    #[error("the drill is not completed")]
    NotCompleted,
    /// Every unit of the current item is answered; only an advance is accepted.
    #[error("the current item is already answered")]
    ItemFinished,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// An answer submission that is incomplete; no attempt is recorded.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("enter a syllable")]
    MissingSyllable,
    #[error("choose a tone")]
    MissingTone,
    #[error("this syllable takes the neutral tone")]
    UnexpectedTone,
}

/// An audio resource that could not be played. Treated as "settled" by the
/// sequencer and never surfaced to the learner.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("audio fetch failed: {0}")]
    Fetch(#[from] CacheFetchError),
    #[error("audio output unavailable: {0}")]
    Output(String),
    #[error("audio decode failed: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CacheFetchError {
    #[error("fetch of {url} failed: {reason}")]
    Network { url: String, reason: String },
    #[error("fetch of {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("cache worker is not running")]
    WorkerGone,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding: {0}")]
    Json(#[from] serde_json::Error),
}
