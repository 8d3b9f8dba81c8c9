//! Background cache for recordings and static assets.
//!
//! The worker runs on its own thread and only talks to the rest of the app
//! through channels: fetch requests with a reply channel, protocol messages
//! such as `PRELOAD_AUDIO`, and broadcast notices such as `PRELOAD_COMPLETE`.
//! Playback goes through [`CacheClient`] as a plain [`ResourceFetch`] and does
//! not know whether a recording came from disk or the network.

pub mod fetch;
pub mod storage;
pub mod worker;

use serde::{Deserialize, Serialize};

use crate::error::CacheFetchError;

pub use fetch::{Fetcher, SourceFetcher};
pub use storage::{CacheStorage, DiskCache};
pub use worker::{CacheClient, CacheNames, CacheWorker, OfflineCache, WorkerConfig, WorkerState};

/// Anything that can hand over the bytes behind a URL.
pub trait ResourceFetch: Send {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CacheFetchError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: String,
    pub url: String,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Requests accepted by the worker, in their wire shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    PreloadAudio { urls: Vec<String> },
}

/// Notices broadcast to every subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerNotice {
    /// `count` is the number of URLs requested, not the number stored.
    PreloadComplete { count: usize },
    Activated { generation: u32 },
}
