use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::audio::resolver::join_resource;
use crate::error::CacheFetchError;
use crate::offline::fetch::Fetcher;
use crate::offline::storage::CacheStorage;
use crate::offline::{FetchRequest, FetchResponse, ResourceFetch, WorkerMessage, WorkerNotice};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Active,
    Updating,
}

/// The two cache names belonging to one generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheNames {
    pub static_name: String,
    pub audio_name: String,
}

impl CacheNames {
    pub fn for_generation(generation: u32) -> Self {
        Self {
            static_name: format!("tingli-static-v{generation}"),
            audio_name: format!("tingli-audio-v{generation}"),
        }
    }

    fn contains(&self, name: &str) -> bool {
        name == self.static_name || name == self.audio_name
    }
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub generation: u32,
    /// URLs ending in this suffix are treated as recordings.
    pub audio_suffix: String,
    /// Shell assets stored eagerly on install, relative to `asset_base`.
    pub static_assets: Vec<String>,
    pub asset_base: String,
}

pub struct CacheWorker {
    storage: CacheStorage,
    fetcher: Box<dyn Fetcher>,
    config: WorkerConfig,
    names: CacheNames,
    state: WorkerState,
    subscribers: Vec<Sender<WorkerNotice>>,
}

impl CacheWorker {
    pub fn new(storage: CacheStorage, fetcher: Box<dyn Fetcher>, config: WorkerConfig) -> Self {
        let names = CacheNames::for_generation(config.generation);
        Self {
            storage,
            fetcher,
            config,
            names,
            state: WorkerState::Installing,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn names(&self) -> &CacheNames {
        &self.names
    }

    /// Store the shell assets in this generation's static cache. Returns how
    /// many were stored; failures are logged and skipped.
    pub fn install(&mut self) -> usize {
        info!(generation = self.config.generation, "installing offline cache");
        let cache = match self.storage.open(&self.names.static_name) {
            Ok(cache) => cache,
            Err(e) => {
                error!(error = %e, "cannot open static cache");
                return 0;
            }
        };
        // Pre-create the audio cache so activation sees both names.
        if let Err(e) = self.storage.open(&self.names.audio_name) {
            error!(error = %e, "cannot open audio cache");
        }

        let mut stored = 0;
        for asset in &self.config.static_assets {
            let url = join_resource(&self.config.asset_base, asset);
            match self.fetcher.fetch(&FetchRequest::get(&url)) {
                Ok(response) if response.is_ok() => {
                    if cache.put(&url, &response.body) {
                        stored += 1;
                    }
                }
                Ok(response) => warn!(%url, status = response.status, "static asset not cached"),
                Err(e) => warn!(%url, error = %e, "static asset fetch failed"),
            }
        }
        stored
    }

    /// Drop every cache that does not belong to the current generation.
    pub fn activate(&mut self) -> Vec<String> {
        let stale: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|name| !self.names.contains(name))
            .collect();
        for name in &stale {
            info!(cache = %name, "deleting stale cache");
            self.storage.delete(name);
        }
        self.state = WorkerState::Active;
        self.broadcast(WorkerNotice::Activated {
            generation: self.config.generation,
        });
        stale
    }

    pub fn update(&mut self, generation: u32) {
        self.state = WorkerState::Updating;
        self.config.generation = generation;
        self.names = CacheNames::for_generation(generation);
        self.install();
        self.activate();
    }

    pub fn handle_fetch(&self, request: &FetchRequest) -> Result<FetchResponse, CacheFetchError> {
        if request.url.ends_with(&self.config.audio_suffix) {
            self.fetch_audio(request)
        } else {
            self.fetch_static(request)
        }
    }

    fn fetch_audio(&self, request: &FetchRequest) -> Result<FetchResponse, CacheFetchError> {
        let cache = self.storage.open(&self.names.audio_name).ok();
        if let Some(body) = cache.as_ref().and_then(|c| c.get(&request.url)) {
            debug!(url = %request.url, "audio served from cache");
            return Ok(FetchResponse::ok(body));
        }
        let response = self.fetcher.fetch(request).map_err(|e| {
            error!(url = %request.url, error = %e, "audio fetch failed");
            e
        })?;
        if response.is_ok()
            && let Some(cache) = cache
            && cache.put(&request.url, &response.body)
        {
            debug!(url = %request.url, "cached audio file");
        }
        Ok(response)
    }

    fn fetch_static(&self, request: &FetchRequest) -> Result<FetchResponse, CacheFetchError> {
        if let Some(body) = self.storage.match_any(&request.url) {
            return Ok(FetchResponse::ok(body));
        }
        let response = self.fetcher.fetch(request)?;
        if request.is_get()
            && response.is_ok()
            && let Ok(cache) = self.storage.open(&self.names.static_name)
        {
            cache.put(&request.url, &response.body);
        }
        Ok(response)
    }

    pub fn handle_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::PreloadAudio { urls } => {
                let count = self.preload(&urls);
                self.broadcast(WorkerNotice::PreloadComplete { count });
            }
        }
    }

    /// Fetch and store each URL independently. Returns the requested count.
    fn preload(&self, urls: &[String]) -> usize {
        info!(count = urls.len(), "preloading audio files");
        let cache = match self.storage.open(&self.names.audio_name) {
            Ok(cache) => cache,
            Err(e) => {
                error!(error = %e, "cannot open audio cache");
                return urls.len();
            }
        };
        for url in urls {
            match self.fetcher.fetch(&FetchRequest::get(url)) {
                Ok(response) if response.is_ok() => {
                    cache.put(url, &response.body);
                }
                Ok(response) => warn!(%url, status = response.status, "preload skipped"),
                Err(e) => warn!(%url, error = %e, "failed to preload audio"),
            }
        }
        info!("audio preloading complete");
        urls.len()
    }

    pub fn subscribe(&mut self, tx: Sender<WorkerNotice>) {
        self.subscribers.push(tx);
    }

    fn broadcast(&mut self, notice: WorkerNotice) {
        self.subscribers.retain(|tx| tx.send(notice.clone()).is_ok());
    }

    pub fn run(mut self, commands: Receiver<WorkerCommand>) {
        self.install();
        self.activate();
        while let Ok(command) = commands.recv() {
            match command {
                WorkerCommand::Fetch { request, reply } => {
                    let _ = reply.send(self.handle_fetch(&request));
                }
                WorkerCommand::Message(message) => self.handle_message(message),
                WorkerCommand::Subscribe(tx) => self.subscribe(tx),
                WorkerCommand::Update { generation } => self.update(generation),
                WorkerCommand::Shutdown => break,
            }
        }
        info!("cache worker exiting");
    }
}

pub enum WorkerCommand {
    Fetch {
        request: FetchRequest,
        reply: Sender<Result<FetchResponse, CacheFetchError>>,
    },
    Message(WorkerMessage),
    Subscribe(Sender<WorkerNotice>),
    Update {
        generation: u32,
    },
    Shutdown,
}

/// Cheap handle for talking to the worker thread.
#[derive(Clone)]
pub struct CacheClient {
    tx: Sender<WorkerCommand>,
}

impl CacheClient {
    pub fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, CacheFetchError> {
        let (reply, response) = channel();
        self.tx
            .send(WorkerCommand::Fetch { request, reply })
            .map_err(|_| CacheFetchError::WorkerGone)?;
        response.recv().map_err(|_| CacheFetchError::WorkerGone)?
    }

    pub fn post(&self, message: WorkerMessage) -> Result<(), CacheFetchError> {
        self.tx
            .send(WorkerCommand::Message(message))
            .map_err(|_| CacheFetchError::WorkerGone)
    }

    pub fn subscribe(&self) -> Result<Receiver<WorkerNotice>, CacheFetchError> {
        let (tx, rx) = channel();
        self.tx
            .send(WorkerCommand::Subscribe(tx))
            .map_err(|_| CacheFetchError::WorkerGone)?;
        Ok(rx)
    }

    pub fn update(&self, generation: u32) -> Result<(), CacheFetchError> {
        self.tx
            .send(WorkerCommand::Update { generation })
            .map_err(|_| CacheFetchError::WorkerGone)
    }
}

impl ResourceFetch for CacheClient {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CacheFetchError> {
        let response = self.fetch(FetchRequest::get(url))?;
        if response.is_ok() {
            Ok(response.body)
        } else {
            Err(CacheFetchError::Status {
                url: url.to_string(),
                status: response.status,
            })
        }
    }
}

/// Owner of the worker thread; shuts it down on drop.
pub struct OfflineCache {
    client: CacheClient,
    join: Option<JoinHandle<()>>,
}

impl OfflineCache {
    pub fn spawn(
        storage: CacheStorage,
        fetcher: Box<dyn Fetcher>,
        config: WorkerConfig,
    ) -> std::io::Result<Self> {
        let (tx, rx) = channel();
        let worker = CacheWorker::new(storage, fetcher, config);
        let join = thread::Builder::new()
            .name("offline-cache".to_string())
            .spawn(move || worker.run(rx))?;
        Ok(Self {
            client: CacheClient { tx },
            join: Some(join),
        })
    }

    pub fn client(&self) -> CacheClient {
        self.client.clone()
    }
}

impl Drop for OfflineCache {
    fn drop(&mut self) {
        let _ = self.client.tx.send(WorkerCommand::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;
    use tempfile::TempDir;

    /// Serves canned responses and counts network hits per URL.
    #[derive(Clone, Default)]
    struct FakeNetwork {
        responses: HashMap<String, Result<FetchResponse, CacheFetchError>>,
        hits: Arc<Mutex<Vec<String>>>,
    }

    impl FakeNetwork {
        fn serve(mut self, url: &str, body: &[u8]) -> Self {
            self.responses
                .insert(url.to_string(), Ok(FetchResponse::ok(body.to_vec())));
            self
        }

        fn status(mut self, url: &str, status: u16) -> Self {
            self.responses.insert(
                url.to_string(),
                Ok(FetchResponse {
                    status,
                    body: Vec::new(),
                }),
            );
            self
        }

        fn hits(&self, url: &str) -> usize {
            self.hits.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    impl Fetcher for FakeNetwork {
        fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, CacheFetchError> {
            self.hits.lock().unwrap().push(request.url.clone());
            self.responses
                .get(&request.url)
                .cloned()
                .unwrap_or_else(|| {
                    Err(CacheFetchError::Network {
                        url: request.url.clone(),
                        reason: "offline".to_string(),
                    })
                })
        }
    }

    fn config(generation: u32) -> WorkerConfig {
        WorkerConfig {
            generation,
            audio_suffix: ".mp3".to_string(),
            static_assets: vec!["catalog.json".to_string()],
            asset_base: "https://cdn".to_string(),
        }
    }

    fn worker(net: &FakeNetwork, generation: u32) -> (TempDir, CacheWorker) {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::with_base_dir(dir.path().to_path_buf()).unwrap();
        let worker = CacheWorker::new(storage, Box::new(net.clone()), config(generation));
        (dir, worker)
    }

    #[test]
    fn install_caches_shell_assets() {
        let net = FakeNetwork::default().serve("https://cdn/catalog.json", b"[]");
        let (_dir, mut worker) = worker(&net, 1);
        assert_eq!(worker.state(), WorkerState::Installing);
        assert_eq!(worker.install(), 1);
        worker.activate();
        assert_eq!(worker.state(), WorkerState::Active);

        let response = worker
            .handle_fetch(&FetchRequest::get("https://cdn/catalog.json"))
            .unwrap();
        assert_eq!(response.body, b"[]");
        assert_eq!(net.hits("https://cdn/catalog.json"), 1);
    }

    #[test]
    fn audio_is_cache_first() {
        let net = FakeNetwork::default().serve("https://cdn/ni3.mp3", b"ni");
        let (_dir, mut worker) = worker(&net, 1);
        worker.install();
        worker.activate();

        for _ in 0..3 {
            let response = worker
                .handle_fetch(&FetchRequest::get("https://cdn/ni3.mp3"))
                .unwrap();
            assert_eq!(response.body, b"ni");
        }
        assert_eq!(net.hits("https://cdn/ni3.mp3"), 1);
    }

    #[test]
    fn audio_fetch_failure_propagates() {
        let net = FakeNetwork::default();
        let (_dir, worker) = worker(&net, 1);
        let err = worker
            .handle_fetch(&FetchRequest::get("https://cdn/hao3.mp3"))
            .unwrap_err();
        assert!(matches!(err, CacheFetchError::Network { .. }));
    }

    #[test]
    fn non_ok_and_non_get_responses_are_not_cached() {
        let net = FakeNetwork::default()
            .status("https://cdn/missing.json", 404)
            .serve("https://cdn/form", b"ok");
        let (_dir, worker) = worker(&net, 1);

        for _ in 0..2 {
            let response = worker
                .handle_fetch(&FetchRequest::get("https://cdn/missing.json"))
                .unwrap();
            assert_eq!(response.status, 404);
        }
        assert_eq!(net.hits("https://cdn/missing.json"), 2);

        let post = FetchRequest {
            method: "POST".to_string(),
            url: "https://cdn/form".to_string(),
        };
        worker.handle_fetch(&post).unwrap();
        worker.handle_fetch(&post).unwrap();
        assert_eq!(net.hits("https://cdn/form"), 2);
    }

    #[test]
    fn activation_deletes_stale_generations() {
        let net = FakeNetwork::default();
        let (dir, mut worker) = worker(&net, 2);
        let storage = CacheStorage::with_base_dir(dir.path().to_path_buf()).unwrap();
        storage.open("tingli-static-v1").unwrap();
        storage.open("tingli-audio-v1").unwrap();
        storage.open("something-else").unwrap();

        worker.install();
        let mut deleted = worker.activate();
        deleted.sort();
        assert_eq!(
            deleted,
            vec!["something-else", "tingli-audio-v1", "tingli-static-v1"]
        );
        assert_eq!(storage.keys(), vec!["tingli-audio-v2", "tingli-static-v2"]);
    }

    #[test]
    fn update_moves_to_new_generation() {
        let net = FakeNetwork::default();
        let (dir, mut worker) = worker(&net, 1);
        worker.install();
        worker.activate();
        worker.update(2);
        assert_eq!(worker.state(), WorkerState::Active);
        assert_eq!(worker.names(), &CacheNames::for_generation(2));
        let storage = CacheStorage::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(storage.keys(), vec!["tingli-audio-v2", "tingli-static-v2"]);
    }

    #[test]
    fn preload_survives_partial_failure() {
        let net = FakeNetwork::default()
            .serve("https://cdn/a1.mp3", b"a")
            .serve("https://cdn/a2.mp3", b"a");
        let (_dir, mut worker) = worker(&net, 1);
        worker.install();
        worker.activate();
        let (tx, rx) = channel();
        worker.subscribe(tx);

        worker.handle_message(WorkerMessage::PreloadAudio {
            urls: vec![
                "https://cdn/a1.mp3".into(),
                "https://cdn/broken.mp3".into(),
                "https://cdn/a2.mp3".into(),
            ],
        });
        assert_eq!(rx.recv().unwrap(), WorkerNotice::PreloadComplete { count: 3 });

        // Preloaded files are served without another network hit.
        worker
            .handle_fetch(&FetchRequest::get("https://cdn/a2.mp3"))
            .unwrap();
        assert_eq!(net.hits("https://cdn/a2.mp3"), 1);
    }

    #[test]
    fn broadcast_drops_disconnected_subscribers() {
        let net = FakeNetwork::default();
        let (_dir, mut worker) = worker(&net, 1);
        let (gone_tx, gone_rx) = channel();
        let (live_tx, live_rx) = channel();
        worker.subscribe(gone_tx);
        worker.subscribe(live_tx);
        drop(gone_rx);

        worker.handle_message(WorkerMessage::PreloadAudio { urls: vec![] });
        assert_eq!(
            live_rx.recv().unwrap(),
            WorkerNotice::PreloadComplete { count: 0 }
        );
        assert_eq!(worker.subscribers.len(), 1);
    }

    #[test]
    fn spawned_worker_serves_clients() {
        let net = FakeNetwork::default().serve("https://cdn/ni3.mp3", b"ni");
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::with_base_dir(dir.path().to_path_buf()).unwrap();
        let cache = OfflineCache::spawn(storage, Box::new(net.clone()), config(1)).unwrap();
        let client = cache.client();

        let notices = client.subscribe().unwrap();
        assert_eq!(client.fetch_bytes("https://cdn/ni3.mp3").unwrap(), b"ni");
        assert!(matches!(
            client.fetch_bytes("https://cdn/zz1.mp3"),
            Err(CacheFetchError::Network { .. })
        ));

        client
            .post(WorkerMessage::PreloadAudio {
                urls: vec!["https://cdn/ni3.mp3".into()],
            })
            .unwrap();
        assert_eq!(
            notices.recv().unwrap(),
            WorkerNotice::PreloadComplete { count: 1 }
        );

        drop(cache);
        assert_eq!(
            client.fetch_bytes("https://cdn/ni3.mp3"),
            Err(CacheFetchError::WorkerGone)
        );
    }
}
