#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashsync::error::{Error, Result};
use dashsync::local::{FileStore, LocalStore, MemoryStore};
use dashsync::model::CollectionKind;
use dashsync::remote::RemoteStore;
use dashsync::server::{self, ApiStore};
use dashsync::Synchronizer;
use serde_json::Value;
use tokio::sync::oneshot;

/// Scriptable in-process remote
#[derive(Default)]
pub struct FakeRemote {
    healthy: AtomicBool,
    push_ok: AtomicBool,
    collections: Mutex<HashMap<CollectionKind, std::result::Result<Vec<Value>, String>>>,
    pushes: Mutex<Vec<(CollectionKind, Vec<Value>)>>,
    health_checks: AtomicUsize,
    fetches: AtomicUsize,
}

impl FakeRemote {
    /// Reachable, accepts pushes, serves empty collections
    pub fn online() -> Self {
        let remote = Self::default();
        remote.healthy.store(true, Ordering::SeqCst);
        remote.push_ok.store(true, Ordering::SeqCst);
        remote
    }

    /// Health check fails and every fetch errors
    pub fn unreachable() -> Self {
        let remote = Self::default();
        remote.fail_fetch(CollectionKind::Sheets, "connection refused");
        remote.fail_fetch(CollectionKind::Tasks, "connection refused");
        remote
    }

    pub fn with_collection(self, kind: CollectionKind, values: Vec<Value>) -> Self {
        self.collections.lock().unwrap().insert(kind, Ok(values));
        self
    }

    pub fn fail_fetch(&self, kind: CollectionKind, message: &str) {
        self.collections
            .lock()
            .unwrap()
            .insert(kind, Err(message.to_string()));
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_push_ok(&self, ok: bool) {
        self.push_ok.store(ok, Ordering::SeqCst);
    }

    pub fn pushes(&self) -> Vec<(CollectionKind, Vec<Value>)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn last_push(&self, kind: CollectionKind) -> Option<Vec<Value>> {
        self.pushes()
            .into_iter()
            .rev()
            .find(|(pushed, _)| *pushed == kind)
            .map(|(_, values)| values)
    }

    pub fn health_checks(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Calls of any kind other than health probes
    pub fn data_calls(&self) -> usize {
        self.fetches() + self.pushes.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn check_health(&self) -> bool {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        self.healthy.load(Ordering::SeqCst)
    }

    async fn fetch_collection(&self, kind: CollectionKind) -> Result<Vec<Value>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.collections.lock().unwrap().get(&kind) {
            Some(Ok(values)) => Ok(values.clone()),
            Some(Err(message)) => Err(Error::Network(message.clone())),
            None => Ok(Vec::new()),
        }
    }

    async fn push_collection(&self, kind: CollectionKind, records: Vec<Value>) -> bool {
        let ok = self.push_ok.load(Ordering::SeqCst);
        if ok {
            self.collections
                .lock()
                .unwrap()
                .insert(kind, Ok(records.clone()));
        }
        self.pushes.lock().unwrap().push((kind, records));
        ok
    }
}

pub fn memory_sync(remote: Arc<FakeRemote>) -> (Synchronizer, Arc<MemoryStore>) {
    let local = Arc::new(MemoryStore::new());
    let sync = Synchronizer::new(remote, local.clone());
    (sync, local)
}

pub fn file_sync(remote: Arc<dyn RemoteStore>, dir: &Path) -> Synchronizer {
    let local: Arc<dyn LocalStore> = Arc::new(FileStore::new(dir));
    Synchronizer::new(remote, local)
}

/// A real API server on an ephemeral port, stopped on drop
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<ApiStore>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start(store: ApiStore) -> Self {
        let listener = server::bind("127.0.0.1", 0).await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let store = Arc::new(store);
        let (tx, rx) = oneshot::channel::<()>();

        let served = Arc::clone(&store);
        tokio::spawn(async move {
            let _ = server::serve(listener, served, async {
                let _ = rx.await;
            })
            .await;
        });

        Self {
            addr,
            store,
            shutdown: Some(tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
