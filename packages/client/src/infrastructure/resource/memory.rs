//! In-memory ResourceLoader 実装
//!
//! 事前に登録したカタログからスプライトシートを解決します。
//! `hold` を呼ぶと以降の `load` は `release_*` されるまで完了しません。
//! 複数のリコンサイルが読み込み待ちで重なる状況を再現するために使います。

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::domain::{ResourceLoader, SpriteSheet, TextureKey};

#[derive(Default)]
struct LoaderState {
    queued: HashSet<TextureKey>,
    loaded: HashMap<TextureKey, Arc<SpriteSheet>>,
    /// Keys that finished loading without resolving
    failed: HashSet<TextureKey>,
    enqueue_count: usize,
}

/// Catalog-backed resource loader
#[derive(Default)]
pub struct InMemoryResourceLoader {
    catalog: HashMap<TextureKey, Arc<SpriteSheet>>,
    state: Mutex<LoaderState>,
    held: AtomicBool,
    pending: Mutex<VecDeque<oneshot::Sender<()>>>,
}

impl InMemoryResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sprite sheet under `key`.
    pub fn with_sheet(mut self, key: &str, sheet: SpriteSheet) -> Self {
        if let Ok(key) = TextureKey::new(key.to_string()) {
            self.catalog.insert(key, Arc::new(sheet));
        }
        self
    }

    /// Hold every subsequent `load` until released.
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Number of `load` calls currently held.
    pub fn pending_loads(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Release the oldest held `load`. Returns `false` when none is held.
    pub fn release_oldest(&self) -> bool {
        let sender = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        sender.is_some_and(|tx| tx.send(()).is_ok())
    }

    /// Release the newest held `load`. Returns `false` when none is held.
    pub fn release_newest(&self) -> bool {
        let sender = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_back();
        sender.is_some_and(|tx| tx.send(()).is_ok())
    }

    /// Number of keys actually enqueued (duplicates excluded).
    pub fn enqueue_count(&self) -> usize {
        self.lock_state().enqueue_count
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve_queued(&self) {
        let mut state = self.lock_state();
        let queued: Vec<TextureKey> = state.queued.drain().collect();
        for key in queued {
            match self.catalog.get(&key) {
                Some(sheet) => {
                    state.loaded.insert(key, Arc::clone(sheet));
                }
                None => {
                    tracing::warn!("Texture '{}' is not in the catalog", key);
                    state.failed.insert(key);
                }
            }
        }
    }
}

#[async_trait]
impl ResourceLoader for InMemoryResourceLoader {
    fn enqueue(&self, key: &TextureKey) -> bool {
        let mut state = self.lock_state();
        if state.queued.contains(key) || state.loaded.contains_key(key) || state.failed.contains(key)
        {
            return false;
        }
        state.queued.insert(key.clone());
        state.enqueue_count += 1;
        true
    }

    async fn load(&self) {
        if self.held.load(Ordering::SeqCst) {
            let (tx, rx) = oneshot::channel();
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(tx);
            let _ = rx.await;
        }
        self.resolve_queued();
    }

    fn sprite_sheet(&self, key: &TextureKey) -> Option<Arc<SpriteSheet>> {
        self.lock_state().loaded.get(key).cloned()
    }
}
