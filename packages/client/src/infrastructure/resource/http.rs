//! HTTP ResourceLoader 実装
//!
//! スプライトシート記述子（JSON）をアセットのベース URL から取得します。
//!
//! ```text
//! GET <asset-base>/<texture>
//! { "image": "alice.png", "frames": { "idle": { "x": 0, "y": 0, "w": 142, "h": 156 } } }
//! ```
//!
//! 取得に失敗したキーは解決されないまま残り、そのキーを使う参加者は
//! リコンサイル時にスキップされます。

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use futures_util::future::join_all;
use url::Url;

use crate::domain::{ResourceLoader, SpriteSheet, TextureKey};

enum Entry {
    Queued,
    Loaded(Arc<SpriteSheet>),
    Failed,
}

/// Resource loader fetching sprite-sheet descriptors over HTTP
pub struct HttpResourceLoader {
    client: reqwest::Client,
    base: Url,
    entries: Mutex<HashMap<TextureKey, Entry>>,
    /// Serializes batches so a second `load` waits for in-flight keys.
    batch: tokio::sync::Mutex<()>,
}

impl HttpResourceLoader {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            client,
            base,
            entries: Mutex::new(HashMap::new()),
            batch: tokio::sync::Mutex::new(()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<TextureKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(&self, key: &TextureKey) -> Result<SpriteSheet, String> {
        let url = self.base.join(key.as_str()).map_err(|e| e.to_string())?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| e.to_string())?;
        response
            .json::<SpriteSheet>()
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ResourceLoader for HttpResourceLoader {
    fn enqueue(&self, key: &TextureKey) -> bool {
        let mut entries = self.entries();
        if entries.contains_key(key) {
            return false;
        }
        entries.insert(key.clone(), Entry::Queued);
        true
    }

    async fn load(&self) {
        let _batch = self.batch.lock().await;

        let queued: Vec<TextureKey> = self
            .entries()
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Queued))
            .map(|(key, _)| key.clone())
            .collect();
        if queued.is_empty() {
            return;
        }

        tracing::debug!("Loading {} sprite sheet(s)", queued.len());
        let results = join_all(queued.iter().map(|key| self.fetch(key))).await;

        let mut entries = self.entries();
        for (key, result) in queued.into_iter().zip(results) {
            let entry = match result {
                Ok(sheet) => Entry::Loaded(Arc::new(sheet)),
                Err(e) => {
                    tracing::warn!("Failed to load sprite sheet '{}': {}", key, e);
                    Entry::Failed
                }
            };
            entries.insert(key, entry);
        }
    }

    fn sprite_sheet(&self, key: &TextureKey) -> Option<Arc<SpriteSheet>> {
        match self.entries().get(key) {
            Some(Entry::Loaded(sheet)) => Some(Arc::clone(sheet)),
            _ => None,
        }
    }
}
