//! Transient on-disk translation cache.
//!
//! One JSON file per `(target language, text)` pair, named by the SHA-256 of
//! the pair. Those entries are removed at the start of every run, so the cache
//! only saves repeated translator calls within a run (running headers,
//! duplicated pages). Every operation is best-effort: failures are logged
//! and treated as a miss. Files the cache did not write are never touched.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    target: String,
    original: String,
    translated: String,
}

/// Translation cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct TranslationCache {
    dir: PathBuf,
}

impl TranslationCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove every entry this cache wrote and make sure the directory
    /// exists. Other files in the directory are left alone.
    pub async fn clear(&self) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("Could not create cache {}: {}", self.dir.display(), e);
            return;
        }
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not list cache {}: {}", self.dir.display(), e);
                return;
            }
        };

        let mut removed = 0usize;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Could not list cache {}: {}", self.dir.display(), e);
                    break;
                }
            };
            let is_ours = entry.file_name().to_str().is_some_and(is_entry_name);
            if !is_ours {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Could not remove cache entry {}: {}", entry.path().display(), e),
            }
        }
        debug!(
            "Cleared translation cache {} ({} entries)",
            self.dir.display(),
            removed
        );
    }

    /// Cached translation of `text`, if any.
    pub async fn get(&self, text: &str, target: &str) -> Option<String> {
        let path = self.entry_path(text, target);
        let data = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice::<CacheEntry>(&data) {
            // Guards against a hash collision, however unlikely.
            Ok(entry) if entry.original == text && entry.target == target => Some(entry.translated),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store a translation.
    pub async fn put(&self, text: &str, target: &str, translated: &str) {
        let entry = CacheEntry {
            target: target.to_string(),
            original: text.to_string(),
            translated: translated.to_string(),
        };
        let path = self.entry_path(text, target);
        let result = match serde_json::to_vec(&entry) {
            Ok(bytes) => tokio::fs::write(&path, bytes).await,
            Err(e) => Err(std::io::Error::other(e)),
        };
        if let Err(e) = result {
            warn!("Could not write cache entry {}: {}", path.display(), e);
        }
    }

    fn entry_path(&self, text: &str, target: &str) -> PathBuf {
        self.dir.join(format!("{}.json", cache_key(text, target)))
    }
}

/// Whether `name` is a file this cache writes: `<64 lowercase hex>.json`.
fn is_entry_name(name: &str) -> bool {
    name.strip_suffix(".json").is_some_and(|stem| {
        stem.len() == 64
            && stem
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    })
}

/// Hex SHA-256 of the target language and text.
pub fn cache_key(text: &str, target: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(target.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
