use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::Draft;

/// Fixed key the concept-paper form saves its draft under.
pub const CONCEPT_PAPER_DRAFT_KEY: &str = "belize_fund_concept_paper_draft";

/// Key → serialized draft store backing "save as draft" on single-page forms.
pub trait DraftCache: Send + Sync {
    /// Store `draft` under `key`, replacing whatever was there.
    fn save(&self, key: &str, draft: &Draft) -> Result<(), DraftCacheError>;
    fn load(&self, key: &str) -> Result<Option<Draft>, DraftCacheError>;
    fn clear(&self, key: &str) -> Result<(), DraftCacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DraftCacheError {
    #[error("draft key '{0}' is not usable as a cache entry name")]
    InvalidKey(String),
    #[error("draft storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored draft is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedDraft {
    saved_at: DateTime<Utc>,
    draft: Draft,
}

fn encode(draft: &Draft) -> Result<String, DraftCacheError> {
    let entry = CachedDraft {
        saved_at: Utc::now(),
        draft: draft.clone(),
    };
    Ok(serde_json::to_string(&entry)?)
}

fn decode(raw: &str) -> Result<Draft, DraftCacheError> {
    let entry: CachedDraft = serde_json::from_str(raw)?;
    Ok(entry.draft)
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileDraftCache {
    root: PathBuf,
}

impl FileDraftCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, DraftCacheError> {
        let usable = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
        if !usable {
            return Err(DraftCacheError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl DraftCache for FileDraftCache {
    fn save(&self, key: &str, draft: &Draft) -> Result<(), DraftCacheError> {
        let path = self.entry_path(key)?;
        fs::create_dir_all(&self.root)?;
        fs::write(path, encode(draft)?)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Draft>, DraftCacheError> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(path) {
            Ok(raw) => decode(&raw).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn clear(&self, key: &str) -> Result<(), DraftCacheError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local cache holding serialized entries, like browser local storage.
#[derive(Debug, Default)]
pub struct MemoryDraftCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryDraftCache {
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("draft cache mutex poisoned")
            .get(key)
            .cloned()
    }
}

impl DraftCache for MemoryDraftCache {
    fn save(&self, key: &str, draft: &Draft) -> Result<(), DraftCacheError> {
        let encoded = encode(draft)?;
        self.entries
            .lock()
            .expect("draft cache mutex poisoned")
            .insert(key.to_string(), encoded);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Draft>, DraftCacheError> {
        let raw = self.raw(key);
        raw.as_deref().map(decode).transpose()
    }

    fn clear(&self, key: &str) -> Result<(), DraftCacheError> {
        self.entries
            .lock()
            .expect("draft cache mutex poisoned")
            .remove(key);
        Ok(())
    }
}
