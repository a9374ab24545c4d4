// Vector cache module
// In-memory document store keyed by path, with a JSON snapshot on disk

pub mod models;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{RagError, Result};

pub use models::Document;

#[derive(Debug, Default)]
struct CacheState {
    documents: HashMap<String, Arc<Document>>,
    loaded: bool,
}

/// Concurrent document store shared by initialization and retrieval.
///
/// Readers proceed in parallel; `store`, `set_loaded`, `clear` and
/// `load_from_disk` take the write lock.
#[derive(Debug)]
pub struct VectorCache {
    state: RwLock<CacheState>,
    snapshot_path: PathBuf,
}

impl VectorCache {
    #[inline]
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            snapshot_path: snapshot_path.into(),
        }
    }

    #[inline]
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Insert a document, replacing any previous entry with the same path
    #[inline]
    pub fn store(&self, document: Document) {
        let mut state = self.state.write();
        state
            .documents
            .insert(document.path.clone(), Arc::new(document));
    }

    #[inline]
    pub fn get(&self, path: &str) -> Option<Arc<Document>> {
        self.state.read().documents.get(path).map(Arc::clone)
    }

    /// Snapshot of every stored document, in no particular order
    #[inline]
    pub fn list(&self) -> Vec<Arc<Document>> {
        self.state.read().documents.values().map(Arc::clone).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.state.read().documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.state.read().loaded
    }

    #[inline]
    pub fn set_loaded(&self) {
        self.state.write().loaded = true;
    }

    /// Remove every document and reset the loaded flag
    #[inline]
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.documents.clear();
        state.loaded = false;
    }

    /// Write every document to the snapshot file as a JSON object keyed by path.
    ///
    /// The snapshot is written to a sibling temporary file first and renamed
    /// into place, so a crash mid-write never leaves a truncated snapshot.
    #[inline]
    pub fn save_to_disk(&self) -> Result<()> {
        let payload = {
            let state = self.state.read();
            let ordered: BTreeMap<&str, &Document> = state
                .documents
                .iter()
                .map(|(path, doc)| (path.as_str(), doc.as_ref()))
                .collect();
            serde_json::to_vec(&ordered).map_err(|e| {
                RagError::Persistence(format!("Failed to serialize document cache: {}", e))
            })?
        };

        let parent = self
            .snapshot_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| {
            RagError::Persistence(format!(
                "Failed to create cache directory {}: {}",
                parent.display(),
                e
            ))
        })?;

        let mut file = NamedTempFile::new_in(parent).map_err(|e| {
            RagError::Persistence(format!("Failed to create temporary cache file: {}", e))
        })?;
        file.write_all(&payload).map_err(|e| {
            RagError::Persistence(format!("Failed to write cache file: {}", e))
        })?;
        file.persist(&self.snapshot_path).map_err(|e| {
            RagError::Persistence(format!(
                "Failed to move cache file into place at {}: {}",
                self.snapshot_path.display(),
                e.error
            ))
        })?;

        info!(
            "Saved {} bytes of embeddings to {}",
            payload.len(),
            self.snapshot_path.display()
        );
        Ok(())
    }

    /// Restore documents from the snapshot file.
    ///
    /// Returns the number of documents read. A missing snapshot is not an
    /// error and yields zero. Loaded documents are merged into the current
    /// contents; the loaded flag is left untouched.
    #[inline]
    pub fn load_from_disk(&self) -> Result<usize> {
        let content = match fs::read(&self.snapshot_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    "No embeddings snapshot at {}",
                    self.snapshot_path.display()
                );
                return Ok(0);
            }
            Err(e) => {
                return Err(RagError::Persistence(format!(
                    "Failed to open cache file {}: {}",
                    self.snapshot_path.display(),
                    e
                )));
            }
        };

        let documents: HashMap<String, Document> =
            serde_json::from_slice(&content).map_err(|e| {
                RagError::Persistence(format!(
                    "Failed to decode cache file {}: {}",
                    self.snapshot_path.display(),
                    e
                ))
            })?;

        let count = documents.len();
        let mut state = self.state.write();
        for (path, document) in documents {
            state.documents.insert(path, Arc::new(document));
        }

        debug!(
            "Restored {} documents from {}",
            count,
            self.snapshot_path.display()
        );
        Ok(count)
    }

    /// Delete the snapshot file if it exists
    #[inline]
    pub fn remove_snapshot(&self) -> Result<bool> {
        match fs::remove_file(&self.snapshot_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RagError::Persistence(format!(
                "Failed to remove cache file {}: {}",
                self.snapshot_path.display(),
                e
            ))),
        }
    }
}
