// Retrieval module
// Coordinates one-time corpus initialization and answers similarity queries

pub mod gate;
pub mod ranking;


use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveFetcher, collect_documents, extract_archive, locate_docs_root};
use crate::cache::{Document, VectorCache};
use crate::config::{Config, RepoConfig};
use crate::embeddings::OpenAiClient;
use crate::{RagError, Result};

pub use gate::{InitGate, InitState, StartPath};
pub use ranking::{ScoredDocument, cosine_similarity, rank_documents};

/// Everything a cold start needs to rebuild the corpus from its source
#[derive(Debug)]
struct CorpusSource {
    repository: RepoConfig,
    fetcher: ArchiveFetcher,
    embedder: OpenAiClient,
}

/// Snapshot of the service's counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    pub documents: usize,
    pub loaded: bool,
    pub cached_queries: usize,
    pub embedding_dimension: Option<usize>,
    pub init_state: &'static str,
    pub start_path: Option<StartPath>,
}

/// Semantic search over a documentation corpus.
///
/// The corpus is loaded once per process by [`initialize`](Self::initialize),
/// either from the snapshot on disk or by downloading and embedding the
/// source archive. Queries are answered from memory afterwards.
#[derive(Debug)]
pub struct RetrievalService {
    source: Arc<CorpusSource>,
    cache: Arc<VectorCache>,
    query_embeddings: RwLock<HashMap<String, Vec<f32>>>,
    top_k: usize,
    gate: InitGate,
}

impl fmt::Display for ServiceStats {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents ({}), {} cached queries, initialization {}",
            self.documents,
            if self.loaded { "loaded" } else { "not loaded" },
            self.cached_queries,
            self.init_state
        )?;
        if let Some(path) = self.start_path {
            write!(f, " from {}", path)?;
        }
        if let Some(dimension) = self.embedding_dimension {
            write!(f, ", {} dimensions", dimension)?;
        }
        Ok(())
    }
}

impl RetrievalService {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let embedder = OpenAiClient::new(&config.embedding)?;
        let fetcher = ArchiveFetcher::new(&config.archive);
        let cache = Arc::new(VectorCache::new(config.snapshot_path()));

        Ok(Self::with_parts(
            config.repository.clone(),
            fetcher,
            embedder,
            cache,
            config.retrieval.top_k,
        ))
    }

    #[inline]
    pub fn with_parts(
        repository: RepoConfig,
        fetcher: ArchiveFetcher,
        embedder: OpenAiClient,
        cache: Arc<VectorCache>,
        top_k: usize,
    ) -> Self {
        Self {
            source: Arc::new(CorpusSource {
                repository,
                fetcher,
                embedder,
            }),
            cache,
            query_embeddings: RwLock::new(HashMap::new()),
            top_k,
            gate: InitGate::new(),
        }
    }

    #[inline]
    pub fn cache(&self) -> &VectorCache {
        &self.cache
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Load the corpus, at most once per service.
    ///
    /// Every caller, concurrent or later, receives the outcome of the single
    /// run, including its error. A failed initialization is not retried.
    #[inline]
    pub async fn initialize(&self) -> Result<()> {
        self.initialize_with_path().await.map(|_| ())
    }

    /// Like [`initialize`](Self::initialize), also reporting where the documents came from
    #[inline]
    pub async fn initialize_with_path(&self) -> Result<StartPath> {
        let source = Arc::clone(&self.source);
        let cache = Arc::clone(&self.cache);

        self.gate
            .run(|| async move {
                tokio::task::spawn_blocking(move || source.start(&cache))
                    .await
                    .map_err(|e| RagError::Io(format!("Initialization task failed: {}", e)))?
            })
            .await
    }

    /// The `top_k` documents most similar to `query`, best first
    #[inline]
    pub async fn find_relevant_documents(&self, query: &str) -> Result<Vec<Arc<Document>>> {
        Ok(self
            .find_relevant_documents_scored(query)
            .await?
            .into_iter()
            .map(|scored| scored.document)
            .collect())
    }

    /// Ranked matches for `query` together with their cosine similarity.
    ///
    /// Fails with [`RagError::NotInitialized`] until a successful
    /// initialization has loaded the corpus.
    #[inline]
    pub async fn find_relevant_documents_scored(&self, query: &str) -> Result<Vec<ScoredDocument>> {
        if !self.cache.is_loaded() {
            return Err(RagError::NotInitialized);
        }

        let query_embedding = self.query_embedding(query).await?;
        let results = rank_documents(&query_embedding, self.cache.list(), self.top_k);

        debug!(
            "Query matched {} documents, best score {:?}",
            results.len(),
            results.first().map(|r| r.score)
        );
        Ok(results)
    }

    async fn query_embedding(&self, query: &str) -> Result<Vec<f32>> {
        let key = query_key(query);

        let cached = self.query_embeddings.read().get(&key).cloned();
        if let Some(embedding) = cached {
            debug!("Query embedding cache hit for {}", key);
            return Ok(embedding);
        }

        let source = Arc::clone(&self.source);
        let text = query.to_string();
        let embedding = tokio::task::spawn_blocking(move || source.embedder.embed_query(&text))
            .await
            .map_err(|e| RagError::Io(format!("Query embedding task failed: {}", e)))??;

        self.query_embeddings
            .write()
            .insert(key, embedding.clone());
        Ok(embedding)
    }

    #[inline]
    pub fn stats(&self) -> ServiceStats {
        let state = self.gate.state();
        let start_path = match state {
            InitState::Succeeded(path) => Some(path),
            InitState::NotStarted | InitState::Running | InitState::Failed(_) => None,
        };

        ServiceStats {
            documents: self.cache.len(),
            loaded: self.cache.is_loaded(),
            cached_queries: self.query_embeddings.read().len(),
            embedding_dimension: self
                .cache
                .list()
                .iter()
                .find(|doc| doc.has_embedding())
                .map(|doc| doc.embedding.len()),
            init_state: state.name(),
            start_path,
        }
    }
}

impl CorpusSource {
    fn start(&self, cache: &VectorCache) -> Result<StartPath> {
        match cache.load_from_disk() {
            Ok(count) if count > 0 => {
                cache.set_loaded();
                info!("Loaded {} documents from embeddings snapshot", count);
                return Ok(StartPath::Snapshot);
            }
            Ok(_) => debug!("Embeddings snapshot is empty or missing"),
            Err(e) => warn!("Ignoring unreadable embeddings snapshot: {}", e),
        }

        let count = self.cold_start(cache)?;
        info!("Indexed {} documents from source archive", count);
        Ok(StartPath::Archive)
    }

    /// Download, extract and embed the corpus, then publish it to `cache`.
    ///
    /// Documents are stored only after every batch has been embedded.
    fn cold_start(&self, cache: &VectorCache) -> Result<usize> {
        self.repository
            .validate()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let bytes = self.fetcher.fetch(&self.repository)?;

        let scratch = TempDir::new()
            .map_err(|e| RagError::Io(format!("Failed to create scratch directory: {}", e)))?;
        extract_archive(&bytes, scratch.path())?;
        drop(bytes);

        let docs_root = locate_docs_root(scratch.path(), &self.repository)?;
        let mut documents = collect_documents(&docs_root)?;
        self.embedder.generate_document_embeddings(&mut documents)?;

        let count = documents.len();
        for document in documents {
            cache.store(document);
        }
        cache.set_loaded();

        if let Err(e) = cache.save_to_disk() {
            warn!("Failed to save embeddings snapshot: {}", e);
        }

        Ok(count)
    }
}

/// Hex SHA-256 of the raw query text
#[inline]
pub fn query_key(query: &str) -> String {
    format!("{:x}", Sha256::digest(query.as_bytes()))
}
