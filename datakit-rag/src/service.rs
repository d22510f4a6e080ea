//! Retrieval service: document processing and dataset queries.
//!
//! [`RagService`] composes an [`EmbeddingProvider`] and a [`Chunker`] with
//! the ranker. Processing a document splits its content, embeds every piece
//! in one batch, and attaches the resulting chunks; querying a dataset embeds
//! the query and ranks every stored chunk against it.
//!
//! # Example
//!
//! ```rust,ignore
//! use datakit_rag::{Dataset, Document, RagConfig, RagService};
//!
//! let service = RagService::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .build()?;
//!
//! let mut document = Document::new("guide", text);
//! service.process_document(&mut document).await?;
//! dataset.push(document);
//! let results = service.query_dataset(&dataset, "search query", 3).await?;
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Dataset, Document, ScoredResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::ranker::rank_with_threshold;

/// Document processing and similarity search over in-memory datasets.
///
/// Construct one via [`RagService::builder()`]. The service holds no
/// per-query state; it can be shared behind an `Arc`.
pub struct RagService {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
}

impl std::fmt::Debug for RagService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagService")
            .field("config", &self.config)
            .field("model", &self.embedding_provider.model_name())
            .finish_non_exhaustive()
    }
}

impl RagService {
    /// Create a new [`RagServiceBuilder`].
    pub fn builder() -> RagServiceBuilder {
        RagServiceBuilder::default()
    }

    /// Return a reference to the service configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Split, embed, and attach chunks to `document`.
    ///
    /// Any previously attached chunks are replaced. Each chunk carries a
    /// `chunk_index` metadata entry. Returns the number of chunks attached.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the provider fails or returns
    /// a different number of embeddings than there are chunks. The document
    /// is left unchanged on error.
    pub async fn process_document(&self, document: &mut Document) -> Result<usize> {
        let pieces = self.chunker.chunk(&document.content);
        if pieces.is_empty() {
            document.attach_chunks(Vec::new());
            info!(document.id = %document.id, chunk_count = 0, "processed document (empty)");
            return Ok(0);
        }

        let texts: Vec<&str> = pieces.iter().map(String::as_str).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during processing");
            e
        })?;

        if embeddings.len() != pieces.len() {
            error!(
                document.id = %document.id,
                expected = pieces.len(),
                actual = embeddings.len(),
                "embedding count mismatch"
            );
            return Err(RagError::EmbeddingError {
                provider: self.embedding_provider.model_name().to_string(),
                message: format!(
                    "expected {} embeddings for document '{}', got {}",
                    pieces.len(),
                    document.id,
                    embeddings.len()
                ),
            });
        }

        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (content, embedding))| {
                Chunk::new(content, Some(embedding)).with_metadata("chunk_index", index)
            })
            .collect();

        let chunk_count = chunks.len();
        document.attach_chunks(chunks);
        document.embedding_model = Some(self.embedding_provider.model_name().to_string());
        info!(document.id = %document.id, chunk_count, "processed document");

        Ok(chunk_count)
    }

    /// Process every document in `dataset`. Returns the total chunk count.
    ///
    /// # Errors
    ///
    /// Stops at the first document that fails; documents before it keep their
    /// new chunks.
    pub async fn process_dataset(&self, dataset: &mut Dataset) -> Result<usize> {
        let mut total = 0;
        for document in &mut dataset.documents {
            total += self.process_document(document).await?;
        }
        info!(
            dataset.id = %dataset.id,
            documents = dataset.documents.len(),
            chunk_count = total,
            "processed dataset"
        );
        Ok(total)
    }

    /// Return the `k` chunks in `dataset` most similar to `query`.
    ///
    /// Results below the configured `min_similarity` are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidTopK`] if `k` is zero, or the provider's
    /// error if the query cannot be embedded.
    pub async fn query_dataset(
        &self,
        dataset: &Dataset,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredResult>> {
        if k == 0 {
            return Err(RagError::InvalidTopK(k));
        }

        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;

        let results =
            rank_with_threshold(&query_embedding, dataset.chunks(), k, self.config.min_similarity)?;

        info!(dataset.id = %dataset.id, result_count = results.len(), "query completed");
        Ok(results)
    }

    /// [`query_dataset`](Self::query_dataset) with the configured `top_k`.
    ///
    /// # Errors
    ///
    /// See [`query_dataset`](Self::query_dataset).
    pub async fn query(&self, dataset: &Dataset, query: &str) -> Result<Vec<ScoredResult>> {
        self.query_dataset(dataset, query, self.config.top_k).await
    }
}

/// Builder for constructing a [`RagService`].
///
/// The embedding provider is required. The config defaults to
/// [`RagConfig::default()`], and the chunker to a [`RecursiveChunker`] sized
/// from the config.
#[derive(Default)]
pub struct RagServiceBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagServiceBuilder {
    /// Set the service configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagService`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the embedding provider is missing
    /// or the config is invalid.
    pub fn build(self) -> Result<RagService> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::from_config(&config)?),
        };

        Ok(RagService { config, embedding_provider, chunker })
    }
}
