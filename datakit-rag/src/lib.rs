//! Similarity-ranked chunk retrieval over embedded documents.
//!
//! This crate provides:
//! - Dataset, document, and chunk types with JSON (de)serialization
//! - Cosine-similarity top-K ranking over in-memory chunks
//! - A recursive character splitter for turning documents into chunks
//! - An [`EmbeddingProvider`] seam, with an OpenAI implementation behind the
//!   `openai` feature
//! - [`RagService`], which ties splitting, embedding, and ranking together
//!
//! # Quick Start
//!
//! ```rust
//! use datakit_rag::{Chunk, Dataset, Document, rank_dataset};
//!
//! let mut document = Document::new("doc-1", "");
//! document.attach_chunks(vec![
//!     Chunk::new("about cats", Some(vec![1.0, 0.0])),
//!     Chunk::new("about dogs", Some(vec![0.0, 1.0])),
//! ]);
//! let mut dataset = Dataset::new("pets", "Pets");
//! dataset.push(document);
//!
//! let results = rank_dataset(&[0.9, 0.2], &dataset, 1).unwrap();
//! assert_eq!(results[0].chunk_content, "about cats");
//! assert_eq!(results[0].document_id, "doc-1");
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod ranker;
pub mod service;
pub mod similarity;

#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, DataType, Dataset, Document, Metadata, ScoredResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use ranker::{rank, rank_dataset, rank_with_threshold};
pub use service::{RagService, RagServiceBuilder};
pub use similarity::cosine_similarity;

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
