//! Data types for datasets, documents, chunks, and ranked results.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Free-form metadata attached to chunks and results.
pub type Metadata = HashMap<String, Value>;

/// A contiguous fragment of a [`Document`] with its vector embedding.
///
/// A chunk whose embedding is absent or malformed can still be stored; the
/// ranker simply skips it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The text content of the chunk.
    pub content: String,
    /// The vector embedding for this chunk's text.
    #[serde(
        default,
        deserialize_with = "lenient_embedding",
        skip_serializing_if = "Option::is_none"
    )]
    pub embedding: Option<Vec<f32>>,
    /// Splitter-provided fields such as `chunk_index`.
    #[serde(default)]
    pub metadata: Metadata,
    /// The ID of the parent [`Document`]. Set by [`Document::attach_chunks`].
    #[serde(default)]
    pub document_id: String,
}

impl Chunk {
    /// Create a chunk that is not yet attached to a document.
    pub fn new(content: impl Into<String>, embedding: Option<Vec<f32>>) -> Self {
        Self {
            content: content.into(),
            embedding,
            metadata: Metadata::new(),
            document_id: String::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Accept any JSON for `embedding`, keeping it only when it is an array of numbers.
fn lenient_embedding<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(None);
    };
    let embedding = items
        .iter()
        .map(|item| item.as_f64().map(|x| x as f32))
        .collect::<Option<Vec<f32>>>();
    Ok(embedding)
}

/// A source document and the chunks produced from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// Human-readable name, typically the source file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The full text content of the document.
    #[serde(default)]
    pub content: String,
    /// Embedded chunks, in source order.
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    /// The embedding model that produced the chunk embeddings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    /// Creation timestamp.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a document with no chunks yet.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            content: content.into(),
            chunks: Vec::new(),
            embedding_model: None,
            created_at: Utc::now(),
        }
    }

    /// Set the document name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace this document's chunks, stamping each with the document ID.
    pub fn attach_chunks(&mut self, chunks: Vec<Chunk>) {
        self.chunks = chunks
            .into_iter()
            .map(|mut chunk| {
                chunk.document_id.clone_from(&self.id);
                chunk
            })
            .collect();
    }

    /// Whether any chunks have been attached.
    pub fn is_processed(&self) -> bool {
        !self.chunks.is_empty()
    }
}

/// The kind of content a [`Dataset`] holds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Plain text documents.
    #[default]
    Text,
    /// Question/answer pairs.
    Qa,
    /// Conversation transcripts.
    Conversation,
}

/// A named, ordered collection of [`Document`]s searched together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    /// Unique identifier for the dataset.
    pub id: String,
    /// Dataset name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The kind of content stored.
    #[serde(default)]
    pub data_type: DataType,
    /// Member documents, in insertion order.
    #[serde(default)]
    pub documents: Vec<Document>,
    /// Creation timestamp.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            data_type: DataType::default(),
            documents: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Append a document.
    pub fn push(&mut self, document: Document) {
        self.documents.push(document);
    }

    /// Iterate over every chunk of every document, in dataset order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.documents.iter().flat_map(|document| document.chunks.iter())
    }

    /// Total number of chunks across all documents.
    pub fn chunk_count(&self) -> usize {
        self.documents.iter().map(|document| document.chunks.len()).sum()
    }

    /// Parse a dataset from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Serialization`](crate::RagError::Serialization) if
    /// `json` is not a valid dataset. Malformed chunk embeddings are not an
    /// error; they load as absent.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the dataset as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Serialization`](crate::RagError::Serialization) if
    /// serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A retrieved chunk paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredResult {
    /// The ID of the document the chunk came from.
    pub document_id: String,
    /// The chunk text.
    pub chunk_content: String,
    /// Cosine similarity to the query, in `[-1, 1]`.
    pub similarity: f32,
    /// The chunk's metadata.
    pub metadata: Metadata,
}

impl ScoredResult {
    pub(crate) fn from_chunk(chunk: &Chunk, similarity: f32) -> Self {
        Self {
            document_id: chunk.document_id.clone(),
            chunk_content: chunk.content.clone(),
            similarity,
            metadata: chunk.metadata.clone(),
        }
    }
}
