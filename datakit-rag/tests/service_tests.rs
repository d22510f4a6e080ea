//! Tests for document processing and dataset queries through `RagService`.

use std::sync::Arc;

use async_trait::async_trait;
use datakit_rag::{
    Dataset, Document, EmbeddingProvider, RagConfig, RagError, RagService, RecursiveChunker,
};

/// Bag-of-words embeddings over a fixed vocabulary, one dimension per word.
struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
}

impl KeywordEmbedder {
    fn new() -> Self {
        Self {
            vocabulary: vec![
                "rust", "memory", "safety", "python", "data", "science", "cooking", "pasta",
            ],
        }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> datakit_rag::Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.vocabulary.len()];
        for word in text.split(|c: char| !c.is_alphanumeric()) {
            let word = word.to_lowercase();
            if let Some(i) = self.vocabulary.iter().position(|v| *v == word) {
                embedding[i] += 1.0;
            }
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

/// Always fails, to check error propagation.
struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> datakit_rag::Result<Vec<f32>> {
        Err(RagError::EmbeddingError { provider: "failing".into(), message: "offline".into() })
    }

    fn dimensions(&self) -> usize {
        4
    }
}

/// Returns one embedding no matter how many texts it is given.
struct ShortBatchEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortBatchEmbedder {
    async fn embed(&self, _text: &str) -> datakit_rag::Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, _texts: &[&str]) -> datakit_rag::Result<Vec<Vec<f32>>> {
        Ok(vec![vec![1.0, 0.0]])
    }

    fn dimensions(&self) -> usize {
        2
    }
}

fn keyword_service(config: RagConfig) -> RagService {
    RagService::builder()
        .config(config)
        .embedding_provider(Arc::new(KeywordEmbedder::new()))
        .build()
        .unwrap()
}

async fn sample_dataset(service: &RagService) -> Dataset {
    let mut dataset = Dataset::new("ds-1", "Knowledge base");
    for (id, text) in [
        ("rust", "Rust gives memory safety without a garbage collector."),
        ("python", "Python is popular for data science."),
        ("cooking", "Cooking pasta takes ten minutes."),
    ] {
        let mut document = Document::new(id, text);
        service.process_document(&mut document).await.unwrap();
        dataset.push(document);
    }
    dataset
}

#[tokio::test]
async fn query_returns_most_relevant_document_first() {
    let service = keyword_service(RagConfig::default());
    let dataset = sample_dataset(&service).await;

    let results = service.query_dataset(&dataset, "memory safety in rust", 2).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].document_id, "rust");
    assert!((results[0].similarity - 1.0).abs() < 1e-6);
    assert!(results[0].similarity >= results[1].similarity);
}

#[tokio::test]
async fn query_uses_configured_top_k() {
    let service = keyword_service(RagConfig::builder().top_k(1).build().unwrap());
    let dataset = sample_dataset(&service).await;

    let results = service.query(&dataset, "pasta").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document_id, "cooking");
    assert_eq!(results[0].chunk_content, "Cooking pasta takes ten minutes.");
}

#[tokio::test]
async fn threshold_drops_unrelated_chunks() {
    let service = keyword_service(RagConfig::builder().min_similarity(0.1).build().unwrap());
    let dataset = sample_dataset(&service).await;

    let results = service.query_dataset(&dataset, "python data", 3).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document_id, "python");
}

#[tokio::test]
async fn query_without_known_words_scores_zero() {
    let service = keyword_service(RagConfig::default());
    let dataset = sample_dataset(&service).await;

    let results = service.query_dataset(&dataset, "astronomy", 3).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.similarity == 0.0));
    // Ties keep dataset order.
    let ids: Vec<&str> = results.iter().map(|r| r.document_id.as_str()).collect();
    assert_eq!(ids, ["rust", "python", "cooking"]);
}

#[tokio::test]
async fn zero_k_is_a_caller_error() {
    let service = keyword_service(RagConfig::default());
    let dataset = sample_dataset(&service).await;

    let err = service.query_dataset(&dataset, "rust", 0).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidTopK(0)));
}

#[tokio::test]
async fn empty_dataset_gives_empty_results() {
    let service = keyword_service(RagConfig::default());
    let dataset = Dataset::new("empty", "Empty");
    assert!(service.query_dataset(&dataset, "rust", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn processing_attaches_indexed_chunks() {
    let config = RagConfig::builder().chunk_size(40).chunk_overlap(10).build().unwrap();
    let service = keyword_service(config);
    let mut document = Document::new(
        "long",
        "Rust gives memory safety.\n\n\
         Python is popular for data science.\n\n\
         Cooking pasta is easy.",
    );

    let count = service.process_document(&mut document).await.unwrap();

    assert_eq!(count, 3);
    assert_eq!(document.chunks.len(), 3);
    assert_eq!(document.embedding_model.as_deref(), Some("keyword-test"));
    for (i, chunk) in document.chunks.iter().enumerate() {
        assert_eq!(chunk.document_id, "long");
        assert_eq!(chunk.metadata["chunk_index"], i);
        assert_eq!(chunk.embedding.as_ref().map(Vec::len), Some(8));
        assert!(chunk.content.chars().count() <= 40);
    }
}

#[tokio::test]
async fn empty_document_gets_no_chunks() {
    let service = keyword_service(RagConfig::default());
    let mut document = Document::new("blank", "   ");
    assert_eq!(service.process_document(&mut document).await.unwrap(), 0);
    assert!(!document.is_processed());
}

#[tokio::test]
async fn process_dataset_counts_all_chunks() {
    let service = keyword_service(RagConfig::default());
    let mut dataset = Dataset::new("ds", "docs");
    dataset.push(Document::new("a", "rust memory"));
    dataset.push(Document::new("b", "python data"));

    assert_eq!(service.process_dataset(&mut dataset).await.unwrap(), 2);
    assert_eq!(dataset.chunk_count(), 2);
}

#[tokio::test]
async fn embedding_failure_leaves_document_untouched() {
    let service =
        RagService::builder().embedding_provider(Arc::new(FailingEmbedder)).build().unwrap();
    let mut document = Document::new("doc", "some text");

    let err = service.process_document(&mut document).await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingError { .. }));
    assert!(!document.is_processed());
    assert!(document.embedding_model.is_none());
}

#[tokio::test]
async fn query_embedding_failure_is_reported() {
    let service =
        RagService::builder().embedding_provider(Arc::new(FailingEmbedder)).build().unwrap();
    let err = service.query_dataset(&Dataset::new("d", "d"), "q", 1).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { .. }));
}

#[tokio::test]
async fn short_embedding_batch_is_rejected() {
    let service = RagService::builder()
        .embedding_provider(Arc::new(ShortBatchEmbedder))
        .chunker(Arc::new(RecursiveChunker::new(5, 0).unwrap()))
        .build()
        .unwrap();
    let mut document = Document::new("doc", "one two three");

    let err = service.process_document(&mut document).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::EmbeddingError { message, .. } if message.contains("expected")
    ));
}

#[test]
fn builder_requires_embedding_provider() {
    let err = RagService::builder().build().unwrap_err();
    assert!(matches!(err, RagError::ConfigError(msg) if msg.contains("embedding_provider")));
}
