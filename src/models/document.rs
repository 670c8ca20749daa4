//! Document and chunk models.

use serde::{Deserialize, Serialize};

use super::source::Source;

/// Raw extracted text plus metadata, produced once per source per ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub source: Source,
    pub content: String,
    /// SHA-256 hex of the content at load time.
    pub content_hash: String,
    pub title: Option<String>,
    pub retrieved_at: String,
    /// Whether the content passed through the LLM cleaner.
    pub cleaned: bool,
    /// Content length before cleaning, when cleaned.
    pub original_len: Option<usize>,
}

impl Document {
    pub fn new(source: Source, content: String, title: Option<String>) -> Self {
        let content_hash = crate::utils::calculate_checksum(&content);
        Self {
            source,
            content,
            content_hash,
            title,
            retrieved_at: chrono::Utc::now().to_rfc3339(),
            cleaned: false,
            original_len: None,
        }
    }

    /// Stable identifier for the source, independent of content.
    ///
    /// First 16 bytes of sha256 over the source string, hex-encoded. Chunk IDs
    /// are derived from this, so it must stay stable across releases to keep
    /// existing collections addressable.
    pub fn source_hash(source: &Source) -> String {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(source.to_string().as_bytes());
        hex::encode(&hash[..16])
    }

    /// Replace the content with a cleaned version, keeping provenance.
    pub fn apply_cleaned(&mut self, cleaned_content: String) {
        self.original_len = Some(self.content.chars().count());
        self.content = cleaned_content;
        self.cleaned = true;
    }
}

/// A contiguous slice of a document's text, the unit stored in the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// UUIDv5 over `(source hash, chunk index)`.
    pub id: String,
    /// Stable source identifier the ID was derived from.
    pub source_id: String,
    pub source: Source,
    pub content: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    /// Character offsets into the document text.
    pub start_offset: u64,
    pub end_offset: u64,
    pub content_hash: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    pub cleaned: bool,
    pub retrieved_at: String,
}

impl Chunk {
    /// Deterministic chunk ID: UUIDv5 over `"{source_id}:{chunk_index}"`.
    ///
    /// Re-ingesting identical content produces the same IDs, so upserts stay
    /// idempotent and never duplicate records.
    pub fn generate_id(source_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{source_id}:{chunk_index}");
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_document(
        document: &Document,
        content: String,
        chunk_index: u32,
        total_chunks: u32,
        start_offset: u64,
        end_offset: u64,
    ) -> Self {
        let source_id = Document::source_hash(&document.source);
        let id = Self::generate_id(&source_id, chunk_index);
        Self {
            id,
            source_id,
            source: document.source.clone(),
            content,
            chunk_index,
            total_chunks,
            start_offset,
            end_offset,
            content_hash: document.content_hash.clone(),
            embedding: Vec::new(),
            cleaned: document.cleaned,
            retrieved_at: document.retrieved_at.clone(),
        }
    }
}

/// A chunk returned from similarity search, with its distance-derived score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    /// Similarity score, higher is closer.
    pub score: f32,
    pub content: String,
    pub source: Source,
    pub chunk_index: u32,
    pub content_hash: String,
}
