pub mod anthropic;
pub mod openai;
pub mod supabase;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::{Chunk, ChunkStrategy, ExtractedItem, ItemType, NewMeeting};

/// A chunk as returned by the search backend, with its relevance score.
///
/// `score` is `similarity` for pure vector matches and `combined_score` for
/// hybrid matches; ordering is the backend's, descending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub meeting_id: String,
    pub content: String,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
    pub chunk_index: usize,
    pub strategy: ChunkStrategy,
    #[serde(alias = "similarity", alias = "combined_score")]
    pub score: f64,
}

/// Embedding service contract: fixed-length float vectors, one per input,
/// order-preserving.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, Error>;
    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error>;
}

/// Vector/lexical search service contract. Results come back in the
/// backend's own descending-score order; the core never re-sorts.
pub trait ChunkIndex {
    /// Pure vector similarity, optionally pre-filtered by meeting and
    /// chunking strategy.
    fn match_chunks(
        &self,
        embedding: &[f32],
        count: usize,
        meeting_id: Option<&str>,
        strategy: Option<ChunkStrategy>,
    ) -> Result<Vec<ScoredChunk>, Error>;

    /// Fused vector + full-text relevance. Score fusion happens backend-side;
    /// the backend is not guaranteed to support a meeting filter here.
    fn hybrid_match(
        &self,
        embedding: &[f32],
        query_text: &str,
        count: usize,
        vector_weight: f64,
        text_weight: f64,
    ) -> Result<Vec<ScoredChunk>, Error>;

    /// Batched `meeting id -> title` lookup for result enrichment.
    fn meeting_titles(&self, ids: &[String]) -> Result<HashMap<String, String>, Error>;
}

/// Durable storage for the ingestion pipeline's output.
pub trait ChunkWriter {
    /// Store meeting metadata and return the assigned meeting id.
    fn store_meeting(&self, meeting: &NewMeeting) -> Result<String, Error>;

    /// Store chunks with their externally-obtained embeddings, associated
    /// with a meeting. No ordering guarantee beyond `chunk_index`.
    fn store_chunks(
        &self,
        meeting_id: &str,
        chunks: &[(Chunk, Vec<f32>)],
    ) -> Result<(), Error>;
}

/// Store of previously-extracted action items, decisions, and topics.
pub trait ItemStore {
    /// Look up extracted items, newest first.
    fn lookup_items(
        &self,
        meeting_id: Option<&str>,
        item_type: Option<ItemType>,
    ) -> Result<Vec<ExtractedItem>, Error>;
}

/// Read access to stored meeting metadata.
pub trait MeetingReader {
    /// Fetch the raw transcript stored for a meeting.
    fn raw_transcript(&self, meeting_id: &str) -> Result<String, Error>;
}

/// LLM-backed extraction of structured items from a raw transcript.
/// Items come back grouped action items → decisions → topics.
pub trait ItemExtractor {
    fn extract_items(&self, transcript: &str) -> Result<Vec<ExtractedItem>, Error>;
}

/// Durable storage for extraction output. Returns the number of rows written.
pub trait ItemWriter {
    fn store_items(&self, meeting_id: &str, items: &[ExtractedItem]) -> Result<usize, Error>;
}

/// Answer-generation service. Consumes the retriever's ranked chunks; the
/// core's only obligation is to hand them over in the order produced.
pub trait Generator {
    fn generate(&self, question: &str, context: &str) -> Result<GeneratedAnswer, Error>;
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}
