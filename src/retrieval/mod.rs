pub mod router;

use serde::Serialize;
use tracing::debug;

use crate::error::Error;
use crate::models::ChunkStrategy;
use crate::remote::{ChunkIndex, Embedder, ScoredChunk};

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_VECTOR_WEIGHT: f64 = 0.7;
pub const DEFAULT_TEXT_WEIGHT: f64 = 0.3;

// The hybrid RPC is not guaranteed to support a meeting filter, so we
// over-fetch by this factor and prune locally.
const FILTER_OVERFETCH_FACTOR: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    Semantic,
    Hybrid,
}

impl RetrievalMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "semantic" => Some(RetrievalMode::Semantic),
            "hybrid" => Some(RetrievalMode::Hybrid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Semantic => "semantic",
            RetrievalMode::Hybrid => "hybrid",
        }
    }
}

/// A retrieved chunk enriched with its source meeting's title.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub meeting_id: String,
    pub meeting_title: Option<String>,
    pub content: String,
    pub speaker: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub chunk_index: usize,
    pub strategy: ChunkStrategy,
    pub score: f64,
}

/// Ranked retrieval over stored chunks. Embedding and search are delegated to
/// injected collaborators; this type owns only the filter/enrichment glue.
pub struct Retriever<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn ChunkIndex,
}

impl<'a> Retriever<'a> {
    pub fn new(embedder: &'a dyn Embedder, index: &'a dyn ChunkIndex) -> Self {
        Self { embedder, index }
    }

    /// Dispatch to the requested retrieval mode. Results come back in the
    /// backend's descending-score order, at most `top_k` of them, all
    /// matching `meeting_id` when a filter is given.
    pub fn search(
        &self,
        query: &str,
        mode: RetrievalMode,
        top_k: usize,
        meeting_id: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>, Error> {
        match mode {
            RetrievalMode::Semantic => self.semantic_search(query, top_k, meeting_id),
            RetrievalMode::Hybrid => self.hybrid_search(
                query,
                top_k,
                DEFAULT_VECTOR_WEIGHT,
                DEFAULT_TEXT_WEIGHT,
                meeting_id,
            ),
        }
    }

    /// Pure vector similarity. Filtering happens backend-side and the
    /// backend's ranking is returned as-is.
    pub fn semantic_search(
        &self,
        query: &str,
        top_k: usize,
        meeting_id: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>, Error> {
        let embedding = self.embedder.embed(query)?;
        let chunks = self
            .index
            .match_chunks(&embedding, top_k, meeting_id, None)?;
        debug!("semantic search returned {} chunks", chunks.len());
        self.enrich_with_titles(chunks)
    }

    /// Backend-fused vector + full-text search.
    ///
    /// When a meeting filter is requested we over-fetch `top_k * 3`
    /// candidates, prune locally, and truncate back to `top_k`, preserving
    /// the backend's relative ordering.
    pub fn hybrid_search(
        &self,
        query: &str,
        top_k: usize,
        vector_weight: f64,
        text_weight: f64,
        meeting_id: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>, Error> {
        let fetch_count = if meeting_id.is_some() {
            top_k * FILTER_OVERFETCH_FACTOR
        } else {
            top_k
        };

        let embedding = self.embedder.embed(query)?;
        let mut chunks =
            self.index
                .hybrid_match(&embedding, query, fetch_count, vector_weight, text_weight)?;

        if let Some(id) = meeting_id {
            chunks.retain(|c| c.meeting_id == id);
        }
        chunks.truncate(top_k);

        debug!("hybrid search returning {} chunks", chunks.len());
        self.enrich_with_titles(chunks)
    }

    /// One batched title lookup over the distinct meeting ids in the result
    /// set, not one lookup per chunk.
    fn enrich_with_titles(
        &self,
        chunks: Vec<ScoredChunk>,
    ) -> Result<Vec<RetrievedChunk>, Error> {
        let mut ids: Vec<String> = Vec::new();
        for chunk in &chunks {
            if !ids.contains(&chunk.meeting_id) {
                ids.push(chunk.meeting_id.clone());
            }
        }

        let titles = if ids.is_empty() {
            Default::default()
        } else {
            self.index.meeting_titles(&ids)?
        };

        Ok(chunks
            .into_iter()
            .map(|c| RetrievedChunk {
                meeting_title: titles.get(&c.meeting_id).cloned(),
                meeting_id: c.meeting_id,
                content: c.content,
                speaker: c.speaker,
                start_time: c.start_time,
                end_time: c.end_time,
                chunk_index: c.chunk_index,
                strategy: c.strategy,
                score: c.score,
            })
            .collect())
    }
}

/// Format retrieved chunks as the context block handed to the generator:
/// `[Source N] Speaker [12.3s]: content`, in retrieval order.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let speaker = chunk.speaker.as_deref().unwrap_or("Unknown");
            let time = chunk
                .start_time
                .map(|t| format!(" [{t:.1}s]"))
                .unwrap_or_default();
            format!("[Source {}] {}{}: {}", i + 1, speaker, time, chunk.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
