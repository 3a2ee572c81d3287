//! Retriever behavior against faked embedding and search backends.

use std::cell::RefCell;
use std::collections::HashMap;

use mrag::models::ChunkStrategy;
use mrag::remote::{ChunkIndex, Embedder, ScoredChunk};
use mrag::retrieval::{RetrievalMode, Retriever};
use mrag::Error;

struct FixedEmbedder;

impl Embedder for FixedEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, Error> {
        Ok(vec![0.1, 0.2, 0.3])
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
    }
}

/// Backend fake that serves a canned result list and records every call.
struct RecordingIndex {
    results: Vec<ScoredChunk>,
    hybrid_counts: RefCell<Vec<usize>>,
    title_lookups: RefCell<Vec<Vec<String>>>,
    titles: HashMap<String, String>,
    fail: bool,
}

impl RecordingIndex {
    fn new(results: Vec<ScoredChunk>) -> Self {
        Self {
            results,
            hybrid_counts: RefCell::new(Vec::new()),
            title_lookups: RefCell::new(Vec::new()),
            titles: HashMap::new(),
            fail: false,
        }
    }

    fn with_title(mut self, id: &str, title: &str) -> Self {
        self.titles.insert(id.to_string(), title.to_string());
        self
    }

    fn failing() -> Self {
        let mut index = Self::new(Vec::new());
        index.fail = true;
        index
    }
}

impl ChunkIndex for RecordingIndex {
    fn match_chunks(
        &self,
        _embedding: &[f32],
        count: usize,
        meeting_id: Option<&str>,
        _strategy: Option<ChunkStrategy>,
    ) -> Result<Vec<ScoredChunk>, Error> {
        if self.fail {
            return Err(Error::RetrievalUnavailable {
                service: "supabase",
                reason: "connection refused".to_string(),
            });
        }
        let mut out = self.results.clone();
        if let Some(id) = meeting_id {
            out.retain(|c| c.meeting_id == id);
        }
        out.truncate(count);
        Ok(out)
    }

    fn hybrid_match(
        &self,
        _embedding: &[f32],
        _query_text: &str,
        count: usize,
        _vector_weight: f64,
        _text_weight: f64,
    ) -> Result<Vec<ScoredChunk>, Error> {
        if self.fail {
            return Err(Error::RetrievalUnavailable {
                service: "supabase",
                reason: "connection refused".to_string(),
            });
        }
        self.hybrid_counts.borrow_mut().push(count);
        let mut out = self.results.clone();
        out.truncate(count);
        Ok(out)
    }

    fn meeting_titles(&self, ids: &[String]) -> Result<HashMap<String, String>, Error> {
        self.title_lookups.borrow_mut().push(ids.to_vec());
        Ok(ids
            .iter()
            .filter_map(|id| self.titles.get(id).map(|t| (id.clone(), t.clone())))
            .collect())
    }
}

fn scored(meeting: &str, index: usize, score: f64) -> ScoredChunk {
    ScoredChunk {
        meeting_id: meeting.to_string(),
        content: format!("chunk {index} of {meeting}"),
        speaker: Some("Alice".to_string()),
        start_time: Some(index as f64),
        end_time: Some(index as f64 + 1.0),
        chunk_index: index,
        strategy: ChunkStrategy::SpeakerTurn,
        score,
    }
}

#[test]
fn hybrid_with_meeting_filter_overfetches_three_times_top_k() {
    let index = RecordingIndex::new(Vec::new());
    let embedder = FixedEmbedder;
    let retriever = Retriever::new(&embedder, &index);

    retriever
        .search("what happened", RetrievalMode::Hybrid, 10, Some("m1"))
        .unwrap();

    assert_eq!(*index.hybrid_counts.borrow(), vec![30]);
}

#[test]
fn hybrid_without_filter_fetches_exactly_top_k() {
    let index = RecordingIndex::new(Vec::new());
    let embedder = FixedEmbedder;
    let retriever = Retriever::new(&embedder, &index);

    retriever
        .search("what happened", RetrievalMode::Hybrid, 7, None)
        .unwrap();

    assert_eq!(*index.hybrid_counts.borrow(), vec![7]);
}

#[test]
fn meeting_filter_prunes_and_truncates_preserving_order() {
    // Interleaved meetings in descending score order.
    let results = vec![
        scored("m1", 0, 0.99),
        scored("m2", 0, 0.95),
        scored("m1", 1, 0.90),
        scored("m2", 1, 0.85),
        scored("m1", 2, 0.80),
        scored("m1", 3, 0.75),
    ];
    let index = RecordingIndex::new(results);
    let embedder = FixedEmbedder;
    let retriever = Retriever::new(&embedder, &index);

    let chunks = retriever
        .search("budget", RetrievalMode::Hybrid, 3, Some("m1"))
        .unwrap();

    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.meeting_id == "m1"));
    let scores: Vec<f64> = chunks.iter().map(|c| c.score).collect();
    assert_eq!(scores, vec![0.99, 0.90, 0.80]);
}

#[test]
fn titles_are_looked_up_once_over_distinct_ids() {
    let results = vec![
        scored("m1", 0, 0.9),
        scored("m2", 0, 0.8),
        scored("m1", 1, 0.7),
    ];
    let index = RecordingIndex::new(results)
        .with_title("m1", "Planning sync")
        .with_title("m2", "Retro");
    let embedder = FixedEmbedder;
    let retriever = Retriever::new(&embedder, &index);

    let chunks = retriever
        .search("roadmap", RetrievalMode::Hybrid, 10, None)
        .unwrap();

    let lookups = index.title_lookups.borrow();
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0], vec!["m1".to_string(), "m2".to_string()]);

    assert_eq!(chunks[0].meeting_title.as_deref(), Some("Planning sync"));
    assert_eq!(chunks[1].meeting_title.as_deref(), Some("Retro"));
    assert_eq!(chunks[2].meeting_title.as_deref(), Some("Planning sync"));
}

#[test]
fn no_results_skips_the_title_lookup() {
    let index = RecordingIndex::new(Vec::new());
    let embedder = FixedEmbedder;
    let retriever = Retriever::new(&embedder, &index);

    let chunks = retriever
        .search("anything", RetrievalMode::Semantic, 5, None)
        .unwrap();

    assert!(chunks.is_empty());
    assert!(index.title_lookups.borrow().is_empty());
}

#[test]
fn backend_failure_surfaces_as_error_not_empty_results() {
    let index = RecordingIndex::failing();
    let embedder = FixedEmbedder;
    let retriever = Retriever::new(&embedder, &index);

    let err = retriever
        .search("anything", RetrievalMode::Hybrid, 5, None)
        .unwrap_err();

    assert!(matches!(err, Error::RetrievalUnavailable { .. }));
    assert!(err.to_string().contains("supabase unavailable"));

    let err = retriever
        .search("anything", RetrievalMode::Semantic, 5, None)
        .unwrap_err();
    assert!(matches!(err, Error::RetrievalUnavailable { .. }));
}
