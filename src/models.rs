use serde::{Deserialize, Serialize};

/// Uniform representation of one speaker-attributed span of transcript text.
///
/// Produced by the parsers in [`crate::ingest`], consumed by the chunkers.
/// Ordering is transcript chronological order and is significant for chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub speaker: Option<String>,
    pub text: String,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

/// Which chunking policy produced a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    Naive,
    SpeakerTurn,
}

impl ChunkStrategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "naive" => Some(ChunkStrategy::Naive),
            "speaker_turn" => Some(ChunkStrategy::SpeakerTurn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStrategy::Naive => "naive",
            ChunkStrategy::SpeakerTurn => "speaker_turn",
        }
    }
}

/// A retrieval unit ready for embedding and storage.
///
/// `chunk_index` is dense and strictly increasing within one ingestion run,
/// starting at 0. `content` is never empty. Write-once: embeddings are
/// attached externally, never mutated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub speaker: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub chunk_index: usize,
    pub strategy: ChunkStrategy,
}

/// Meeting metadata stored alongside chunks (no auto-generated fields).
#[derive(Debug, Clone, Serialize)]
pub struct NewMeeting {
    pub title: String,
    pub raw_transcript: String,
    pub source_file: Option<String>,
    pub transcript_format: Option<String>,
    pub duration_seconds: Option<f64>,
    pub num_speakers: Option<usize>,
}

/// Type of a previously-extracted structured item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    ActionItem,
    Decision,
    Topic,
}

impl ItemType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "action_item" => Some(ItemType::ActionItem),
            "decision" => Some(ItemType::Decision),
            "topic" => Some(ItemType::Topic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::ActionItem => "action_item",
            ItemType::Decision => "decision",
            ItemType::Topic => "topic",
        }
    }

    /// Section heading used in structured answers.
    pub fn heading(&self) -> &'static str {
        match self {
            ItemType::ActionItem => "Action Items",
            ItemType::Decision => "Decisions",
            ItemType::Topic => "Key Topics",
        }
    }

    /// Pluralized, space-separated label ("action items", "decisions", ...).
    pub fn plural_label(&self) -> String {
        format!("{}s", self.as_str().replace('_', " "))
    }
}

/// An action item, decision, or topic extracted from a meeting, as returned
/// by the structured-item store (newest first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub item_type: ItemType,
    pub content: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub meeting_id: Option<String>,
    /// Extractor's 0-1 confidence in the item.
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
