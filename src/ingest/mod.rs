pub mod chunking;
pub mod json;
pub mod meetingbank;
pub mod text;
pub mod vtt;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::error::Error;
use crate::models::{Chunk, ChunkStrategy, NewMeeting, TranscriptSegment};
use crate::remote::{ChunkWriter, Embedder};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format {
    Vtt,
    Text,
    Json,
}

impl Format {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "vtt" => Some(Format::Vtt),
            "text" | "txt" | "plain_text" => Some(Format::Text),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    pub fn detect_from_extension(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("vtt") => Some(Format::Vtt),
            Some("txt" | "text") => Some(Format::Text),
            Some("json") => Some(Format::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Vtt => "vtt",
            Format::Text => "text",
            Format::Json => "json",
        }
    }
}

/// Dispatch to the parser for the given format, normalizing the transcript
/// into ordered speaker-tagged segments.
pub fn parse_transcript(content: &str, format: Format) -> Result<Vec<TranscriptSegment>, Error> {
    match format {
        Format::Vtt => Ok(vtt::parse_vtt(content)),
        Format::Text => Ok(text::parse_text(content)),
        Format::Json => json::parse_json(content),
    }
}

/// Like [`parse_transcript`] but from a raw format string, failing with
/// `UnsupportedFormat` for anything unknown.
pub fn parse_transcript_named(
    content: &str,
    format: &str,
) -> Result<Vec<TranscriptSegment>, Error> {
    let format = Format::from_str(format).ok_or_else(|| Error::UnsupportedFormat(format.into()))?;
    parse_transcript(content, format)
}

/// Apply the requested chunking policy with the given knobs.
pub fn chunk_segments(
    segments: &[TranscriptSegment],
    strategy: ChunkStrategy,
    chunk_size: usize,
    overlap: usize,
    max_chunk_tokens: usize,
) -> Vec<Chunk> {
    match strategy {
        ChunkStrategy::Naive => chunking::naive_chunk(segments, chunk_size, overlap),
        ChunkStrategy::SpeakerTurn => chunking::speaker_turn_chunk(segments, max_chunk_tokens),
    }
}

/// Knobs for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub strategy: ChunkStrategy,
    pub chunk_size: usize,
    pub overlap: usize,
    pub max_chunk_tokens: usize,
    pub dry_run: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::SpeakerTurn,
            chunk_size: chunking::DEFAULT_CHUNK_SIZE,
            overlap: chunking::DEFAULT_OVERLAP,
            max_chunk_tokens: chunking::DEFAULT_MAX_CHUNK_TOKENS,
            dry_run: false,
        }
    }
}

/// Full ingestion pipeline: parse → chunk → embed → store. Returns the
/// stored meeting id, or `None` on a dry run.
pub fn ingest_transcript(
    content: &str,
    format: Format,
    title: &str,
    source_file: Option<&str>,
    opts: &IngestOptions,
    embedder: &dyn Embedder,
    writer: &dyn ChunkWriter,
) -> Result<Option<String>> {
    let segments = parse_transcript(content, format)?;
    let chunks = chunk_segments(
        &segments,
        opts.strategy,
        opts.chunk_size,
        opts.overlap,
        opts.max_chunk_tokens,
    );

    if opts.dry_run {
        println!(
            "  [dry-run] Would ingest: {} ({}, {} segments, {} chunks, strategy={})",
            title,
            format.as_str(),
            segments.len(),
            chunks.len(),
            opts.strategy.as_str(),
        );
        return Ok(None);
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = embedder.embed_many(&texts)?;
    let chunks_with_embeddings: Vec<(Chunk, Vec<f32>)> =
        chunks.into_iter().zip(embeddings).collect();

    let speakers: HashSet<&str> = segments
        .iter()
        .filter_map(|s| s.speaker.as_deref())
        .collect();
    let duration = segments.iter().rev().find_map(|s| s.end_time);

    let meeting_id = writer.store_meeting(&NewMeeting {
        title: title.to_string(),
        raw_transcript: content.to_string(),
        source_file: source_file.map(|s| s.to_string()),
        transcript_format: Some(format.as_str().to_string()),
        duration_seconds: duration,
        num_speakers: (!speakers.is_empty()).then_some(speakers.len()),
    })?;

    writer.store_chunks(&meeting_id, &chunks_with_embeddings)?;
    info!(
        "Ingested {} ({} chunks) as meeting {}",
        title,
        chunks_with_embeddings.len(),
        meeting_id
    );

    Ok(Some(meeting_id))
}

/// Outcome of an ingestion run. On a dry run `processed` counts the files
/// that would be ingested and `meeting_ids` stays empty.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub processed: usize,
    pub meeting_ids: Vec<String>,
}

impl IngestReport {
    fn record(&mut self, meeting_id: Option<String>) {
        self.processed += 1;
        if let Some(id) = meeting_id {
            self.meeting_ids.push(id);
        }
    }
}

/// Ingest one or more paths (files or glob patterns).
pub fn ingest_paths(
    paths: &[String],
    format_override: Option<Format>,
    opts: &IngestOptions,
    embedder: &dyn Embedder,
    writer: &dyn ChunkWriter,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    for path_str in paths {
        let path = Path::new(path_str);
        if path.is_file() {
            report.record(ingest_file(path, format_override, opts, embedder, writer)?);
        } else {
            let matches: Vec<_> = glob::glob(path_str)
                .with_context(|| format!("Invalid path or glob pattern: {path_str}"))?
                .filter_map(|r| r.ok())
                .collect();

            if matches.is_empty() {
                bail!("No files found matching: {path_str}");
            }

            for entry in matches {
                if entry.is_file() {
                    report.record(ingest_file(&entry, format_override, opts, embedder, writer)?);
                }
            }
        }
    }

    Ok(report)
}

/// Ingest from stdin. A title is required since there is no filename to
/// derive one from.
pub fn ingest_stdin(
    title: &str,
    format_override: Option<Format>,
    opts: &IngestOptions,
    embedder: &dyn Embedder,
    writer: &dyn ChunkWriter,
) -> Result<Option<String>> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read from stdin")?;

    if content.trim().is_empty() {
        bail!("Empty input from stdin");
    }

    let format = format_override.unwrap_or_else(|| detect_format(&content));
    ingest_transcript(&content, format, title, None, opts, embedder, writer)
}

fn ingest_file(
    path: &Path,
    format_override: Option<Format>,
    opts: &IngestOptions,
    embedder: &dyn Embedder,
    writer: &dyn ChunkWriter,
) -> Result<Option<String>> {
    let format = format_override
        .or_else(|| Format::detect_from_extension(path))
        .with_context(|| format!("Cannot determine format for: {}", path.display()))?;

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;

    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled")
        .replace(['-', '_'], " ");

    let source_file = path.file_name().and_then(|n| n.to_str());

    ingest_transcript(&content, format, &title, source_file, opts, embedder, writer)
}

/// Content sniffing for stdin: `{` means JSON, a cue arrow or WEBVTT header
/// means VTT, anything else is plain text.
fn detect_format(content: &str) -> Format {
    let trimmed = content.trim_start();
    if trimmed.starts_with('{') {
        Format::Json
    } else if trimmed.starts_with("WEBVTT") || trimmed.contains("-->") {
        Format::Vtt
    } else {
        Format::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_str_accepts_aliases() {
        assert_eq!(Format::from_str("vtt"), Some(Format::Vtt));
        assert_eq!(Format::from_str("plain_text"), Some(Format::Text));
        assert_eq!(Format::from_str("TXT"), Some(Format::Text));
        assert_eq!(Format::from_str("json"), Some(Format::Json));
        assert_eq!(Format::from_str("srt"), None);
    }

    #[test]
    fn unknown_named_format_is_unsupported() {
        let err = parse_transcript_named("x", "docx").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(f) if f == "docx"));
    }

    #[test]
    fn stdin_sniffing() {
        assert_eq!(detect_format("{\"segments\": []}"), Format::Json);
        assert_eq!(detect_format("WEBVTT\n\n00:01.000 --> 00:02.000\nhi"), Format::Vtt);
        assert_eq!(detect_format("Alice: hello"), Format::Text);
    }
}
