use anyhow::Result;
use serde_json::Value;

use crate::error::Error;
use crate::ingest::json::seconds_from_ambiguous;
use crate::ingest::{IngestOptions, IngestReport};
use crate::models::{Chunk, NewMeeting, TranscriptSegment};
use crate::remote::{ChunkWriter, Embedder};

/// Parse one MeetingBank export record into a title plus segments.
///
/// MeetingBank structure varies; we accept:
/// - `transcript` as a list of segment objects (`text`/`sentence`, optional
///   `speaker`, `start`/`start_time`, `end`/`end_time`) or bare strings;
/// - `transcript` as one long string, split on sentence boundaries so
///   downstream chunking has reasonable segments to work with.
///
/// Segment times in this format have no declared unit, so they go through
/// the lossy [`seconds_from_ambiguous`] heuristic.
pub fn parse_meetingbank(record: &Value) -> Result<(String, Vec<TranscriptSegment>), Error> {
    let Some(obj) = record.as_object() else {
        return Err(Error::UnrecognizedSchema { keys: Vec::new() });
    };

    let title = obj
        .get("title")
        .or_else(|| obj.get("uid"))
        .or_else(|| obj.get("id"))
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown Meeting")
        .to_string();

    let transcript = obj.get("transcript").ok_or_else(|| Error::UnrecognizedSchema {
        keys: obj.keys().cloned().collect(),
    })?;

    let segments = match transcript {
        Value::Array(entries) => entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| segment_from_entry(index, entry))
            .collect::<Result<Vec<_>, Error>>()?,
        Value::String(text) => split_sentences(text)
            .into_iter()
            .map(|sentence| TranscriptSegment {
                speaker: None,
                text: sentence,
                start_time: None,
                end_time: None,
            })
            .collect(),
        _ => {
            return Err(Error::UnrecognizedSchema {
                keys: obj.keys().cloned().collect(),
            })
        }
    };

    Ok((title, segments))
}

fn segment_from_entry(
    index: usize,
    entry: &Value,
) -> Option<Result<TranscriptSegment, Error>> {
    match entry {
        Value::Object(seg) => {
            let text = seg
                .get("text")
                .or_else(|| seg.get("sentence"))
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string());
            let Some(text) = text else {
                return Some(Err(Error::MissingSegmentText { index }));
            };
            if text.is_empty() {
                return None;
            }
            let speaker = seg
                .get("speaker")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            let start = seg
                .get("start_time")
                .or_else(|| seg.get("start"))
                .and_then(|v| v.as_f64())
                .map(seconds_from_ambiguous);
            let end = seg
                .get("end_time")
                .or_else(|| seg.get("end"))
                .and_then(|v| v.as_f64())
                .map(seconds_from_ambiguous);
            Some(Ok(TranscriptSegment {
                speaker,
                text,
                start_time: start,
                end_time: end,
            }))
        }
        Value::String(s) => {
            let text = s.trim();
            if text.is_empty() {
                return None;
            }
            Some(Ok(TranscriptSegment {
                speaker: None,
                text: text.to_string(),
                start_time: None,
                end_time: None,
            }))
        }
        _ => None,
    }
}

/// Split a long transcript string on sentence-ending punctuation followed by
/// whitespace. Good enough for chunking input; not a linguistic segmenter.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') && chars.peek().is_some_and(|c| c.is_whitespace()) {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Load a MeetingBank export (one record or an array of records) through the
/// standard chunk → embed → store pipeline.
pub fn load_meetingbank(
    content: &str,
    opts: &IngestOptions,
    embedder: &dyn Embedder,
    writer: &dyn ChunkWriter,
) -> Result<IngestReport> {
    let value: Value = serde_json::from_str(content).map_err(|e| Error::Decode {
        service: "meetingbank export",
        reason: e.to_string(),
    })?;

    let records: Vec<Value> = match value {
        Value::Array(records) => records,
        other => vec![other],
    };

    let mut report = IngestReport::default();
    for record in &records {
        let (title, segments) = parse_meetingbank(record)?;
        let chunks = crate::ingest::chunk_segments(
            &segments,
            opts.strategy,
            opts.chunk_size,
            opts.overlap,
            opts.max_chunk_tokens,
        );

        if opts.dry_run {
            println!(
                "  [dry-run] Would load: {} ({} segments, {} chunks)",
                title,
                segments.len(),
                chunks.len()
            );
            report.processed += 1;
            continue;
        }

        let raw_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_many(&texts)?;
        let chunks_with_embeddings: Vec<(Chunk, Vec<f32>)> =
            chunks.into_iter().zip(embeddings).collect();

        let meeting_id = writer.store_meeting(&NewMeeting {
            title: title.clone(),
            raw_transcript: raw_text,
            source_file: None,
            transcript_format: Some("meetingbank".to_string()),
            duration_seconds: segments.iter().rev().find_map(|s| s.end_time),
            num_speakers: None,
        })?;
        writer.store_chunks(&meeting_id, &chunks_with_embeddings)?;
        report.processed += 1;
        report.meeting_ids.push(meeting_id);
    }

    Ok(report)
}
