use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;
use crate::models::TranscriptSegment;

/// The three JSON transcript shapes we accept, discriminated by which
/// top-level key is present. Priority: `utterances` → `transcription` →
/// `segments`.
enum JsonDoc {
    /// AssemblyAI export — times in milliseconds.
    Utterances(Vec<Utterance>),
    /// MeetingBank canonical — `speaker_id` field, times in seconds.
    Transcription(Vec<TranscriptionItem>),
    /// Internal segments format — times in seconds.
    Segments(Vec<SegmentItem>),
}

#[derive(Debug, Deserialize)]
struct Utterance {
    speaker: Option<String>,
    text: Option<String>,
    #[serde(default)]
    start: Option<f64>,
    #[serde(default)]
    end: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionItem {
    speaker_id: Option<String>,
    text: Option<String>,
    #[serde(default)]
    start_time: Option<f64>,
    #[serde(default)]
    end_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SegmentItem {
    speaker: Option<String>,
    text: Option<String>,
    #[serde(default)]
    start_time: Option<f64>,
    #[serde(default)]
    end_time: Option<f64>,
}

/// Parse a JSON transcript in any of the three supported schemas.
pub fn parse_json(content: &str) -> Result<Vec<TranscriptSegment>, Error> {
    let value: Value = serde_json::from_str(content).map_err(|e| Error::Decode {
        service: "json transcript",
        reason: e.to_string(),
    })?;

    match classify(&value)? {
        JsonDoc::Utterances(utterances) => utterances
            .into_iter()
            .enumerate()
            .map(|(index, u)| {
                Ok(TranscriptSegment {
                    speaker: u.speaker,
                    text: required_text(u.text, index)?,
                    start_time: Some(u.start.unwrap_or(0.0) / 1000.0),
                    end_time: Some(u.end.unwrap_or(0.0) / 1000.0),
                })
            })
            .collect(),
        JsonDoc::Transcription(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, t)| {
                Ok(TranscriptSegment {
                    speaker: t.speaker_id,
                    text: required_text(t.text, index)?,
                    start_time: t.start_time,
                    end_time: t.end_time,
                })
            })
            .collect(),
        JsonDoc::Segments(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, s)| {
                Ok(TranscriptSegment {
                    speaker: s.speaker,
                    text: required_text(s.text, index)?,
                    start_time: s.start_time,
                    end_time: s.end_time,
                })
            })
            .collect(),
    }
}

/// Pick the schema variant by top-level key presence. An unknown shape fails
/// with the keys actually found so the caller can diagnose their export.
fn classify(value: &Value) -> Result<JsonDoc, Error> {
    let Some(obj) = value.as_object() else {
        return Err(Error::UnrecognizedSchema { keys: Vec::new() });
    };

    if let Some(raw) = obj.get("utterances") {
        return Ok(JsonDoc::Utterances(decode_list("utterances", raw)?));
    }
    if let Some(raw) = obj.get("transcription") {
        return Ok(JsonDoc::Transcription(decode_list("transcription", raw)?));
    }
    if let Some(raw) = obj.get("segments") {
        return Ok(JsonDoc::Segments(decode_list("segments", raw)?));
    }

    Err(Error::UnrecognizedSchema {
        keys: obj.keys().cloned().collect(),
    })
}

fn decode_list<T: for<'de> Deserialize<'de>>(
    key: &'static str,
    raw: &Value,
) -> Result<Vec<T>, Error> {
    serde_json::from_value(raw.clone()).map_err(|e| Error::Decode {
        service: key,
        reason: e.to_string(),
    })
}

fn required_text(text: Option<String>, index: usize) -> Result<String, Error> {
    text.ok_or(Error::MissingSegmentText { index })
}

/// Convert a timestamp of ambiguous unit to seconds: values above 1000 are
/// assumed to be milliseconds and divided by 1000.
///
/// This is a lossy heuristic inherited from free-form dataset exports whose
/// segment times may be in either unit: a genuine seconds value above 1000
/// (a meeting past the ~17 minute mark) would be misclassified. Kept for
/// compatibility and isolated here so it can be revisited.
pub fn seconds_from_ambiguous(value: f64) -> f64 {
    if value > 1000.0 {
        value / 1000.0
    } else {
        value
    }
}
