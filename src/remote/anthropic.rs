use serde::Deserialize;

use crate::error::Error;
use crate::models::{ExtractedItem, ItemType};
use crate::remote::{GeneratedAnswer, Generator, ItemExtractor};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const MAX_TOKENS: u32 = 1024;
const EXTRACTION_MAX_TOKENS: u32 = 4096;

const SERVICE: &str = "anthropic";

const EXTRACTION_TOOL_NAME: &str = "store_extracted_items";

const SYSTEM_PROMPT: &str = "You are a meeting intelligence assistant. Answer questions based \
on the provided meeting transcript excerpts.\n\n\
Rules:\n\
- Only answer based on the provided context. If the answer isn't in the context, say so.\n\
- Cite your sources using [Source N] notation.\n\
- Include speaker names when relevant.\n\
- Be concise and direct.";

const EXTRACTION_SYSTEM_PROMPT: &str = "You are a meeting intelligence assistant. Extract \
structured information from the meeting transcript provided.\n\n\
Extract:\n\
1. **Action items** — tasks that someone needs to complete. Include the \
assignee and deadline when mentioned.\n\
2. **Decisions** — conclusions or agreements reached during the meeting.\n\
3. **Key topics** — main subjects or themes discussed.\n\n\
Use the store_extracted_items tool to return your results. Be precise and \
only extract items clearly supported by the transcript. Assign a confidence \
score (0-1) to each item.";

/// Forced tool schema for extraction: one call carrying all three groups.
fn extraction_tool() -> serde_json::Value {
    let entry = |properties: serde_json::Value| {
        serde_json::json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": properties,
                "required": ["content", "confidence"],
            },
        })
    };

    serde_json::json!({
        "name": EXTRACTION_TOOL_NAME,
        "description": "Store structured items extracted from a meeting transcript. \
Call this once with all extracted action items, decisions, and topics.",
        "input_schema": {
            "type": "object",
            "properties": {
                "action_items": entry(serde_json::json!({
                    "content": {"type": "string", "description": "Description of the action item."},
                    "assignee": {"type": "string", "description": "Person assigned (null if unassigned)."},
                    "due_date": {"type": "string", "description": "Deadline if mentioned (free-form text)."},
                    "speaker": {"type": "string", "description": "Who mentioned or assigned this item."},
                    "confidence": {"type": "number", "description": "Confidence score 0-1."},
                })),
                "decisions": entry(serde_json::json!({
                    "content": {"type": "string", "description": "The decision that was made."},
                    "speaker": {"type": "string", "description": "Who announced or confirmed the decision."},
                    "confidence": {"type": "number", "description": "Confidence score 0-1."},
                })),
                "topics": entry(serde_json::json!({
                    "content": {"type": "string", "description": "Brief description of the topic."},
                    "speaker": {"type": "string", "description": "Primary speaker for this topic (if identifiable)."},
                    "confidence": {"type": "number", "description": "Confidence score 0-1."},
                })),
            },
            "required": ["action_items", "decisions", "topics"],
        },
    })
}

/// Answer-generation connector for the Anthropic Messages API.
pub struct AnthropicGenerator {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl AnthropicGenerator {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl AnthropicGenerator {
    fn send(&self, body: serde_json::Value) -> Result<MessagesResponse, Error> {
        let url = format!("{}/messages", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .map_err(|e| Error::unavailable(SERVICE, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(Error::Api {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        resp.json().map_err(|e| Error::Decode {
            service: SERVICE,
            reason: e.to_string(),
        })
    }
}

impl Generator for AnthropicGenerator {
    fn generate(&self, question: &str, context: &str) -> Result<GeneratedAnswer, Error> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": SYSTEM_PROMPT,
            "messages": [{
                "role": "user",
                "content": format!(
                    "Context from meeting transcripts:\n\n{context}\n\nQuestion: {question}"
                ),
            }],
        });

        let parsed = self.send(body)?;

        let answer = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(GeneratedAnswer {
            answer,
            model: parsed.model,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
        })
    }
}

impl ItemExtractor for AnthropicGenerator {
    fn extract_items(&self, transcript: &str) -> Result<Vec<ExtractedItem>, Error> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": EXTRACTION_MAX_TOKENS,
            "system": EXTRACTION_SYSTEM_PROMPT,
            "tools": [extraction_tool()],
            "tool_choice": {"type": "tool", "name": EXTRACTION_TOOL_NAME},
            "messages": [{
                "role": "user",
                "content": format!(
                    "Extract action items, decisions, and key topics from this \
meeting transcript:\n\n{transcript}"
                ),
            }],
        });

        let parsed = self.send(body)?;

        let mut items = Vec::new();
        for block in parsed.content {
            if block.name.as_deref() != Some(EXTRACTION_TOOL_NAME) {
                continue;
            }
            let Some(input) = block.input else { continue };
            items.extend(decode_extraction(input)?);
        }
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    #[serde(default)]
    action_items: Vec<RawExtractedItem>,
    #[serde(default)]
    decisions: Vec<RawExtractedItem>,
    #[serde(default)]
    topics: Vec<RawExtractedItem>,
}

#[derive(Debug, Deserialize)]
struct RawExtractedItem {
    content: String,
    #[serde(default)]
    assignee: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    speaker: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Flatten one tool call's payload into items, in the fixed group order
/// action items → decisions → topics. Only action items carry assignee and
/// due date; the model sometimes invents them for the other groups.
fn decode_extraction(input: serde_json::Value) -> Result<Vec<ExtractedItem>, Error> {
    let payload: ExtractionPayload =
        serde_json::from_value(input).map_err(|e| Error::Decode {
            service: SERVICE,
            reason: e.to_string(),
        })?;

    let item = |raw: RawExtractedItem, item_type: ItemType| {
        let is_action = item_type == ItemType::ActionItem;
        ExtractedItem {
            item_type,
            content: raw.content,
            assignee: if is_action { raw.assignee } else { None },
            due_date: if is_action { raw.due_date } else { None },
            speaker: raw.speaker,
            meeting_id: None,
            confidence: raw.confidence.or(Some(1.0)),
            created_at: None,
        }
    };

    let mut items = Vec::new();
    items.extend(
        payload
            .action_items
            .into_iter()
            .map(|raw| item(raw, ItemType::ActionItem)),
    );
    items.extend(
        payload
            .decisions
            .into_iter()
            .map(|raw| item(raw, ItemType::Decision)),
    );
    items.extend(
        payload
            .topics
            .into_iter()
            .map(|raw| item(raw, ItemType::Topic)),
    );
    Ok(items)
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
    // Set on tool_use blocks.
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    input: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
