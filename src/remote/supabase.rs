use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Error;
use crate::models::{Chunk, ChunkStrategy, ExtractedItem, ItemType, NewMeeting};
use crate::remote::{ChunkIndex, ChunkWriter, ItemStore, ItemWriter, MeetingReader, ScoredChunk};

const SERVICE: &str = "supabase";

// Chunk inserts are batched to keep request bodies bounded.
const INSERT_BATCH_SIZE: usize = 50;

/// Connector for a Supabase (PostgREST) backend holding meetings, chunks with
/// pgvector embeddings, and extracted items.
///
/// Search is delegated to two SQL functions exposed as RPCs: `match_chunks`
/// (pure vector similarity) and `hybrid_search` (backend-fused vector +
/// full-text score).
pub struct SupabaseStore {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl SupabaseStore {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn rpc(&self, function: &str, body: serde_json::Value) -> Result<serde_json::Value, Error> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        debug!("RPC {function}");
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .map_err(|e| Error::unavailable(SERVICE, e))?;
        self.read_json(resp)
    }

    fn get(&self, path_and_query: &str) -> Result<serde_json::Value, Error> {
        let url = format!("{}/rest/v1/{}", self.base_url, path_and_query);
        let resp = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .map_err(|e| Error::unavailable(SERVICE, e))?;
        self.read_json(resp)
    }

    fn insert(&self, table: &str, rows: serde_json::Value) -> Result<serde_json::Value, Error> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=representation")
            .json(&rows)
            .send()
            .map_err(|e| Error::unavailable(SERVICE, e))?;
        self.read_json(resp)
    }

    fn read_json(&self, resp: reqwest::blocking::Response) -> Result<serde_json::Value, Error> {
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

    fn decode_chunks(&self, value: serde_json::Value) -> Result<Vec<ScoredChunk>, Error> {
        serde_json::from_value(value).map_err(|e| Error::Decode {
            service: SERVICE,
            reason: e.to_string(),
        })
    }
}

impl ChunkIndex for SupabaseStore {
    fn match_chunks(
        &self,
        embedding: &[f32],
        count: usize,
        meeting_id: Option<&str>,
        strategy: Option<ChunkStrategy>,
    ) -> Result<Vec<ScoredChunk>, Error> {
        let value = self.rpc(
            "match_chunks",
            serde_json::json!({
                "query_embedding": embedding,
                "match_count": count,
                "filter_meeting_id": meeting_id,
                "filter_strategy": strategy.map(|s| s.as_str()),
            }),
        )?;
        self.decode_chunks(value)
    }

    fn hybrid_match(
        &self,
        embedding: &[f32],
        query_text: &str,
        count: usize,
        vector_weight: f64,
        text_weight: f64,
    ) -> Result<Vec<ScoredChunk>, Error> {
        let value = self.rpc(
            "hybrid_search",
            serde_json::json!({
                "query_embedding": embedding,
                "query_text": query_text,
                "match_count": count,
                "vector_weight": vector_weight,
                "text_weight": text_weight,
            }),
        )?;
        self.decode_chunks(value)
    }

    fn meeting_titles(&self, ids: &[String]) -> Result<HashMap<String, String>, Error> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let id_list = ids
            .iter()
            .map(|id| format!("\"{id}\""))
            .collect::<Vec<_>>()
            .join(",");
        let value = self.get(&format!("meetings?select=id,title&id=in.({id_list})"))?;
        let rows: Vec<MeetingTitleRow> = serde_json::from_value(value).map_err(|e| Error::Decode {
            service: SERVICE,
            reason: e.to_string(),
        })?;
        Ok(rows.into_iter().map(|r| (r.id, r.title)).collect())
    }
}

impl ChunkWriter for SupabaseStore {
    fn store_meeting(&self, meeting: &NewMeeting) -> Result<String, Error> {
        let value = self.insert(
            "meetings",
            serde_json::json!([{
                "title": meeting.title,
                "raw_transcript": meeting.raw_transcript,
                "source_file": meeting.source_file,
                "transcript_format": meeting.transcript_format,
                "duration_seconds": meeting.duration_seconds,
                "num_speakers": meeting.num_speakers,
            }]),
        )?;

        let id = value
            .as_array()
            .and_then(|rows| rows.first())
            .and_then(|row| row.get("id"))
            .and_then(|id| id.as_str())
            .map(|id| id.to_string())
            .ok_or_else(|| Error::Decode {
                service: SERVICE,
                reason: "meeting insert returned no id".to_string(),
            })?;

        info!("Stored meeting {} ({})", meeting.title, id);
        Ok(id)
    }

    fn store_chunks(
        &self,
        meeting_id: &str,
        chunks: &[(Chunk, Vec<f32>)],
    ) -> Result<(), Error> {
        for batch in chunks.chunks(INSERT_BATCH_SIZE) {
            let rows: Vec<serde_json::Value> = batch
                .iter()
                .map(|(chunk, embedding)| {
                    serde_json::json!({
                        "meeting_id": meeting_id,
                        "content": chunk.content,
                        "speaker": chunk.speaker,
                        "start_time": chunk.start_time,
                        "end_time": chunk.end_time,
                        "chunk_index": chunk.chunk_index,
                        "strategy": chunk.strategy.as_str(),
                        "embedding": embedding,
                    })
                })
                .collect();
            self.insert("chunks", serde_json::Value::Array(rows))?;
        }
        info!("Stored {} chunks for meeting {}", chunks.len(), meeting_id);
        Ok(())
    }
}

impl ItemStore for SupabaseStore {
    fn lookup_items(
        &self,
        meeting_id: Option<&str>,
        item_type: Option<ItemType>,
    ) -> Result<Vec<ExtractedItem>, Error> {
        let mut query = String::from("extracted_items?select=*&order=created_at.desc");
        if let Some(id) = meeting_id {
            query.push_str(&format!("&meeting_id=eq.{id}"));
        }
        if let Some(t) = item_type {
            query.push_str(&format!("&item_type=eq.{}", t.as_str()));
        }
        let value = self.get(&query)?;
        serde_json::from_value(value).map_err(|e| Error::Decode {
            service: SERVICE,
            reason: e.to_string(),
        })
    }
}

impl MeetingReader for SupabaseStore {
    fn raw_transcript(&self, meeting_id: &str) -> Result<String, Error> {
        let value = self.get(&format!(
            "meetings?select=raw_transcript&id=eq.{meeting_id}"
        ))?;
        value
            .as_array()
            .and_then(|rows| rows.first())
            .and_then(|row| row.get("raw_transcript"))
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
            .ok_or_else(|| Error::Decode {
                service: SERVICE,
                reason: format!("no transcript found for meeting {meeting_id}"),
            })
    }
}

impl ItemWriter for SupabaseStore {
    fn store_items(&self, meeting_id: &str, items: &[ExtractedItem]) -> Result<usize, Error> {
        if items.is_empty() {
            return Ok(0);
        }
        for batch in items.chunks(INSERT_BATCH_SIZE) {
            let rows: Vec<serde_json::Value> = batch
                .iter()
                .map(|item| {
                    serde_json::json!({
                        "meeting_id": meeting_id,
                        "item_type": item.item_type.as_str(),
                        "content": item.content,
                        "assignee": item.assignee,
                        "due_date": item.due_date,
                        "speaker": item.speaker,
                        "confidence": item.confidence,
                    })
                })
                .collect();
            self.insert("extracted_items", serde_json::Value::Array(rows))?;
        }
        info!("Stored {} extracted items for meeting {}", items.len(), meeting_id);
        Ok(items.len())
    }
}

#[derive(Debug, Deserialize)]
struct MeetingTitleRow {
    id: String,
    title: String,
}
