use thiserror::Error;

/// Errors produced by the ingestion and retrieval core.
///
/// Everything here is terminal to the call that produced it; retry policy
/// belongs to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller asked for a transcript format we don't parse.
    #[error("unknown transcript format: {0:?} (supported: vtt, text, json)")]
    UnsupportedFormat(String),

    /// A JSON transcript matched none of the known top-level schemas.
    /// The key list is included so the caller can see what shape they sent.
    #[error("unrecognized JSON transcript format; top-level keys: [{}]", .keys.join(", "))]
    UnrecognizedSchema { keys: Vec<String> },

    /// A segment in an otherwise well-formed transcript has no `text` field.
    /// Fails loudly rather than dropping the segment — silent data loss in
    /// transcript ingestion is worse than a visible failure.
    #[error("segment {index} is missing required `text` field")]
    MissingSegmentText { index: usize },

    /// An embedding or search collaborator could not be reached. Callers must
    /// not treat this as "no matches".
    #[error("{service} unavailable: {reason}")]
    RetrievalUnavailable {
        service: &'static str,
        reason: String,
    },

    /// A collaborator was reachable but rejected the request.
    #[error("{service} returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// A collaborator answered with a payload we could not decode.
    #[error("failed to decode {service} response: {reason}")]
    Decode {
        service: &'static str,
        reason: String,
    },
}

impl Error {
    /// Map a transport-level reqwest failure to `RetrievalUnavailable`,
    /// preserving the service name for diagnosis.
    pub fn unavailable(service: &'static str, err: reqwest::Error) -> Self {
        Error::RetrievalUnavailable {
            service,
            reason: err.to_string(),
        }
    }
}
