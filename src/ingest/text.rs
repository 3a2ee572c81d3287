use std::sync::LazyLock;

use regex::Regex;

use crate::models::TranscriptSegment;

static SPEAKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+?):\s+(.+)$").unwrap());

/// Parse a plain-text transcript: one segment per non-blank line, with an
/// optional leading `Speaker: ` label. Blank lines are dropped. Plain text
/// carries no timing information.
pub fn parse_text(content: &str) -> Vec<TranscriptSegment> {
    content
        .trim()
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let (speaker, text) = match SPEAKER_RE.captures(line) {
                Some(caps) => (Some(caps[1].to_string()), caps[2].to_string()),
                None => (None, line.to_string()),
            };
            Some(TranscriptSegment {
                speaker,
                text,
                start_time: None,
                end_time: None,
            })
        })
        .collect()
}
