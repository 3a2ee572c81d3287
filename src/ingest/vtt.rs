use std::sync::LazyLock;

use regex::Regex;

use crate::models::TranscriptSegment;

// Cue line: `H:MM:SS.mmm --> H:MM:SS.mmm`. The hour field is optional and
// SRT-style comma millis are accepted.
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((?:\d{1,2}:)?\d{1,2}:\d{2}[.,]\d{3})\s*-->\s*((?:\d{1,2}:)?\d{1,2}:\d{2}[.,]\d{3})")
        .unwrap()
});

static SPEAKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+?):\s+(.+)$").unwrap());

// Microsoft Teams inline voice tag `<v SpeakerName>text</v>`. The closing
// tag is optional per the WebVTT spec.
static VOICE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^<v ([^>]+)>(.*?)(?:</v>)?$").unwrap());

/// Parse a WebVTT transcript into segments.
///
/// Speaker labels come in two forms: Teams voice tags (`<v Alice>Hello</v>`)
/// and colon-style labels (`Alice: Hello`). When both appear in the same cue
/// the voice tag wins and is stripped from the content. Cues whose text is
/// empty after stripping are discarded.
pub fn parse_vtt(content: &str) -> Vec<TranscriptSegment> {
    let lines: Vec<&str> = content.trim().lines().collect();
    let mut segments = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        let Some(caps) = TIMESTAMP_RE.captures(line) else {
            i += 1;
            continue;
        };

        let start = parse_timestamp(&caps[1].replace(',', "."));
        let end = parse_timestamp(&caps[2].replace(',', "."));

        // Collect text lines until a blank line or the next cue.
        let mut text_lines = Vec::new();
        i += 1;
        while i < lines.len() && !lines[i].trim().is_empty() && !TIMESTAMP_RE.is_match(lines[i]) {
            text_lines.push(lines[i].trim());
            i += 1;
        }

        let joined = text_lines.join(" ");
        let (speaker, text) = extract_speaker(&joined);

        if !text.is_empty() {
            segments.push(TranscriptSegment {
                speaker,
                text,
                start_time: Some(start),
                end_time: Some(end),
            });
        }
    }

    segments
}

/// Voice tag takes precedence over the colon form.
fn extract_speaker(cue_text: &str) -> (Option<String>, String) {
    if let Some(caps) = VOICE_TAG_RE.captures(cue_text) {
        return (
            Some(caps[1].trim().to_string()),
            caps[2].trim().to_string(),
        );
    }
    if let Some(caps) = SPEAKER_RE.captures(cue_text) {
        return (Some(caps[1].to_string()), caps[2].to_string());
    }
    (None, cue_text.to_string())
}

/// Convert `H:MM:SS.mmm` (hour optional) to seconds.
fn parse_timestamp(ts: &str) -> f64 {
    let parts: Vec<&str> = ts.trim().split(':').collect();
    let (h, m, s) = match parts.len() {
        3 => (parts[0], parts[1], parts[2]),
        2 => ("0", parts[0], parts[1]),
        _ => return 0.0,
    };
    let hours: f64 = h.parse().unwrap_or(0.0);
    let minutes: f64 = m.parse().unwrap_or(0.0);
    let seconds: f64 = s.parse().unwrap_or(0.0);
    hours * 3600.0 + minutes * 60.0 + seconds
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
WEBVTT

00:00:01.000 --> 00:00:04.500
Alice: Welcome everyone to the planning meeting.

00:00:05.000 --> 00:00:09.250
Bob: Thanks. Let's start with the roadmap.
";

    #[test]
    fn parses_cues_with_colon_speakers() {
        let segments = parse_vtt(SAMPLE);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].speaker.as_deref(), Some("Alice"));
        assert_eq!(segments[0].text, "Welcome everyone to the planning meeting.");
        assert_eq!(segments[0].start_time, Some(1.0));
        assert_eq!(segments[0].end_time, Some(4.5));
        assert_eq!(segments[1].speaker.as_deref(), Some("Bob"));
    }

    #[test]
    fn voice_tag_wins_and_is_stripped() {
        let vtt = "00:00:01.000 --> 00:00:02.000\n<v Alice>Hello</v>\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].speaker.as_deref(), Some("Alice"));
        assert_eq!(segments[0].text, "Hello");
        assert!(!segments[0].text.contains('<'));
    }

    #[test]
    fn voice_tag_without_closing_tag() {
        let vtt = "00:00:01.000 --> 00:00:02.000\n<v Bob Smith>Sounds good to me\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments[0].speaker.as_deref(), Some("Bob Smith"));
        assert_eq!(segments[0].text, "Sounds good to me");
    }

    #[test]
    fn hourless_timestamps_and_comma_millis() {
        let vtt = "01:23,400 --> 01:30,000\nNo hour field here.\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments.len(), 1);
        assert!((segments[0].start_time.unwrap() - 83.4).abs() < 1e-9);
        assert_eq!(segments[0].end_time, Some(90.0));
    }

    #[test]
    fn multiline_cue_text_is_joined() {
        let vtt = "00:00:01.000 --> 00:00:05.000\nAlice: First line\nsecond line\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments[0].text, "First line second line");
    }

    #[test]
    fn empty_cue_is_discarded() {
        let vtt = "00:00:01.000 --> 00:00:02.000\n<v Alice></v>\n\n00:00:03.000 --> 00:00:04.000\nBob: Hi\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].speaker.as_deref(), Some("Bob"));
    }

    #[test]
    fn cue_without_speaker() {
        let vtt = "00:00:01.000 --> 00:00:02.000\n[inaudible]\n";
        let segments = parse_vtt(vtt);
        assert_eq!(segments[0].speaker, None);
        assert_eq!(segments[0].text, "[inaudible]");
    }
}
