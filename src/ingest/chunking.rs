use crate::models::{Chunk, ChunkStrategy, TranscriptSegment};

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_OVERLAP: usize = 50;
pub const DEFAULT_MAX_CHUNK_TOKENS: usize = 500;

/// Rough token estimate: whitespace-delimited word count. Deliberately not
/// real tokenization.
fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Fixed-window chunking: flatten all segments into one word stream and slide
/// a `chunk_size`-word window advancing by `chunk_size - overlap` words.
///
/// Start/end times come from the first and last segment touched by each
/// window. The last window may be shorter. When `overlap >= chunk_size` the
/// step degenerates to advancing to the window's end so the loop always
/// terminates.
pub fn naive_chunk(
    segments: &[TranscriptSegment],
    chunk_size: usize,
    overlap: usize,
) -> Vec<Chunk> {
    if segments.is_empty() {
        return Vec::new();
    }

    // Flat list of (word, segment index) pairs to track provenance.
    let mut word_seg_pairs: Vec<(&str, usize)> = Vec::new();
    for (seg_idx, seg) in segments.iter().enumerate() {
        for word in seg.text.split_whitespace() {
            word_seg_pairs.push((word, seg_idx));
        }
    }

    if word_seg_pairs.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut chunk_index = 0;

    while start < word_seg_pairs.len() {
        let end = (start + chunk_size).min(word_seg_pairs.len());
        let window = &word_seg_pairs[start..end];

        let content = window
            .iter()
            .map(|(w, _)| *w)
            .collect::<Vec<_>>()
            .join(" ");
        let first_seg = window[0].1;
        let last_seg = window[window.len() - 1].1;

        chunks.push(Chunk {
            content,
            speaker: None,
            start_time: segments[first_seg].start_time,
            end_time: segments[last_seg].end_time,
            chunk_index,
            strategy: ChunkStrategy::Naive,
        });

        chunk_index += 1;
        if chunk_size > overlap {
            start += chunk_size - overlap;
        } else {
            start = end;
        }
    }

    chunks
}

/// Speaker-turn chunking: merge consecutive segments with the same speaker
/// (consecutive `None` speakers count as matching) into one turn, then split
/// turns longer than `max_chunk_tokens` words into fixed-size sub-chunks.
///
/// Sub-chunks inherit the whole turn's time bounds and speaker, not
/// per-sub-chunk ranges.
pub fn speaker_turn_chunk(
    segments: &[TranscriptSegment],
    max_chunk_tokens: usize,
) -> Vec<Chunk> {
    if segments.is_empty() {
        return Vec::new();
    }

    // Group consecutive segments by speaker.
    let mut groups: Vec<(Option<String>, Vec<&TranscriptSegment>)> = Vec::new();
    for seg in segments {
        match groups.last_mut() {
            Some((speaker, group)) if *speaker == seg.speaker => group.push(seg),
            _ => groups.push((seg.speaker.clone(), vec![seg])),
        }
    }

    let mut chunks = Vec::new();
    let mut chunk_index = 0;

    for (speaker, group) in groups {
        let content = group
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let start_time = group[0].start_time;
        let end_time = group[group.len() - 1].end_time;

        if estimate_tokens(&content) <= max_chunk_tokens {
            chunks.push(Chunk {
                content,
                speaker,
                start_time,
                end_time,
                chunk_index,
                strategy: ChunkStrategy::SpeakerTurn,
            });
            chunk_index += 1;
        } else {
            let words: Vec<&str> = content.split_whitespace().collect();
            for sub in words.chunks(max_chunk_tokens) {
                chunks.push(Chunk {
                    content: sub.join(" "),
                    speaker: speaker.clone(),
                    start_time,
                    end_time,
                    chunk_index,
                    strategy: ChunkStrategy::SpeakerTurn,
                });
                chunk_index += 1;
            }
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(speaker: Option<&str>, text: &str, start: f64, end: f64) -> TranscriptSegment {
        TranscriptSegment {
            speaker: speaker.map(|s| s.to_string()),
            text: text.to_string(),
            start_time: Some(start),
            end_time: Some(end),
        }
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn both_chunkers_return_empty_for_empty_input() {
        assert!(naive_chunk(&[], DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP).is_empty());
        assert!(speaker_turn_chunk(&[], DEFAULT_MAX_CHUNK_TOKENS).is_empty());
    }

    #[test]
    fn naive_indices_are_dense_from_zero() {
        let segments = vec![seg(Some("A"), &words(120), 0.0, 10.0)];
        let chunks = naive_chunk(&segments, 50, 10);
        assert!(!chunks.is_empty());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.strategy, ChunkStrategy::Naive);
            assert!(!c.content.is_empty());
        }
    }

    #[test]
    fn naive_windows_overlap() {
        let segments = vec![seg(None, &words(10), 0.0, 1.0)];
        let chunks = naive_chunk(&segments, 6, 2);
        // Window 1: w0..w5, window 2 starts at w4.
        assert_eq!(chunks[0].content, "w0 w1 w2 w3 w4 w5");
        assert!(chunks[1].content.starts_with("w4 w5"));
    }

    #[test]
    fn naive_times_span_touched_segments() {
        let segments = vec![
            seg(Some("A"), &words(4), 0.0, 2.0),
            seg(Some("B"), &words(4), 2.0, 5.0),
        ];
        let chunks = naive_chunk(&segments, 100, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_time, Some(0.0));
        assert_eq!(chunks[0].end_time, Some(5.0));
    }

    #[test]
    fn naive_terminates_when_overlap_exceeds_chunk_size() {
        let segments = vec![seg(None, &words(30), 0.0, 1.0)];
        let chunks = naive_chunk(&segments, 10, 10);
        assert_eq!(chunks.len(), 3);
        let chunks = naive_chunk(&segments, 10, 25);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn naive_skips_whitespace_only_segments() {
        let segments = vec![seg(None, "   ", 0.0, 1.0)];
        assert!(naive_chunk(&segments, 10, 2).is_empty());
    }

    #[test]
    fn speaker_turns_merge_consecutive_same_speaker() {
        let segments = vec![
            seg(Some("Alice"), "first part.", 0.0, 1.0),
            seg(Some("Alice"), "second part.", 1.0, 2.0),
            seg(Some("Bob"), "reply.", 2.0, 3.0),
            seg(Some("Alice"), "again.", 3.0, 4.0),
        ];
        let chunks = speaker_turn_chunk(&segments, 500);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "first part. second part.");
        assert_eq!(chunks[0].speaker.as_deref(), Some("Alice"));
        assert_eq!(chunks[0].start_time, Some(0.0));
        assert_eq!(chunks[0].end_time, Some(2.0));
        assert_eq!(chunks[1].speaker.as_deref(), Some("Bob"));
        assert_eq!(chunks[2].speaker.as_deref(), Some("Alice"));
    }

    #[test]
    fn consecutive_unknown_speakers_merge() {
        let segments = vec![
            seg(None, "one", 0.0, 1.0),
            seg(None, "two", 1.0, 2.0),
        ];
        let chunks = speaker_turn_chunk(&segments, 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "one two");
        assert_eq!(chunks[0].speaker, None);
    }

    #[test]
    fn long_turns_split_and_inherit_turn_times() {
        let segments = vec![seg(Some("A"), &words(25), 0.0, 60.0)];
        let chunks = speaker_turn_chunk(&segments, 10);
        assert_eq!(chunks.len(), 3);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert!(estimate_tokens(&c.content) <= 10);
            assert_eq!(c.speaker.as_deref(), Some("A"));
            // Every sub-chunk carries the whole turn's bounds.
            assert_eq!(c.start_time, Some(0.0));
            assert_eq!(c.end_time, Some(60.0));
        }
        assert_eq!(estimate_tokens(&chunks[2].content), 5);
    }

    #[test]
    fn chunkers_are_deterministic() {
        let segments = vec![
            seg(Some("A"), &words(30), 0.0, 2.0),
            seg(Some("B"), &words(15), 2.0, 4.0),
        ];
        assert_eq!(naive_chunk(&segments, 12, 3), naive_chunk(&segments, 12, 3));
        assert_eq!(
            speaker_turn_chunk(&segments, 10),
            speaker_turn_chunk(&segments, 10)
        );
    }
}
