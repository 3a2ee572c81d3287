use unicode_width::UnicodeWidthStr;

use crate::models::ExtractedItem;
use crate::remote::GeneratedAnswer;
use crate::retrieval::RetrievedChunk;

/// Truncate a string to fit within max_width (respecting unicode width).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

/// Format retrieved chunks as a readable ranked list.
pub fn print_retrieved_chunks(chunks: &[RetrievedChunk], query: &str) {
    if chunks.is_empty() {
        println!("No results for \"{query}\"");
        return;
    }

    println!(
        "{} result{} for \"{}\":\n",
        chunks.len(),
        if chunks.len() == 1 { "" } else { "s" },
        query
    );

    for (i, chunk) in chunks.iter().enumerate() {
        let time = chunk
            .start_time
            .map(format_timestamp)
            .unwrap_or_else(|| "--:--".to_string());
        let speaker = chunk.speaker.as_deref().unwrap_or("Unknown");
        let text = truncate(&chunk.content.replace('\n', " "), 80);

        println!("  {}. [{time}] {speaker}: {text}", i + 1);
        println!(
            "     └─ {} (score {:.3}, {})",
            truncate(
                chunk.meeting_title.as_deref().unwrap_or(&chunk.meeting_id),
                50
            ),
            chunk.score,
            chunk.strategy.as_str(),
        );
        println!();
    }
}

/// Print a generated answer followed by its source listing.
pub fn print_answer(answer: &GeneratedAnswer, sources: &[RetrievedChunk]) {
    println!("{}", answer.answer);

    if !sources.is_empty() {
        println!("\nSources:");
        for (i, chunk) in sources.iter().enumerate() {
            let title = chunk.meeting_title.as_deref().unwrap_or(&chunk.meeting_id);
            let time = chunk
                .start_time
                .map(format_timestamp)
                .unwrap_or_else(|| "--:--".to_string());
            println!(
                "  [{}] {} [{}] — {}",
                i + 1,
                truncate(title, 50),
                time,
                truncate(&chunk.content.replace('\n', " "), 60),
            );
        }
    }

    println!(
        "\n({}, {} in / {} out tokens)",
        answer.model, answer.input_tokens, answer.output_tokens
    );
}

/// Print extracted items for `mrag items`.
pub fn print_items(items: &[ExtractedItem]) {
    if items.is_empty() {
        println!("No extracted items found.");
        return;
    }

    println!(
        "{} item{}:\n",
        items.len(),
        if items.len() == 1 { "" } else { "s" }
    );

    print_item_lines(items);
}

/// One line per item, without the count header.
pub fn print_item_lines(items: &[ExtractedItem]) {
    for item in items {
        let mut line = format!("  [{}] {}", item.item_type.as_str(), item.content);
        if let Some(ref assignee) = item.assignee {
            line.push_str(&format!(" (assigned to {assignee})"));
        }
        if let Some(ref due) = item.due_date {
            line.push_str(&format!(" — due: {due}"));
        }
        println!("{line}");
    }
}

fn format_timestamp(seconds: f64) -> String {
    let total = seconds as u64;
    let m = total / 60;
    let s = total % 60;
    format!("{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate("short", 10), "short");
        let long = "a".repeat(20);
        let cut = truncate(&long, 10);
        assert!(cut.ends_with("..."));
        assert!(UnicodeWidthStr::width(cut.as_str()) <= 10);
    }

    #[test]
    fn timestamps_render_minutes_and_seconds() {
        assert_eq!(format_timestamp(75.9), "01:15");
        assert_eq!(format_timestamp(0.0), "00:00");
    }
}
