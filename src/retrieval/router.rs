use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::{ExtractedItem, ItemType};

/// Classification of a user question: direct structured lookup vs. retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Structured,
    OpenEnded,
}

/// Result of query routing. Transient, produced per query.
#[derive(Debug, Clone, Serialize)]
pub struct RoutedQuery {
    pub query_type: QueryType,
    /// `None` on a structured query means "all item types".
    pub item_type: Option<ItemType>,
    pub original_question: String,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
        .collect()
}

static ACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\baction\s*items?\b",
        r"\btasks?\b",
        r"\bto[\s-]?dos?\b",
        r"\bassigned\b",
        r"\bfollow[\s-]?ups?\b",
        r"\bdeadlines?\b",
    ])
});

static DECISION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\bdecisions?\b",
        r"\bdecide[ds]?\b",
        r"\bagreed\b",
        r"\bagreements?\b",
        r"\bresolved\b",
        r"\bconclusions?\b",
    ])
});

static TOPIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\btopics?\b",
        r"\bthemes?\b",
        r"\bsubjects?\b",
        r"\bagenda\b",
        r"\bdiscussed\b",
        r"\bkey\s*points?\b",
    ])
});

// Generic structured-intent phrases; only meaningful combined with a family
// match.
static GENERAL_STRUCTURED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\blist\s+(all\s+)?(the\s+)?",
        r"\bwhat\s+(were|are)\s+(the\s+)?(main|key)\b",
        r"\bsummarize\s+(the\s+)?",
    ])
});

fn any_match(patterns: &[Regex], question: &str) -> bool {
    patterns.iter().any(|p| p.is_match(question))
}

/// Classify a question with a fixed keyword decision table.
///
/// Rules, evaluated in order:
/// 1. exactly one family matches → structured with that item type;
/// 2. two or more families match → structured, all types;
/// 3. a generic structured-intent phrase plus any family match → structured,
///    first family in action → decision → topic priority;
/// 4. otherwise → open-ended.
///
/// Never fails: no match at all is the valid open-ended outcome.
pub fn classify_query(question: &str) -> RoutedQuery {
    // Family matches in priority order (action → decision → topic).
    let families = [
        (ItemType::ActionItem, any_match(&ACTION_PATTERNS, question)),
        (ItemType::Decision, any_match(&DECISION_PATTERNS, question)),
        (ItemType::Topic, any_match(&TOPIC_PATTERNS, question)),
    ];
    let matched: Vec<ItemType> = families
        .iter()
        .filter(|(_, hit)| *hit)
        .map(|(t, _)| *t)
        .collect();

    let structured = |item_type: Option<ItemType>| RoutedQuery {
        query_type: QueryType::Structured,
        item_type,
        original_question: question.to_string(),
    };

    match matched.as_slice() {
        [only] => return structured(Some(*only)),
        [_, _, ..] => return structured(None),
        [] => {}
    }

    if any_match(&GENERAL_STRUCTURED_PATTERNS, question) {
        if let Some(first) = matched.first() {
            return structured(Some(*first));
        }
    }

    RoutedQuery {
        query_type: QueryType::OpenEnded,
        item_type: None,
        original_question: question.to_string(),
    }
}

/// Format extracted items into a human-readable grouped answer.
///
/// Groups appear in fixed order (action items, decisions, topics); each item
/// renders as `"  {i}. {content}"` with assignee / due date / speaker
/// annotations appended only when present.
pub fn format_structured_response(items: &[ExtractedItem], item_type: Option<ItemType>) -> String {
    if items.is_empty() {
        let label = match item_type {
            Some(t) => t.plural_label(),
            None => "extracted items".to_string(),
        };
        return format!("No {label} found for this meeting.");
    }

    let mut parts: Vec<String> = Vec::new();

    for t in [ItemType::ActionItem, ItemType::Decision, ItemType::Topic] {
        let group: Vec<&ExtractedItem> = items.iter().filter(|i| i.item_type == t).collect();
        if group.is_empty() {
            continue;
        }

        parts.push(format!("**{}:**", t.heading()));
        for (i, item) in group.iter().enumerate() {
            let mut line = format!("  {}. {}", i + 1, item.content);
            if let Some(ref assignee) = item.assignee {
                line.push_str(&format!(" (assigned to {assignee})"));
            }
            if let Some(ref due) = item.due_date {
                line.push_str(&format!(" — due: {due}"));
            }
            if let Some(ref speaker) = item.speaker {
                line.push_str(&format!(" [mentioned by {speaker}]"));
            }
            parts.push(line);
        }
        parts.push(String::new());
    }

    parts.join("\n").trim().to_string()
}
