//! Splitting answer text into plain runs and citation anchors.
//!
//! Markers look like `[3]`, `[R 3]` or `[2-4]`. A resolved marker is
//! attached to the last clause before it rather than to the whole preceding
//! paragraph: the clause starts after the nearest newline, sentence end
//! (`.`, `!` or `?` followed by whitespace) or spaced dash. Markers whose
//! numbers are unknown stay in the text verbatim.
//!
//! Concatenating [`RichChunk::raw`] over the output always reproduces the
//! input exactly.

use chatstream_types::Citation;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashMap;

/// Citation number (as written in the text) to citation id
pub type CitationNumbers = HashMap<u32, String>;

// Wider ranges are treated as a single number
const MAX_RANGE: u32 = 50;

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?:R\s*)?(\d+)(?:\s*[-–]\s*(\d+))?\]").expect("citation marker pattern is valid")
});

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("sentence end pattern is valid"));

// Heading, quote and list markers that must stay outside the anchor
static CLAUSE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:#{1,6}\s+|>\s*|(?:\d+[.)]|[-*+])\s+)").expect("clause prefix pattern is valid")
});

const DASH_SEPARATORS: [&str; 3] = [" - ", " – ", " — "];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RichChunk {
    Text {
        text: String,
    },
    /// Clause carrying one or more citations; `marker` is the bracket text
    /// that followed it in the source.
    Cited {
        text: String,
        marker: String,
        citation_ids: Vec<String>,
    },
}

impl RichChunk {
    pub fn text(text: impl Into<String>) -> Self {
        RichChunk::Text { text: text.into() }
    }

    pub fn cited(text: impl Into<String>, marker: impl Into<String>, citation_ids: Vec<String>) -> Self {
        RichChunk::Cited {
            text: text.into(),
            marker: marker.into(),
            citation_ids,
        }
    }

    /// Display text without the marker
    pub fn as_text(&self) -> &str {
        match self {
            RichChunk::Text { text } | RichChunk::Cited { text, .. } => text,
        }
    }

    /// Exactly the slice of input this chunk came from
    pub fn raw(&self) -> String {
        match self {
            RichChunk::Text { text } => text.clone(),
            RichChunk::Cited { text, marker, .. } => format!("{}{}", text, marker),
        }
    }

    pub fn is_cited(&self) -> bool {
        matches!(self, RichChunk::Cited { .. })
    }

    pub fn citation_ids(&self) -> &[String] {
        match self {
            RichChunk::Cited { citation_ids, .. } => citation_ids,
            RichChunk::Text { .. } => &[],
        }
    }
}

/// Number each citation the way answer text refers to it: by its
/// `chunk_index` when present, else by 1-based position. The first
/// citation claiming a number keeps it.
pub fn number_citations(citations: &[Citation]) -> CitationNumbers {
    let mut numbers = CitationNumbers::new();
    let identified = citations.iter().filter(|c| !c.id.is_empty());
    for (position, citation) in identified.enumerate() {
        let number = citation.chunk_index.unwrap_or(position as u32 + 1);
        numbers.entry(number).or_insert_with(|| citation.id.clone());
    }
    numbers
}

/// Split `text` into plain and cited runs
pub fn split_citations(text: &str, numbers: &CitationNumbers) -> Vec<RichChunk> {
    let mut chunks = Vec::new();
    let mut cursor = 0;

    for caps in MARKER.captures_iter(text) {
        let Some(marker) = caps.get(0) else {
            continue;
        };
        let ids = resolve_marker(&caps, numbers);
        if ids.is_empty() {
            tracing::trace!(marker = marker.as_str(), "Unresolved citation marker kept as text");
            continue;
        }

        let segment = &text[cursor..marker.start()];
        let boundary = clause_start(segment);
        if boundary > 0 {
            chunks.push(RichChunk::text(&segment[..boundary]));
        }
        push_clause(&mut chunks, &segment[boundary..], marker.as_str(), ids);
        cursor = marker.end();
    }

    if cursor < text.len() {
        chunks.push(RichChunk::text(&text[cursor..]));
    }
    chunks
}

/// Reassemble the original text
pub fn to_raw(chunks: &[RichChunk]) -> String {
    chunks.iter().map(RichChunk::raw).collect()
}

fn resolve_marker(caps: &Captures<'_>, numbers: &CitationNumbers) -> Vec<String> {
    let Some(start) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) else {
        return Vec::new();
    };
    let end = match caps.get(2) {
        Some(m) => match m.as_str().parse::<u32>() {
            Ok(end) => end,
            Err(_) => return Vec::new(),
        },
        None => start,
    };
    // Reversed or oversized ranges are left as literal text
    if end < start || end - start > MAX_RANGE {
        return Vec::new();
    }

    let mut ids: Vec<String> = Vec::new();
    for number in start..=end {
        if let Some(id) = numbers.get(&number) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
    }
    ids
}

/// Byte offset where the last clause of `segment` begins
fn clause_start(segment: &str) -> usize {
    // Punctuation right before the marker belongs to the clause itself
    let body = segment.trim_end();
    let mut start = 0;

    if let Some(i) = body.rfind('\n') {
        start = start.max(i + 1);
    }
    if let Some(m) = SENTENCE_END.find_iter(body).last() {
        start = start.max(m.start() + 1);
    }
    for dash in DASH_SEPARATORS {
        // An indented `- ` is a list bullet, not a separator
        let separator = body
            .match_indices(dash)
            .filter(|(i, _)| body[..*i].chars().last().is_some_and(|c| !c.is_whitespace()))
            .last();
        if let Some((i, _)) = separator {
            start = start.max(i + dash.len() - 1);
        }
    }
    start
}

fn push_clause(chunks: &mut Vec<RichChunk>, clause: &str, marker: &str, ids: Vec<String>) {
    let trimmed = clause.trim_start();
    let indent = clause.len() - trimmed.len();
    if indent > 0 {
        chunks.push(RichChunk::text(&clause[..indent]));
    }

    let prefix = CLAUSE_PREFIX.find(trimmed).map_or(0, |m| m.end());
    if prefix > 0 {
        chunks.push(RichChunk::text(&trimmed[..prefix]));
    }

    chunks.push(RichChunk::cited(&trimmed[prefix..], marker, ids));
}
