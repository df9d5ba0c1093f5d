use once_cell::sync::Lazy;
use regex::Regex;

// `**3**` is how some models emphasise a citation number
static BOLD_CITATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(\d+)\*\*").expect("bold citation pattern is valid"));

/// Prepare a streamed answer chunk for display.
///
/// Literal `\n` escape sequences become newlines and bolded citation
/// numbers become bracketed markers (`**3**` → `[3]`).
pub fn normalize_chunk(chunk: &str) -> String {
    let unescaped = chunk.replace("\\n", "\n");
    BOLD_CITATION.replace_all(&unescaped, "[$1]").into_owned()
}
