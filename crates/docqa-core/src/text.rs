//! Small text helpers shared by the chunker, the loader and the query path.
//!
//! All lengths are measured in `char`s so that slicing never lands inside a
//! multi-byte code point.

use regex::Regex;
use std::hash::Hasher;
use std::sync::OnceLock;
use twox_hash::XxHash64;

fn sentence_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("static regex"))
}

fn space_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("static regex"))
}

fn blank_line_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static regex"))
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The first `n` characters of `s`.
pub fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Near-duplicate key: xxhash of the case-folded first `n` characters.
pub fn fingerprint(s: &str, n: usize) -> u64 {
    let folded = char_prefix(s, n).to_lowercase();
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(folded.as_bytes());
    hasher.finish()
}

/// Split at sentence-final punctuation followed by whitespace. The
/// punctuation stays with its sentence; the whitespace is dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in sentence_break().find_iter(text) {
        // punctuation is a single ASCII byte
        let end = m.start() + 1;
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            out.push(sentence);
        }
        start = m.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Drop control characters (keeping newlines and tabs), collapse runs of
/// spaces and collapse three or more newlines into one blank line.
pub fn clean_text(text: &str) -> String {
    let printable: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let spaced = space_runs().replace_all(&printable, " ");
    let lined = blank_line_runs().replace_all(&spaced, "\n\n");
    lined.trim().to_string()
}

/// Cut `text` to at most `budget` characters. If the last period inside the
/// budget sits past 80% of it, cut just after that period; otherwise hard-cut
/// and append `...`. Text already within budget is returned unchanged.
pub fn truncate_at_sentence(text: &str, budget: usize) -> String {
    if char_len(text) <= budget {
        return text.to_string();
    }
    let truncated = char_prefix(text, budget);
    if let Some(byte_pos) = truncated.rfind('.') {
        let char_pos = char_len(&truncated[..byte_pos]);
        if char_pos * 5 > budget * 4 {
            return truncated[..=byte_pos].to_string();
        }
    }
    format!("{truncated}...")
}
