//! Post-processing of generated answers and the extractive fallbacks used
//! when generation fails or produces nothing useful.

use std::collections::HashSet;

use docqa_core::text::{char_len, char_prefix, fingerprint, truncate_at_sentence};

/// Checked longest first so "the answer is:" wins over "answer is:".
const BOILERPLATE_PREFIXES: &[&str] =
    &["the answer is:", "according to", "answer is:", "response:", "based on", "answer:"];

const SENTENCE_FINGERPRINT_CHARS: usize = 50;
const PHRASE_WORDS: usize = 3;
const PHRASE_CHECK_MIN_WORDS: usize = 50;
const MIN_ANSWER_CHARS: usize = 10;
const EXCERPT_CHARS: usize = 300;
const EXCERPT_TRIGGER_CHARS: usize = 200;
const FALLBACK_SENTENCES: usize = 3;
const FALLBACK_MIN_CHARS: usize = 50;

pub const NO_RESPONSE_ANSWER: &str =
    "I found relevant documents but could not generate a response. Please try rephrasing your question.";

#[derive(Debug, Clone)]
pub struct AnswerSanitizer {
    max_len: usize,
}

impl Default for AnswerSanitizer {
    fn default() -> Self {
        Self { max_len: 500 }
    }
}

impl AnswerSanitizer {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// Clean `raw` and, if what is left is degenerate, answer with an excerpt
    /// of `first_chunk` instead.
    pub fn sanitize(&self, raw: &str, first_chunk: Option<&str>) -> String {
        let cleaned = self.clean(raw);
        match first_chunk {
            Some(chunk) if is_degenerate(&cleaned) => degenerate_excerpt(chunk),
            _ => cleaned,
        }
    }

    pub fn clean(&self, raw: &str) -> String {
        let answer = strip_boilerplate(raw.trim());
        let answer = dedupe_sentences(answer);
        let answer = collapse_whitespace(&collapse_repeated_phrases(&collapse_whitespace(&answer)));
        truncate_at_sentence(&answer, self.max_len).trim().to_string()
    }
}

pub fn is_degenerate(answer: &str) -> bool {
    let trimmed = answer.trim();
    char_len(trimmed) < MIN_ANSWER_CHARS || trimmed.to_lowercase().starts_with("question:")
}

/// Replacement for a degenerate answer: the chunk itself, or its first 300
/// characters when it is long.
pub fn degenerate_excerpt(chunk: &str) -> String {
    if char_len(chunk) > EXCERPT_TRIGGER_CHARS {
        format!("{}...", char_prefix(chunk, EXCERPT_CHARS))
    } else {
        chunk.to_string()
    }
}

/// Answer used when the generator fails: the chunk's first three sentences,
/// or its first 300 characters when that would be too little text.
pub fn extractive_excerpt(chunk: &str) -> String {
    let chunk = chunk.trim();
    if chunk.is_empty() {
        return NO_RESPONSE_ANSWER.to_string();
    }
    let sentences: Vec<&str> = chunk.split('.').map(str::trim).filter(|s| !s.is_empty()).collect();
    let excerpt = if sentences.len() >= FALLBACK_SENTENCES {
        format!("{}.", sentences[..FALLBACK_SENTENCES].join(". "))
    } else {
        char_prefix(chunk, EXCERPT_CHARS).to_string()
    };
    if char_len(&excerpt) < FALLBACK_MIN_CHARS {
        return char_prefix(chunk, EXCERPT_CHARS).to_string();
    }
    excerpt
}

fn strip_boilerplate(answer: &str) -> &str {
    for prefix in BOILERPLATE_PREFIXES {
        let matches = answer.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            let rest = answer[prefix.len()..].trim_start();
            return rest.strip_prefix(':').unwrap_or(rest).trim();
        }
    }
    answer
}

fn dedupe_sentences(answer: &str) -> String {
    let mut seen = HashSet::new();
    let unique: Vec<&str> = answer
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(fingerprint(s, SENTENCE_FINGERPRINT_CHARS)))
        .collect();
    if unique.is_empty() {
        return answer.to_string();
    }
    let joined = unique.join(". ");
    if joined.ends_with('.') { joined } else { format!("{joined}.") }
}

/// Keep only the first occurrence of any three-word phrase that shows up
/// more than twice. Applied to long answers only.
fn collapse_repeated_phrases(answer: &str) -> String {
    let words: Vec<&str> = answer.split_whitespace().collect();
    if words.len() <= PHRASE_CHECK_MIN_WORDS {
        return answer.to_string();
    }
    let mut out = answer.to_string();
    for window in words.windows(PHRASE_WORDS) {
        let phrase = window.join(" ");
        if out.to_lowercase().matches(&phrase.to_lowercase()).count() <= 2 {
            continue;
        }
        if let Some(first) = out.find(&phrase) {
            let keep = first + phrase.len();
            let tail = out[keep..].replace(&phrase, " ");
            out = format!("{}{tail}", &out[..keep]);
        }
    }
    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
