//! Post-retrieval cleanup and the "is this enough to answer from" check.

use std::collections::HashSet;

use docqa_core::config::RetrievalSettings;
use docqa_core::text::{char_len, fingerprint};
use docqa_core::types::RetrievalResult;

/// Lines this short are extraction debris (page numbers, bullets).
const MIN_LINE_CHARS: usize = 4;

/// Drop short and near-duplicate hits, normalize whitespace line by line and
/// keep at most `top_k`. Order is preserved.
pub fn clean_results(results: Vec<RetrievalResult>, settings: &RetrievalSettings, top_k: usize) -> Vec<RetrievalResult> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for mut r in results {
        let content = r.content.trim();
        if char_len(content) < settings.min_result_len {
            continue;
        }
        if !seen.insert(fingerprint(content, settings.fingerprint_chars)) {
            continue;
        }
        let lines: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| char_len(l) >= MIN_LINE_CHARS)
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect();
        if lines.is_empty() {
            continue;
        }
        r.content = lines.join("\n");
        out.push(r);
        if out.len() == top_k {
            break;
        }
    }
    out
}

/// Accepts a context when at least one chunk is substantive on its own, or
/// when the chunks together carry enough alphanumeric text.
#[derive(Debug, Clone)]
pub struct ContextValidator {
    pub min_chunk_chars: usize,
    pub min_alnum_per_chunk: usize,
    pub min_alnum_total: usize,
}

impl Default for ContextValidator {
    fn default() -> Self {
        Self { min_chunk_chars: 20, min_alnum_per_chunk: 30, min_alnum_total: 80 }
    }
}

impl ContextValidator {
    pub fn is_sufficient(&self, results: &[RetrievalResult]) -> bool {
        let mut total = 0;
        for r in results {
            let content = r.content.trim();
            if char_len(content) < self.min_chunk_chars {
                continue;
            }
            let alnum = content.chars().filter(|c| c.is_alphanumeric()).count();
            if alnum >= self.min_alnum_per_chunk {
                return true;
            }
            total += alnum;
        }
        total >= self.min_alnum_total
    }
}
