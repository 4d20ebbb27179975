//! Paragraph-first, sentence-second chunking.
//!
//! Chunk boundaries always fall on paragraph or sentence boundaries; the only
//! chunk that may exceed `chunk_size` is a single over-long sentence.

use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::ChunkingSettings;
use crate::text::{char_len, clean_text, fingerprint, split_sentences};
use crate::types::{Chunk, ChunkMetadata, Document};

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    settings: ChunkingSettings,
}

impl Chunker {
    pub fn new(settings: ChunkingSettings) -> Self {
        Self { settings }
    }

    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = documents.iter().flat_map(|d| self.split_document(d)).collect();
        info!("Split {} documents into {} chunks", documents.len(), chunks.len());
        chunks
    }

    /// Chunk one document, dropping fragments and in-document duplicates.
    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        let text = clean_text(&doc.content);
        let pieces = self.pack_paragraphs(&text);
        let raw_count = pieces.len();

        let mut seen = HashSet::new();
        let mut chunks = Vec::new();
        for piece in pieces {
            let content = piece.trim();
            let size = char_len(content);
            if size <= self.settings.min_chunk_len {
                continue;
            }
            if !seen.insert(fingerprint(content, self.settings.fingerprint_chars)) {
                continue;
            }
            chunks.push(Chunk {
                content: content.to_string(),
                metadata: ChunkMetadata {
                    source: doc.filename.clone(),
                    source_path: doc.path.clone(),
                    document_type: doc.doc_type.clone(),
                    chunk_index: chunks.len(),
                    chunk_size: size,
                },
            });
        }
        debug!("{}: {} unique chunks from {} raw chunks", doc.filename, chunks.len(), raw_count);
        chunks
    }

    fn pack_paragraphs(&self, text: &str) -> Vec<String> {
        let limit = self.settings.chunk_size;
        let mut out = Vec::new();
        let mut current = String::new();

        for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            if fits(&current, para, 2, limit) {
                if !current.is_empty() {
                    current.push_str("\n\n");
                }
                current.push_str(para);
                continue;
            }
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            if char_len(para) > limit {
                out.extend(self.pack_sentences(para));
            } else {
                current.push_str(para);
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }

    fn pack_sentences(&self, para: &str) -> Vec<String> {
        let limit = self.settings.chunk_size;
        let mut out = Vec::new();
        let mut current = String::new();

        for sentence in split_sentences(para) {
            if fits(&current, sentence, 1, limit) {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(sentence);
            } else {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                current.push_str(sentence);
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }
}

/// Whether `next` can join `current` (with a separator of `sep` chars)
/// without exceeding `limit`.
fn fits(current: &str, next: &str, sep: usize, limit: usize) -> bool {
    let joined = if current.is_empty() { char_len(next) } else { char_len(current) + sep + char_len(next) };
    joined <= limit
}
