//! Domain types shared by the chunker, the vector index and the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A cleaned source document as produced by a loader.
///
/// - `path`: full path of the source file
/// - `filename`: display name used as the chunk `source`
/// - `doc_type`: lowercase extension including the dot (e.g. ".md")
/// - `content`: cleaned UTF-8 text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub content: String,
}

/// Provenance attached to every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub source_path: String,
    pub document_type: String,
    pub chunk_index: usize,
    pub chunk_size: usize,
}

/// A bounded span of document text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// One search hit. `distance` is the squared L2 distance to the query and
/// `similarity` is `1 / (1 + distance)`. A NaN distance is treated as
/// infinitely far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub similarity: f32,
    pub distance: f32,
}

impl RetrievalResult {
    pub fn new(content: String, metadata: ChunkMetadata, distance: f32) -> Self {
        let distance = if distance.is_nan() { f32::INFINITY } else { distance.max(0.0) };
        Self { content, metadata, similarity: 1.0 / (1.0 + distance), distance }
    }
}

/// Terminal state of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Success,
    Error,
    NoDocuments,
    EmbeddingError,
    SearchError,
    NoContext,
    InsufficientContext,
}

impl QueryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::NoDocuments => "no_documents",
            Self::EmbeddingError => "embedding_error",
            Self::SearchError => "search_error",
            Self::NoContext => "no_context",
            Self::InsufficientContext => "insufficient_context",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of every query. `status` is authoritative; `answer` is always
/// readable text, including on failure paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub question: String,
    pub answer: String,
    pub status: QueryStatus,
    pub retrieved_documents: Vec<RetrievalResult>,
}

impl QueryOutcome {
    pub fn failed(question: impl Into<String>, answer: impl Into<String>, status: QueryStatus) -> Self {
        Self { question: question.into(), answer: answer.into(), status, retrieved_documents: Vec::new() }
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior exchange in a conversation, rendered into the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A file the loader could not turn into a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a loader pass produced, including the files it had to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub failures: Vec<LoadFailure>,
}
