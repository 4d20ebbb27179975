//! On-disk layout of a persisted index: two co-located artifacts under the
//! index root, both required for a successful load.

use serde::{Deserialize, Serialize};

use docqa_core::types::ChunkMetadata;

/// Binary nearest-neighbor structure (bincode).
pub const VECTORS_FILE: &str = "index.bin";
/// Ordered chunk metadata (pretty JSON).
pub const DOCUMENTS_FILE: &str = "documents.json";

pub const FORMAT_VERSION: u32 = 1;

/// Row-major vector block. `data.len() == count * dimension`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorArtifact {
    pub format_version: u32,
    pub dimension: usize,
    pub count: usize,
    pub data: Vec<f32>,
}

/// A chunk as owned by the index: its slot, text and provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub index: usize,
    pub content: String,
    pub metadata: ChunkMetadata,
}
