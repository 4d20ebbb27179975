//! Exact (brute-force) L2 vector index with co-located metadata, persisted
//! as two artifacts under a single root directory.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use docqa_core::error::{Error, Result};
use docqa_core::types::{Chunk, RetrievalResult};

pub mod schema;
pub mod search;

pub use schema::{IndexedChunk, DOCUMENTS_FILE, VECTORS_FILE};
use schema::{VectorArtifact, FORMAT_VERSION};

/// Invariant: `vectors.len() == documents.len() * dimension`, and
/// `documents[i].index == i`.
#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<f32>,
    documents: Vec<IndexedChunk>,
    root: PathBuf,
}

impl VectorIndex {
    pub fn new(dimension: usize, root: impl Into<PathBuf>) -> Self {
        Self { dimension, vectors: Vec::new(), documents: Vec::new(), root: root.into() }
    }

    pub fn dimension(&self) -> usize { self.dimension }
    pub fn root(&self) -> &Path { &self.root }
    pub fn len(&self) -> usize { self.documents.len() }
    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
    pub fn documents(&self) -> &[IndexedChunk] { &self.documents }

    pub fn vector(&self, i: usize) -> Option<&[f32]> {
        if i >= self.len() { return None; }
        Some(&self.vectors[i * self.dimension..(i + 1) * self.dimension])
    }

    /// Append vectors and their chunks. Nothing is mutated unless every input
    /// passes the shape, dimension and finiteness checks.
    pub fn add(&mut self, vectors: &[Vec<f32>], chunks: &[Chunk]) -> Result<()> {
        if vectors.len() != chunks.len() {
            return Err(Error::ShapeMismatch { vectors: vectors.len(), chunks: chunks.len() });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::DimensionMismatch { expected: self.dimension, actual: bad.len() });
        }
        if let Some(row) = vectors.iter().position(|v| !all_finite(v)) {
            return Err(Error::NonFiniteVector { row });
        }

        let start = self.documents.len();
        self.vectors.reserve(vectors.len() * self.dimension);
        for v in vectors {
            self.vectors.extend_from_slice(v);
        }
        self.documents.extend(chunks.iter().enumerate().map(|(i, c)| IndexedChunk {
            index: start + i,
            content: c.content.clone(),
            metadata: c.metadata.clone(),
        }));
        info!("Added {} vectors to index (total {})", vectors.len(), self.len());
        Ok(())
    }

    /// The `k` nearest chunks by squared L2 distance, ascending. An empty
    /// index yields no results.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        if self.is_empty() {
            warn!("Search on empty index");
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch { expected: self.dimension, actual: query.len() });
        }
        if !all_finite(query) {
            return Err(Error::NonFiniteVector { row: 0 });
        }
        let hits = search::exact_top_k(&self.vectors, self.dimension, query, k);
        debug!("Search returned {} of {} candidates", hits.len(), self.len());
        Ok(hits
            .into_iter()
            .map(|(row, distance)| {
                let doc = &self.documents[row];
                RetrievalResult::new(doc.content.clone(), doc.metadata.clone(), distance)
            })
            .collect())
    }

    /// Write both artifacts under `root`. Each file is written to a temporary
    /// sibling and renamed into place.
    pub fn save(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)
            .map_err(|e| Error::persistence(format!("creating {}", self.root.display()), e))?;

        let artifact = VectorArtifact {
            format_version: FORMAT_VERSION,
            dimension: self.dimension,
            count: self.len(),
            data: self.vectors.clone(),
        };
        self.write_atomic(VECTORS_FILE, |w| {
            bincode::serialize_into(w, &artifact).map_err(|e| Error::persistence("encoding vectors", e))
        })?;
        self.write_atomic(DOCUMENTS_FILE, |w| {
            serde_json::to_writer_pretty(w, &self.documents).map_err(|e| Error::persistence("encoding documents", e))
        })?;

        info!("Saved index with {} vectors to {}", self.len(), self.root.display());
        Ok(self.root.clone())
    }

    fn write_atomic<F>(&self, name: &str, encode: F) -> Result<()>
    where
        F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> Result<()>,
    {
        let target = self.root.join(name);
        let mut tmp = NamedTempFile::new_in(&self.root)
            .map_err(|e| Error::persistence(format!("creating temp file for {}", target.display()), e))?;
        {
            let mut w = BufWriter::new(&mut tmp);
            encode(&mut w)?;
            w.flush().map_err(|e| Error::persistence(format!("writing {}", target.display()), e))?;
        }
        tmp.persist(&target)
            .map_err(|e| Error::persistence(format!("renaming into {}", target.display()), e.error))?;
        Ok(())
    }

    /// Replace in-memory state with the artifacts under `root`. On any
    /// failure the current state is left untouched.
    pub fn read_from_disk(&mut self) -> Result<()> {
        let vectors_path = self.root.join(VECTORS_FILE);
        let documents_path = self.root.join(DOCUMENTS_FILE);
        for p in [&vectors_path, &documents_path] {
            if !p.is_file() {
                return Err(Error::NotFound(p.display().to_string()));
            }
        }

        let file = fs::File::open(&vectors_path)
            .map_err(|e| Error::persistence(format!("opening {}", vectors_path.display()), e))?;
        let artifact: VectorArtifact = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| Error::persistence(format!("decoding {}", vectors_path.display()), e))?;
        let file = fs::File::open(&documents_path)
            .map_err(|e| Error::persistence(format!("opening {}", documents_path.display()), e))?;
        let documents: Vec<IndexedChunk> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::persistence(format!("decoding {}", documents_path.display()), e))?;

        if artifact.format_version != FORMAT_VERSION {
            return Err(Error::InvalidConfig(format!(
                "unsupported index format version {} (expected {FORMAT_VERSION})",
                artifact.format_version
            )));
        }
        if artifact.dimension != self.dimension {
            return Err(Error::DimensionMismatch { expected: self.dimension, actual: artifact.dimension });
        }
        if artifact.count != documents.len() || artifact.data.len() != artifact.count * artifact.dimension {
            return Err(Error::ShapeMismatch { vectors: artifact.count, chunks: documents.len() });
        }
        if let Some((pos, doc)) = documents.iter().enumerate().find(|(i, d)| d.index != *i) {
            return Err(Error::InvalidConfig(format!("document at position {pos} carries index {}", doc.index)));
        }

        self.vectors = artifact.data;
        self.documents = documents;
        Ok(())
    }

    /// Load persisted state, reporting success as a boolean. Failures are
    /// logged and leave the index as it was.
    pub fn load(&mut self) -> bool {
        match self.read_from_disk() {
            Ok(()) => {
                info!("Loaded index with {} vectors from {}", self.len(), self.root.display());
                true
            }
            Err(Error::NotFound(path)) => {
                warn!("No saved index found ({path})");
                false
            }
            Err(e) => {
                error!("Failed to load index from {}: {e}", self.root.display());
                false
            }
        }
    }

    /// Drop all in-memory vectors and metadata. Persisted artifacts are kept.
    pub fn reset(&mut self) {
        self.vectors.clear();
        self.documents.clear();
        info!("Index reset");
    }
}

fn all_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::search::{exact_top_k, l2_squared};

    #[test]
    fn squared_distance() {
        assert_eq!(l2_squared(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let data = [1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let hits = exact_top_k(&data, 2, &[0.0, 0.0], 3);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(exact_top_k(&data, 2, &[0.0, 0.0], 0).is_empty());
    }

    #[test]
    fn nan_rows_sort_last_without_panicking() {
        let data: Vec<f32> = (0..200).map(|i| if i % 7 == 0 { f32::NAN } else { i as f32 }).collect();
        let hits = exact_top_k(&data, 1, &[0.0], 10);
        assert_eq!(hits.len(), 10);
        assert!(hits.iter().all(|(_, d)| d.is_finite()));
        assert_eq!(hits[0].0, 1);

        let all = exact_top_k(&data, 1, &[0.0], 200);
        assert!(all[171..].iter().all(|(_, d)| d.is_nan()));
        assert!(all[..171].iter().all(|(_, d)| d.is_finite()));
    }
}
