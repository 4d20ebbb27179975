use crate::types::LoadReport;

/// Produces the cleaned documents the index is built from.
pub trait DocumentLoader: Send + Sync {
    fn load_all(&self) -> anyhow::Result<LoadReport>;
    /// Human-readable location of the corpus (for statistics).
    fn location(&self) -> String;
}

/// Maps text to a fixed-dimension vector. `dim()` never changes for the
/// lifetime of the embedder.
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>>;
    fn embed_many(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    pub max_length: usize,
    /// When set the backend must not sample.
    pub deterministic: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { max_length: 256, deterministic: true }
    }
}

/// Text-to-text model invocation.
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;
    fn generate(&self, prompt: &str, params: &GenerationParams) -> anyhow::Result<String>;
}
