use anyhow::{Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use candle_core::{Device, Tensor, DType};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{XLMRobertaModel, Config as XLMRobertaConfig};
use tokenizers::Tokenizer;

use docqa_core::config::{EmbeddingSettings, expand_path};
use docqa_core::traits::Embedder;

pub mod encode;
pub mod pool;

pub use pool::masked_mean_l2;

const MAX_LEN: usize = 256;

/// BGE-M3 (XLM-RoBERTa) sentence embedder running locally on candle.
pub struct BgeEmbedder { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device, dim: usize, name: String }

impl BgeEmbedder {
    pub fn new(model_dir: &Path) -> Result<Self> {
        let device = encode::select_device();
        info!("Loading embedding model from {}", model_dir.display());
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_raw = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: XLMRobertaConfig = serde_json::from_str(&config_raw)?;
        let dim = serde_json::from_str::<serde_json::Value>(&config_raw)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;
        let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        let name = model_dir.file_name().map_or_else(|| "bge-m3".to_string(), |n| n.to_string_lossy().into_owned());
        info!("Embedding model {name} loaded (dim={dim})");
        Ok(Self { model, tokenizer, device, dim, name })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let window = encode::encode(&self.tokenizer, text, MAX_LEN)?;
        let (input_ids, attention_mask) = window.to_tensors(&self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_LEN), DType::I64, &self.device)?;
        let hidden_states = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden_states, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if emb.len() != self.dim { return Err(anyhow!("model produced {} dims, expected {}", emb.len(), self.dim)); }
        if start.elapsed().as_millis() > 100 { warn!("Slow embedding: {} ms", start.elapsed().as_millis()); }
        Ok(emb)
    }
}

impl Embedder for BgeEmbedder {
    fn model_name(&self) -> &str { &self.name }
    fn dim(&self) -> usize { self.dim }
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> { self.embed_text(text) }
    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let pb = ProgressBar::new(texts.len() as u64);
        pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")?.progress_chars("#>-"));
        let mut out = Vec::with_capacity(texts.len());
        for text in texts { out.push(self.embed_text(text)?); pb.inc(1); }
        pb.finish_and_clear();
        Ok(out)
    }
}

/// Deterministic bag-of-tokens embedder: each whitespace token lands in an
/// xxhash bucket and the vector is L2-normalized. No model files needed.
pub struct HashEmbedder { dim: usize }

impl HashEmbedder { pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } } }

impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str { "hash-embedder" }
    fn dim(&self) -> usize { self.dim }
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::Hasher; use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() { let mut hasher = XxHash64::with_seed(0); hasher.write(token.to_lowercase().as_bytes()); let h = hasher.finish(); let idx = (h as usize) % self.dim; let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32); v[idx] += val + (i as f32 % 3.0) * 0.01; }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6); for x in &mut v { *x /= norm; } Ok(v)
    }
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let env_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if settings.use_fake || env_fake { info!("Using HashEmbedder (dim={})", settings.fake_dim); return Ok(Box::new(HashEmbedder::new(settings.fake_dim))); }
    Ok(Box::new(BgeEmbedder::new(&resolve_model_dir(settings.model_dir.as_deref())?)?))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured { let p = expand_path(dir); if p.exists() { return Ok(p); } warn!("Configured model dir {} does not exist", p.display()); }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) { let p = PathBuf::from(&dir); if p.exists() { info!("Using {var}: {}", p.display()); return Ok(p); } }
    }
    let local = Path::new("models/bge-m3"); if local.exists() { return Ok(local.to_path_buf()); }
    Err(anyhow!("Could not locate BGE-M3 model directory"))
}
