use std::path::PathBuf;

use docqa_core::traits::Embedder;
use docqa_embed::BgeEmbedder;

fn main() -> anyhow::Result<()> {
    let dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("models/bge-m3"));
    let embedder = BgeEmbedder::new(&dir)?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_many(&texts)?;
    println!("B={} dim={}", embs.len(), embedder.dim());
    Ok(())
}
