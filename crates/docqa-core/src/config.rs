//! Lightweight configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_CHUNKING__CHUNK_SIZE`). Every
//! setting has a default so a missing file still yields a usable tree.
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load `file`, then the environment overlay next to it, then `APP_*`.
    pub fn load_from(file: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(file));
        if let Some(suffix) = env_suffix(&env_name) {
            figment = figment.merge(Toml::file(file.with_file_name(format!("config.{suffix}.toml"))));
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let base_dir = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let config = Self { figment, base_dir };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment, base_dir: PathBuf::from(".") }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Extract the full settings tree. Relative data paths are resolved
    /// against the directory of the loaded config file.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.data.documents_dir = resolve_with_base(&self.base_dir, &settings.data.documents_dir)
            .to_string_lossy()
            .into_owned();
        settings.data.index_dir = resolve_with_base(&self.base_dir, &settings.data.index_dir)
            .to_string_lossy()
            .into_owned();
        Ok(settings)
    }
}

fn env_suffix(env_name: &str) -> Option<&'static str> {
    match env_name {
        "dev" | "development" => Some("dev"),
        "prod" | "production" => Some("prod"),
        "test" | "testing" => Some("test"),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub prompt: PromptSettings,
    pub generation: GenerationSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be positive".into()));
        }
        if c.min_chunk_len >= c.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.min_chunk_len ({}) must be below chunking.chunk_size ({})",
                c.min_chunk_len, c.chunk_size
            )));
        }
        let r = &self.retrieval;
        if r.default_top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.default_top_k must be positive".into()));
        }
        if r.max_top_k < r.default_top_k {
            return Err(Error::InvalidConfig("retrieval.max_top_k must be >= retrieval.default_top_k".into()));
        }
        if self.prompt.context_budget == 0 {
            return Err(Error::InvalidConfig("prompt.context_budget must be positive".into()));
        }
        if self.generation.answer_max_len == 0 {
            return Err(Error::InvalidConfig("generation.answer_max_len must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub documents_dir: String,
    pub index_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { documents_dir: "data/documents".into(), index_dir: "data/vector_index".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Upper bound on chunk length in characters.
    pub chunk_size: usize,
    /// Chunks whose trimmed length is not above this are dropped.
    pub min_chunk_len: usize,
    pub fingerprint_chars: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 800, min_chunk_len: 50, fingerprint_chars: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub min_result_len: usize,
    pub fingerprint_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { default_top_k: 3, max_top_k: 10, min_result_len: 20, fingerprint_chars: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub max_context_docs: usize,
    pub context_budget: usize,
    pub max_history_turns: usize,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self { max_context_docs: 3, context_budget: 2000, max_history_turns: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub max_length: usize,
    pub answer_max_len: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { max_length: 256, answer_max_len: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub use_fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: None, use_fake: false, fake_dim: 384 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self { endpoint: "http://localhost:11434".into(), model: "flan-t5".into(), timeout_secs: 120 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
