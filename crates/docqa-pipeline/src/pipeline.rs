//! The retrieval-augmented question answering service.
//!
//! `RagPipeline` owns the index and the model collaborators. Lifecycle
//! operations (`build_index`, `rebuild`, `reset`) mutate the index and
//! surface typed errors; `query` never fails and reports its terminal state
//! through `QueryOutcome::status`.
//!
//! `query` loads a persisted index on demand when the in-memory one is
//! empty, so it takes `&mut self` like the lifecycle operations. Every call
//! needs exclusive access; share a pipeline across threads behind a `Mutex`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use docqa_core::config::{GenerationSettings, RetrievalSettings, Settings};
use docqa_core::error::{Error, Result};
use docqa_core::traits::{DocumentLoader, Embedder, GenerationParams, Generator};
use docqa_core::types::{ConversationTurn, QueryOutcome, QueryStatus, RetrievalResult};
use docqa_core::Chunker;
use docqa_vector::VectorIndex;

use crate::prompt::PromptBuilder;
use crate::sanitize::{extractive_excerpt, AnswerSanitizer};
use crate::validate::{clean_results, ContextValidator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatistics {
    pub chunk_count: usize,
    pub embedding_dim: usize,
    pub index_type: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub documents_dir: String,
    pub index_dir: String,
}

/// Early exits of the query path, one per non-success status.
#[derive(Debug)]
enum QueryFailure {
    InvalidInput,
    IndexEmpty,
    Embedding(String),
    Search(String),
    NoContext,
    InsufficientContext,
}

impl QueryFailure {
    fn status(&self) -> QueryStatus {
        match self {
            Self::InvalidInput => QueryStatus::Error,
            Self::IndexEmpty => QueryStatus::NoDocuments,
            Self::Embedding(_) => QueryStatus::EmbeddingError,
            Self::Search(_) => QueryStatus::SearchError,
            Self::NoContext => QueryStatus::NoContext,
            Self::InsufficientContext => QueryStatus::InsufficientContext,
        }
    }

    fn answer(&self) -> String {
        match self {
            Self::InvalidInput => "Please provide a valid question.".into(),
            Self::IndexEmpty => {
                "No documents are currently indexed. Please upload and index documents first.".into()
            }
            Self::Embedding(e) => format!("Error generating embedding for your question: {e}"),
            Self::Search(e) => format!("Error searching documents: {e}"),
            Self::NoContext => "I don't have any relevant documents to answer this question.".into(),
            Self::InsufficientContext => "I apologize, but I could not find relevant information in the provided \
                documents to answer this question. Please try rephrasing your question or ensure that documents \
                containing the relevant information have been uploaded."
                .into(),
        }
    }
}

pub struct RagPipeline {
    loader: Box<dyn DocumentLoader>,
    embedder: Box<dyn Embedder>,
    generator: Box<dyn Generator>,
    chunker: Chunker,
    index: VectorIndex,
    validator: ContextValidator,
    prompts: PromptBuilder,
    sanitizer: AnswerSanitizer,
    retrieval: RetrievalSettings,
    generation: GenerationSettings,
}

impl RagPipeline {
    /// Assemble the pipeline and bring the index up: load it from
    /// `data.index_dir`, or build it once from the loader. A failed build is
    /// logged and leaves an empty, still-usable pipeline.
    pub fn new(
        settings: &Settings,
        loader: Box<dyn DocumentLoader>,
        embedder: Box<dyn Embedder>,
        generator: Box<dyn Generator>,
    ) -> Self {
        let mut pipeline = Self::with_empty_index(settings, loader, embedder, generator);
        if !pipeline.index.load() {
            info!("No usable index on disk, building from {}", pipeline.loader.location());
            match pipeline.build_index() {
                Ok(true) => info!("Automatic index build succeeded"),
                Ok(false) => warn!("Automatic index build produced no chunks"),
                Err(e) => error!("Automatic index build failed: {e}"),
            }
        }
        pipeline
    }

    /// Assemble the pipeline without touching disk or the loader. For
    /// callers about to `rebuild` anyway.
    pub fn with_empty_index(
        settings: &Settings,
        loader: Box<dyn DocumentLoader>,
        embedder: Box<dyn Embedder>,
        generator: Box<dyn Generator>,
    ) -> Self {
        info!(
            "Initializing pipeline (embedder={}, generator={})",
            embedder.model_name(),
            generator.model_name()
        );
        let index = VectorIndex::new(embedder.dim(), PathBuf::from(&settings.data.index_dir));
        Self {
            loader,
            embedder,
            generator,
            chunker: Chunker::new(settings.chunking.clone()),
            index,
            validator: ContextValidator::default(),
            prompts: PromptBuilder::new(settings.prompt.clone()),
            sanitizer: AnswerSanitizer::new(settings.generation.answer_max_len),
            retrieval: settings.retrieval.clone(),
            generation: settings.generation.clone(),
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Replace the index with one built from the current corpus and persist
    /// it. `Ok(false)` means the corpus produced nothing to index.
    pub fn build_index(&mut self) -> Result<bool> {
        info!("Building vector index");
        self.index.reset();

        let report = self.loader.load_all().map_err(|e| Error::collaborator("document loading", &e))?;
        for failure in &report.failures {
            warn!("Skipped {}: {}", failure.path.display(), failure.reason);
        }
        if report.documents.is_empty() {
            warn!("No documents found in {}", self.loader.location());
            return Ok(false);
        }
        info!("Loaded {} document(s)", report.documents.len());

        let chunks = self.chunker.split(&report.documents);
        if chunks.is_empty() {
            warn!("No valid chunks created from documents");
            return Ok(false);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_many(&texts).map_err(|e| Error::collaborator("embedding", &e))?;
        self.index.add(&vectors, &chunks)?;
        self.index.save()?;

        info!(
            "Index contains {} chunks from {} document(s)",
            self.index.len(),
            report.documents.len()
        );
        Ok(true)
    }

    pub fn rebuild(&mut self) -> Result<bool> {
        self.build_index()
    }

    /// Forget the in-memory index. Files on disk stay until the next save.
    pub fn reset(&mut self) {
        self.index.reset();
    }

    pub fn query(&mut self, question: &str, top_k: usize) -> QueryOutcome {
        self.query_with_history(question, top_k, &[])
    }

    pub fn query_with_history(&mut self, question: &str, top_k: usize, history: &[ConversationTurn]) -> QueryOutcome {
        let trimmed = question.trim();
        info!("Processing query: {trimmed}");
        match self.run_query(trimmed, top_k, history) {
            Ok(outcome) => outcome,
            Err(failure) => {
                warn!("Query ended with {}", failure.status());
                let asked = if trimmed.is_empty() { question } else { trimmed };
                QueryOutcome::failed(asked, failure.answer(), failure.status())
            }
        }
    }

    pub fn batch_query<S: AsRef<str>>(&mut self, questions: &[S], top_k: usize) -> Vec<QueryOutcome> {
        questions.iter().map(|q| self.query(q.as_ref(), top_k)).collect()
    }

    pub fn get_statistics(&self) -> PipelineStatistics {
        PipelineStatistics {
            chunk_count: self.index.len(),
            embedding_dim: self.index.dimension(),
            index_type: "FlatL2".into(),
            embedding_model: self.embedder.model_name().to_string(),
            generation_model: self.generator.model_name().to_string(),
            documents_dir: self.loader.location(),
            index_dir: self.index.root().display().to_string(),
        }
    }

    fn run_query(
        &mut self,
        question: &str,
        top_k: usize,
        history: &[ConversationTurn],
    ) -> std::result::Result<QueryOutcome, QueryFailure> {
        if question.is_empty() {
            return Err(QueryFailure::InvalidInput);
        }
        let top_k = top_k.clamp(1, self.retrieval.max_top_k.max(1));

        if self.index.is_empty() {
            warn!("Index is empty, attempting to load");
            if !self.index.load() || self.index.is_empty() {
                return Err(QueryFailure::IndexEmpty);
            }
        }

        let query_vector = self.embedder.embed_one(question).map_err(|e| {
            error!("Embedding error: {e:#}");
            QueryFailure::Embedding(format!("{e:#}"))
        })?;
        let hits = self.index.search(&query_vector, top_k).map_err(|e| {
            error!("Search error: {e}");
            QueryFailure::Search(e.to_string())
        })?;
        if hits.is_empty() {
            return Err(QueryFailure::NoContext);
        }

        let retrieved = clean_results(hits, &self.retrieval, top_k);
        debug!("{} results after cleanup", retrieved.len());
        if retrieved.is_empty() || !self.validator.is_sufficient(&retrieved) {
            return Err(QueryFailure::InsufficientContext);
        }

        let answer = self.generate_answer(question, &retrieved, history);
        info!("Query processed successfully");
        Ok(QueryOutcome {
            question: question.to_string(),
            answer,
            status: QueryStatus::Success,
            retrieved_documents: retrieved,
        })
    }

    /// Generation failures never fail the query; they fall back to an excerpt
    /// of the best chunk.
    fn generate_answer(&self, question: &str, retrieved: &[RetrievalResult], history: &[ConversationTurn]) -> String {
        let prompt = self.prompts.build(question, retrieved, history);
        let first_chunk = retrieved.first().map(|r| r.content.as_str()).unwrap_or_default();
        let params = GenerationParams { max_length: self.generation.max_length, deterministic: true };

        match self.generator.generate(&prompt, &params) {
            Ok(raw) => self.sanitizer.sanitize(&raw, Some(first_chunk)),
            Err(e) => {
                warn!("Generation failed, answering with an excerpt: {e:#}");
                extractive_excerpt(first_chunk)
            }
        }
    }
}
