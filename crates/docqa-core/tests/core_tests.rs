use std::fs;
use std::io::Write;
use tempfile::TempDir;

use docqa_core::config::{ChunkingSettings, Config};
use docqa_core::traits::DocumentLoader;
use docqa_core::types::{ChunkMetadata, Document, RetrievalResult};
use docqa_core::{Chunker, TextLoader};
use figment::providers::{Format, Toml};
use figment::Figment;

fn doc(content: &str) -> Document {
    Document {
        path: "/corpus/guide.md".to_string(),
        filename: "guide.md".to_string(),
        doc_type: ".md".to_string(),
        content: content.to_string(),
    }
}

fn paragraph(topic: &str, sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("The {topic} section explains detail number {i} in plain words."))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn small_paragraphs_are_packed_together() {
    let text = format!("{}\n\n{}", paragraph("alpha", 2), paragraph("beta", 2));
    let chunks = Chunker::default().split_document(&doc(&text));

    assert_eq!(chunks.len(), 1, "two short paragraphs fit in one chunk");
    assert!(chunks[0].content.contains("alpha"));
    assert!(chunks[0].content.contains("beta"));
    assert_eq!(chunks[0].metadata.source, "guide.md");
    assert_eq!(chunks[0].metadata.source_path, "/corpus/guide.md");
    assert_eq!(chunks[0].metadata.document_type, ".md");
    assert_eq!(chunks[0].metadata.chunk_index, 0);
    assert_eq!(chunks[0].metadata.chunk_size, chunks[0].content.chars().count());
}

#[test]
fn chunks_respect_size_bound_and_minimum() {
    let paragraphs: Vec<String> = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"]
        .iter()
        .map(|t| paragraph(t, 4))
        .collect();
    let settings = ChunkingSettings { chunk_size: 300, ..ChunkingSettings::default() };
    let chunker = Chunker::new(settings.clone());
    let chunks = chunker.split_document(&doc(&paragraphs.join("\n\n")));

    assert!(chunks.len() > 1);
    for (i, c) in chunks.iter().enumerate() {
        let len = c.content.trim().chars().count();
        assert!(len > settings.min_chunk_len, "chunk {i} is a fragment");
        assert!(len <= settings.chunk_size, "chunk {i} exceeds the bound ({len})");
        assert_eq!(c.metadata.chunk_index, i);
    }
}

#[test]
fn short_paragraphs_stay_intact_in_exactly_one_chunk() {
    let paragraphs: Vec<String> = (0..8).map(|i| paragraph(&format!("topic{i}"), 3)).collect();
    let settings = ChunkingSettings { chunk_size: 400, ..ChunkingSettings::default() };
    let chunks = Chunker::new(settings).split_document(&doc(&paragraphs.join("\n\n")));

    for p in &paragraphs {
        let holders = chunks.iter().filter(|c| c.content.contains(p.as_str())).count();
        assert_eq!(holders, 1, "paragraph should appear intact once: {p}");
    }
}

#[test]
fn oversized_paragraph_splits_on_sentences() {
    let long = paragraph("omega", 20);
    let settings = ChunkingSettings { chunk_size: 200, ..ChunkingSettings::default() };
    let chunks = Chunker::new(settings).split_document(&doc(&long));

    assert!(chunks.len() > 1);
    for c in &chunks {
        assert!(c.content.ends_with('.'), "chunk ends mid-sentence: {}", c.content);
        assert!(c.content.starts_with("The omega"), "chunk starts mid-sentence: {}", c.content);
    }
}

#[test]
fn fragments_and_duplicates_are_dropped() {
    let repeated = paragraph("repeat", 3);
    let settings = ChunkingSettings { chunk_size: 185, ..ChunkingSettings::default() };
    let text = format!("{repeated}\n\nTiny bit.\n\n{}", repeated.to_uppercase());
    let chunks = Chunker::new(settings).split_document(&doc(&text));

    assert_eq!(chunks.len(), 1, "case-folded duplicate and fragment removed");
    assert_eq!(chunks[0].content, repeated);
}

#[test]
fn empty_document_yields_no_chunks() {
    assert!(Chunker::default().split_document(&doc("")).is_empty());
    assert!(Chunker::default().split(&[]).is_empty());
}

#[test]
fn loader_reads_supported_files_in_order() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("nested")).unwrap();
    let mut f = fs::File::create(dir.join("b.txt")).unwrap();
    writeln!(f, "Second   file body\u{feff} text").unwrap();
    fs::write(dir.join("nested/a.MD"), "First file line one\nPage 2 of 9\nline two").unwrap();
    fs::write(dir.join("ignored.csv"), "x,y").unwrap();
    fs::write(dir.join("blank.txt"), "  \n\n ").unwrap();

    let report = TextLoader::new(dir).load_all().expect("load");

    assert!(report.failures.is_empty());
    assert_eq!(report.documents.len(), 2);
    assert_eq!(report.documents[0].filename, "b.txt");
    assert_eq!(report.documents[0].content, "Second file body text");
    assert_eq!(report.documents[1].doc_type, ".md");
    assert_eq!(report.documents[1].content, "First file line one\n\nline two");
}

#[test]
fn loader_on_missing_directory_is_empty() {
    let tmp = TempDir::new().unwrap();
    let report = TextLoader::new(tmp.path().join("absent")).load_all().expect("load");
    assert!(report.documents.is_empty());
}

#[test]
fn save_document_rejects_traversal() {
    let tmp = TempDir::new().unwrap();
    let loader = TextLoader::new(tmp.path().join("docs"));

    let saved = loader.save_document("notes.txt", "hello").expect("save");
    assert_eq!(fs::read_to_string(saved).unwrap(), "hello");
    assert!(loader.save_document("../escape.txt", "x").is_err());
    assert!(loader.save_document("", "x").is_err());
    assert!(loader.save_document("image.png", "x").is_err());
}

#[test]
fn config_defaults_and_overrides() {
    let config = Config::from_figment(Figment::new().merge(Toml::string(
        "[chunking]\nchunk_size = 500\n[retrieval]\nmax_top_k = 5\n",
    )));
    let settings = config.settings().expect("settings");

    assert_eq!(settings.chunking.chunk_size, 500);
    assert_eq!(settings.chunking.min_chunk_len, 50);
    assert_eq!(settings.retrieval.max_top_k, 5);
    assert_eq!(settings.retrieval.default_top_k, 3);
    assert_eq!(settings.prompt.context_budget, 2000);
    assert_eq!(config.get::<usize>("chunking.chunk_size").unwrap(), 500);
    settings.validate().expect("valid");
}

#[test]
fn invalid_settings_are_rejected() {
    let config = Config::from_figment(Figment::new().merge(Toml::string(
        "[chunking]\nchunk_size = 40\nmin_chunk_len = 50\n",
    )));
    assert!(config.settings().unwrap().validate().is_err());
}

#[test]
fn nan_distance_is_never_a_match() {
    let meta = ChunkMetadata {
        source: "guide.md".into(),
        source_path: "/corpus/guide.md".into(),
        document_type: ".md".into(),
        chunk_index: 0,
        chunk_size: 4,
    };
    let hit = RetrievalResult::new("text".into(), meta.clone(), f32::NAN);
    assert_eq!(hit.distance, f32::INFINITY);
    assert_eq!(hit.similarity, 0.0);

    let near = RetrievalResult::new("text".into(), meta, 1.0);
    assert_eq!(near.similarity, 0.5);
}
