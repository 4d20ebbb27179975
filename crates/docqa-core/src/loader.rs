//! Filesystem loader for plain-text corpora (`.txt`, `.md`).

use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::traits::DocumentLoader;
use crate::types::{Document, LoadFailure, LoadReport};

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

pub struct TextLoader {
    root: PathBuf,
}

impl TextLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write `content` as `filename` inside the documents directory.
    pub fn save_document(&self, filename: &str, content: &str) -> Result<PathBuf> {
        let name = Path::new(filename);
        let plain = name.components().count() == 1 && matches!(name.components().next(), Some(Component::Normal(_)));
        if filename.trim().is_empty() || !plain {
            return Err(Error::InvalidConfig(format!("refusing to save document under name '{filename}'")));
        }
        if !is_supported(name) {
            return Err(Error::InvalidConfig(format!("unsupported document type: {filename}")));
        }
        fs::create_dir_all(&self.root)
            .map_err(|e| Error::persistence(format!("creating {}", self.root.display()), e))?;
        let path = self.root.join(name);
        fs::write(&path, content).map_err(|e| Error::persistence(format!("writing {}", path.display()), e))?;
        info!("Saved document: {}", path.display());
        Ok(path)
    }

    fn list_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_supported(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }

    fn read_file_content(path: &Path) -> std::io::Result<String> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned())
            }
            Err(e) => Err(e),
        }
    }
}

impl DocumentLoader for TextLoader {
    fn load_all(&self) -> anyhow::Result<LoadReport> {
        let mut report = LoadReport::default();
        if !self.root.is_dir() {
            warn!("Documents directory {} does not exist", self.root.display());
            return Ok(report);
        }
        for path in self.list_files() {
            match Self::read_file_content(&path) {
                Ok(raw) => {
                    let content = clean_extracted_text(&raw);
                    if content.is_empty() {
                        warn!("Skipping empty document {}", path.display());
                        continue;
                    }
                    let filename = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                    let doc_type = path
                        .extension()
                        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                        .unwrap_or_default();
                    info!("Loaded document: {filename}");
                    report.documents.push(Document {
                        path: path.to_string_lossy().into_owned(),
                        filename,
                        doc_type,
                        content,
                    });
                }
                Err(e) => {
                    warn!("Error loading {}: {e}", path.display());
                    report.failures.push(LoadFailure { path, reason: e.to_string() });
                }
            }
        }
        Ok(report)
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
}

/// Strip extraction artifacts and turn every meaningful line into its own
/// paragraph.
pub fn clean_extracted_text(raw: &str) -> String {
    let normalized: String = raw
        .chars()
        .filter_map(|c| match c {
            '\u{c}' => Some('\n'),
            '\u{feff}' => None,
            '\n' | '\t' => Some(c),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    normalized
        .lines()
        .map(str::trim)
        .filter(|line| !is_noise_line(line))
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn is_noise_line(line: &str) -> bool {
    if line.is_empty() {
        return true;
    }
    if line.chars().count() <= 2 && line.chars().all(char::is_alphabetic) {
        return true;
    }
    // page headers/footers such as "Page 3 of 10"
    line.split_whitespace().count() <= 4 && line.to_lowercase().contains("page")
}
