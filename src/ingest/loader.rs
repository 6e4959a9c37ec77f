//! Loads pre-extracted document text from a folder.
//!
//! Each indexable file holds one document. Pages are separated by form feed
//! (`\x0c`), the page break emitted by common PDF text extractors.

use crate::ingest::Document;
use std::path::{Path, PathBuf};

const PAGE_SEPARATOR: char = '\x0c';

/// Discovers documents in a single folder (not recursive).
pub struct DocumentLoader {
    folder: PathBuf,
}

impl DocumentLoader {
    pub fn new(folder: PathBuf) -> Self {
        Self { folder }
    }

    /// Read every indexable file, sorted by name so builds are reproducible.
    ///
    /// Unreadable entries and files are logged and skipped.
    pub fn load_documents(&self) -> std::io::Result<Vec<Document>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.folder)?
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(error) => {
                    tracing::warn!(
                        folder = %self.folder.display(),
                        %error,
                        "skipping unreadable directory entry"
                    );
                    None
                }
            })
            .filter(|path| path.is_file() && Self::is_indexable(path))
            .collect();
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(document) = Self::process_file(&path) {
                documents.push(document);
            }
        }

        tracing::info!(
            folder = %self.folder.display(),
            count = documents.len(),
            "loaded documents"
        );
        Ok(documents)
    }

    fn is_indexable(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("txt" | "md")
        )
    }

    fn process_file(path: &Path) -> Option<Document> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "failed to read document, skipping");
                return None;
            }
        };
        let filename = path.file_name()?.to_str()?.to_string();
        let pages: Vec<String> = content
            .split(PAGE_SEPARATOR)
            .map(str::to_string)
            .collect();

        tracing::debug!(%filename, pages = pages.len(), chars = content.chars().count(), "read document");
        Some(Document::new(filename, pages))
    }
}
