//! Document ingestion: loading pre-extracted pages, stripping running
//! headers, and cutting the cleaned text into overlapping windows.

pub mod chunker;
pub mod header;
pub mod loader;

pub use chunker::{Chunk, Chunker, chunk};
pub use header::{HeaderCleaner, HeaderTemplate, clean_page};
pub use loader::DocumentLoader;

/// A document as handed over by the text-extraction step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub filename: String,
    /// Raw page text in page order.
    pub pages: Vec<String>,
}

impl Document {
    pub fn new(filename: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            filename: filename.into(),
            pages,
        }
    }

    /// Concatenate the pages after removing running headers from all but the first.
    pub fn cleaned_text(&self, cleaner: &HeaderCleaner) -> String {
        let mut text = String::new();
        for (page_number, page) in self.pages.iter().enumerate() {
            text.push_str(&cleaner.clean_page(page, page_number == 0));
        }
        text
    }
}
