//! Build and query orchestration.

pub mod builder;
pub mod service;

pub use builder::{IndexBuilder, IndexStats};
pub use service::{QueryService, SearchHit};

use crate::ingest::Chunk;

/// Retrieved chunk texts in retrieval order, separated by blank lines.
///
/// This is the context handed to an answer-generation model.
pub fn answer_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_joins_in_order() {
        let chunks: Vec<Chunk> = ["first", "second"]
            .iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                filename: "f".into(),
                text: text.to_string(),
                sequence_index: i,
                char_offset: 0,
            })
            .collect();
        assert_eq!(answer_context(&chunks), "first\n\nsecond");
        assert_eq!(answer_context(&[]), "");
    }
}
