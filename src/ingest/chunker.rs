//! Fixed-size, fixed-overlap character windows over document text.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One window of document text, the unit of indexing and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source document file name.
    pub filename: String,
    pub text: String,
    /// Position in the global chunk sequence, equal to the vector row.
    pub sequence_index: usize,
    /// Window start, in characters, within the document's cleaned text.
    pub char_offset: usize,
}

/// Validated window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    /// `size` must be positive and `overlap` strictly smaller, or `start`
    /// would never advance.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidConfiguration(
                "chunk size must be greater than 0".into(),
            ));
        }
        if overlap >= size {
            return Err(Error::InvalidConfiguration(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
            )));
        }
        Ok(Self { size, overlap })
    }

    fn step(&self) -> usize {
        self.size - self.overlap
    }

    /// Split `text` into windows, numbering them from `first_sequence_index`.
    ///
    /// Offsets are in characters, so multi-byte text never splits inside a
    /// code point. The final window is truncated at the end of the text.
    pub fn chunk(&self, filename: &str, text: &str, first_sequence_index: usize) -> Vec<Chunk> {
        // Byte offset of every char boundary, plus the end of the text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(byte, _)| byte)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        let mut chunks = Vec::with_capacity(char_count.div_ceil(self.step()));
        let mut start = 0;
        while start < char_count {
            let end = (start + self.size).min(char_count);
            chunks.push(Chunk {
                filename: filename.to_string(),
                text: text[boundaries[start]..boundaries[end]].to_string(),
                sequence_index: first_sequence_index + chunks.len(),
                char_offset: start,
            });
            start += self.step();
        }
        chunks
    }
}

/// Split one document's text with the given window geometry.
pub fn chunk(filename: &str, text: &str, size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(size, overlap)?.chunk(filename, text, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_for_2500_chars() {
        let text = "a".repeat(2500);
        let chunks = chunk("doc.pdf", &text, 1000, 200).unwrap();

        let offsets: Vec<usize> = chunks.iter().map(|c| c.char_offset).collect();
        assert_eq!(offsets, vec![0, 800, 1600, 2400]);
        assert_eq!(chunks.last().unwrap().text.len(), 100);
        assert!(chunks.iter().all(|c| c.filename == "doc.pdf"));
        let sequence: Vec<usize> = chunks.iter().map(|c| c.sequence_index).collect();
        assert_eq!(sequence, vec![0, 1, 2, 3]);
    }

    #[test]
    fn windows_cover_text_and_overlap_exactly() {
        let text: String = (0..997).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chars: Vec<char> = text.chars().collect();

        for (size, overlap) in [(100, 0), (100, 10), (64, 63), (1, 0), (2000, 5)] {
            let chunks = chunk("f", &text, size, overlap).unwrap();
            let mut covered = vec![false; chars.len()];
            for chunk in &chunks {
                let len = chunk.text.chars().count();
                for flag in &mut covered[chunk.char_offset..chunk.char_offset + len] {
                    *flag = true;
                }
            }
            assert!(covered.iter().all(|c| *c), "gap for size={size} overlap={overlap}");

            for pair in chunks.windows(2) {
                let first: Vec<char> = pair[0].text.chars().collect();
                let second: Vec<char> = pair[1].text.chars().collect();
                assert_eq!(first.len(), size);
                let shared = overlap.min(second.len());
                assert_eq!(
                    first[first.len() - overlap..first.len() - overlap + shared],
                    second[..shared]
                );
            }
        }
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "привет мир ".repeat(20);
        let chunks = chunk("ru.pdf", &text, 30, 5).unwrap();
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 30));
        assert_eq!(chunks[0].text.chars().count(), 30);
        assert_eq!(chunks[1].char_offset, 25);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk("empty", "", 10, 2).unwrap().is_empty());
    }

    #[test]
    fn short_text_yields_single_truncated_chunk() {
        let chunks = chunk("short", "hello", 1000, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello");
    }

    #[test]
    fn sequence_continues_from_offset() {
        let chunker = Chunker::new(4, 0).unwrap();
        let chunks = chunker.chunk("f", "abcdefgh", 10);
        assert_eq!(chunks[0].sequence_index, 10);
        assert_eq!(chunks[1].sequence_index, 11);
    }

    #[test]
    fn degenerate_geometry_is_rejected() {
        assert!(matches!(
            Chunker::new(0, 0),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Chunker::new(100, 100),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Chunker::new(100, 150),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
