use text_splitter::{ChunkConfig, TextSplitter};

use ecorec_core::error::{Error, Result};

/// One window of a splittable document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub source: String,
    pub page: i64,
    pub text: String,
}

/// Character-sized splitting that prefers paragraph, line, sentence and word
/// boundaries before cutting inside a word.
pub struct Chunker {
    splitter: TextSplitter<text_splitter::Characters>,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(overlap)
            .map_err(|e| Error::InvalidConfig(format!("invalid chunk overlap: {e}")))?;
        Ok(Self { splitter: TextSplitter::new(config) })
    }

    /// Ids are `{source}::chunk{n}`, 1-based, in document order.
    pub fn chunk(&self, source: &str, text: &str) -> Vec<Chunk> {
        self.splitter
            .chunks(text)
            .enumerate()
            .map(|(i, piece)| Chunk {
                id: format!("{source}::chunk{}", i + 1),
                source: source.to_string(),
                page: 0,
                text: piece.to_string(),
            })
            .collect()
    }
}

pub fn chunk(source: &str, text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(chunk_size, overlap)?.chunk(source, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_must_be_smaller_than_size() {
        assert!(matches!(chunk("a", "text", 100, 100), Err(Error::InvalidConfig(_))));
        assert!(matches!(chunk("a", "text", 0, 0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let out = chunk("guide.txt", "Pantai Sawarna di Lebak.", 1200, 200).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "guide.txt::chunk1");
        assert_eq!(out[0].page, 0);
        assert_eq!(out[0].text, "Pantai Sawarna di Lebak.");
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk("e.txt", "", 50, 10).unwrap().is_empty());
    }
}
