//! Fixed-size text chunking with overlap.
//!
//! Documents and transcripts are split into overlapping character windows so each
//! window can be embedded and retrieved on its own.

use crate::config::ChunkingSettings;
use crate::error::{MosaicError, Result};
use serde::{Deserialize, Serialize};

/// Window geometry for [`chunk_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Window length in characters.
    pub size: usize,
    /// Characters shared by consecutive windows.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 200,
        }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            size: settings.size,
            overlap: settings.overlap,
        }
    }
}

impl ChunkingConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        let config = Self { size, overlap };
        config.validate()?;
        Ok(config)
    }

    /// Reject geometries where the window start would never advance.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(MosaicError::InvalidInput(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.size {
            return Err(MosaicError::InvalidInput(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.size
            )));
        }
        Ok(())
    }

    /// Distance between consecutive window starts.
    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

/// Split `text` into windows starting at `0, stride, 2*stride, ...`.
///
/// Lengths are counted in `char`s, so a window never splits a code point. Each
/// window covers `[start, start + size)` clipped to the text; the loop stops once
/// `start` reaches the end. Empty text produces no chunks.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    config.validate()?;

    // Byte offset of every char boundary, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let mut chunks = Vec::with_capacity(char_len / config.stride() + 1);
    let mut start = 0;
    while start < char_len {
        let end = start.saturating_add(config.size).min(char_len);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        start = start.saturating_add(config.stride());
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Undo the overlap: first chunk whole, then each later chunk minus its shared prefix.
    fn reassemble(chunks: &[String], config: &ChunkingConfig) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                let consumed = out.chars().count();
                let start = i * config.stride();
                let skip = consumed.saturating_sub(start);
                out.extend(chunk.chars().skip(skip));
            }
        }
        out
    }

    #[test]
    fn test_notes_txt_scenario() {
        let text: String = (0..2500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let config = ChunkingConfig::default();

        let chunks = chunk_text(&text, &config).unwrap();

        assert_eq!(chunks.len(), 4);
        let starts: Vec<usize> = (0..chunks.len()).map(|i| i * config.stride()).collect();
        assert_eq!(starts, vec![0, 800, 1600, 2400]);
        for (chunk, start) in chunks.iter().zip(&starts) {
            let expected: String = text.chars().skip(*start).take(1000).collect();
            assert_eq!(chunk, &expected);
        }
        assert_eq!(chunks[3].chars().count(), 100);
    }

    #[test]
    fn test_chunks_bounded_and_reconstruct_text() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(37);
        for (size, overlap) in [(10, 0), (10, 9), (64, 16), (1000, 200), (5000, 10)] {
            let config = ChunkingConfig::new(size, overlap).unwrap();
            let chunks = chunk_text(&text, &config).unwrap();

            assert!(chunks.iter().all(|c| c.chars().count() <= size));
            assert_eq!(reassemble(&chunks, &config), text, "size={size} overlap={overlap}");
        }
    }

    #[test]
    fn test_multibyte_text_never_split_mid_char() {
        let text = "日本語のテキストと emoji 🎉 が混在しています。".repeat(20);
        let config = ChunkingConfig::new(7, 3).unwrap();

        let chunks = chunk_text(&text, &config).unwrap();

        assert!(chunks.iter().all(|c| c.chars().count() <= 7));
        assert_eq!(reassemble(&chunks, &config), text);
    }

    #[test]
    fn test_overlap_not_smaller_than_size_fails_fast() {
        assert!(ChunkingConfig::new(100, 100).is_err());
        assert!(ChunkingConfig::new(100, 250).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());

        let bad = ChunkingConfig { size: 10, overlap: 10 };
        assert!(matches!(
            chunk_text("anything", &bad),
            Err(MosaicError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_huge_window_is_one_chunk() {
        let config = ChunkingConfig {
            size: usize::MAX,
            overlap: 1,
        };
        assert_eq!(chunk_text("hello world", &config).unwrap(), vec!["hello world"]);
    }

    #[test]
    fn test_empty_and_short_text() {
        let config = ChunkingConfig::default();
        assert!(chunk_text("", &config).unwrap().is_empty());
        assert_eq!(chunk_text("short", &config).unwrap(), vec!["short".to_string()]);
    }
}
