use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Word-window chunking parameters. Windows advance by `size - overlap` words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { size: 50, overlap: 20 }
    }
}

impl ChunkingConfig {
    pub fn step(&self) -> Result<usize> {
        if self.size == 0 {
            return Err(Error::InvalidConfig("chunk size must be > 0".into()));
        }
        if self.overlap >= self.size {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.size
            )));
        }
        Ok(self.size - self.overlap)
    }
}

/// Split `text` on whitespace and emit one window starting at every multiple
/// of the step that still falls inside the text. The last window may be short.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    chunk_with(text, &ChunkingConfig { size, overlap })
}

pub fn chunk_with(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    let step = config.step()?;
    let words: Vec<&str> = text.split_whitespace().collect();
    let chunks = (0..words.len())
        .step_by(step)
        .map(|start| {
            let end = (start + config.size).min(words.len());
            words[start..end].join(" ")
        })
        .collect();
    Ok(chunks)
}
