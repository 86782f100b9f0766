use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Builds the store key for the `index`-th chunk of `source`.
pub fn chunk_id(source: &str, index: usize) -> String {
    format!("{}_chunk_{}", source, index)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk: usize,
    /// Filled in by the store when the chunk is added.
    #[serde(default)]
    pub text: String,
}

impl ChunkMetadata {
    pub fn new(source: impl Into<String>, chunk: usize) -> Self {
        Self {
            source: source.into(),
            chunk,
            text: String::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SearchResult {
    pub metadata: ChunkMetadata,
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DocumentStats {
    pub num_files: usize,
    pub num_chunks: usize,
    pub num_words: usize,
    pub num_words_per_file: Vec<usize>,
    pub built_at: Option<DateTime<Utc>>,
}

/// Context handed to the language model for one query.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    pub context: String,
    pub sources: Vec<String>,
    /// Best pre-filter score, `None` when the store had nothing to rank.
    pub max_score: Option<f32>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_format() {
        assert_eq!(chunk_id("a.md", 0), "a.md_chunk_0");
        assert_eq!(chunk_id("https:__site_docs.md", 12), "https:__site_docs.md_chunk_12");
    }

    #[test]
    fn test_metadata_without_text_deserializes() {
        let meta: ChunkMetadata =
            serde_json::from_str(r#"{"source": "a.md", "chunk": 3}"#).unwrap();
        assert_eq!(meta, ChunkMetadata::new("a.md", 3));
    }
}
