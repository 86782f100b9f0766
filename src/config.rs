use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::chunker::DEFAULT_CHUNK_SIZE;
use crate::error::{Result, WebsiteChatError};

/// Similarity a chunk must beat to enter the context. Carried over from
/// `snowflake-arctic-embed-s`; not yet verified for `bge-small-en-v1.5`.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.60;
pub const DEFAULT_SEARCH_LIMIT: usize = 2;
pub const DEFAULT_MAX_PAGES: usize = 200;
pub const DEFAULT_EMBEDDING_MODEL: &str = "bge-small-en-v1.5";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub doc_dir: PathBuf,
    pub chunk_size: usize,
    pub similarity_threshold: f32,
    pub search_limit: usize,
    pub max_pages: usize,
    pub embedding: EmbeddingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
    /// Overrides the query instruction the model normally expects.
    pub query_prefix: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub show_download_progress: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            doc_dir: default_doc_dir(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            search_limit: DEFAULT_SEARCH_LIMIT,
            max_pages: DEFAULT_MAX_PAGES,
            embedding: EmbeddingSettings::default(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            query_prefix: None,
            cache_dir: None,
            show_download_progress: true,
        }
    }
}

fn default_doc_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("website-chat").join("docs"))
        .unwrap_or_else(|| PathBuf::from("docs"))
}

impl Settings {
    /// Reads settings from a TOML file, or returns the defaults when no file
    /// is given. Missing keys take their default values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(WebsiteChatError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.search_limit == 0 {
            return Err(WebsiteChatError::InvalidConfig(
                "search_limit must be greater than 0".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(WebsiteChatError::InvalidConfig(format!(
                "similarity_threshold must be within [-1, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(WebsiteChatError::InvalidConfig(
                "embedding.model cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.chunk_size, 200);
        assert_eq!(settings.search_limit, 2);
        assert_eq!(settings.max_pages, 200);
        assert!((settings.similarity_threshold - 0.60).abs() < f32::EPSILON);
        assert_eq!(settings.embedding.model, "bge-small-en-v1.5");
        assert!(settings.doc_dir.ends_with("docs"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
doc_dir = "/srv/site-docs"
similarity_threshold = 0.45

[embedding]
model = "all-minilm-l6-v2"
show_download_progress = false
"#,
        )?;

        let settings = Settings::load(Some(&path))?;
        assert_eq!(settings.doc_dir, PathBuf::from("/srv/site-docs"));
        assert!((settings.similarity_threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(settings.chunk_size, 200);
        assert_eq!(settings.embedding.model, "all-minilm-l6-v2");
        assert!(!settings.embedding.show_download_progress);
        assert!(settings.embedding.query_prefix.is_none());
        Ok(())
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut settings = Settings::default();
        settings.similarity_threshold = 1.5;
        assert!(matches!(settings.validate(), Err(WebsiteChatError::InvalidConfig(_))));

        let mut settings = Settings::default();
        settings.chunk_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.search_limit = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_malformed_file() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "chunk_size = \"big\"")?;

        assert!(matches!(
            Settings::load(Some(&path)),
            Err(WebsiteChatError::ConfigParse(_))
        ));
        Ok(())
    }
}
