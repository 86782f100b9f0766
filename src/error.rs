use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebsiteChatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WalkDir error: {0}")]
    WalkDir(#[from] walkdir::Error),
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Mismatched batch: {ids} ids, {texts} texts, {metadatas} metadatas")]
    MismatchedBatch {
        ids: usize,
        texts: usize,
        metadatas: usize,
    },
    #[error("Browser is not installed: {0}")]
    MissingBrowser(String),
    #[error("Crawl error: {0}")]
    Crawl(String),
    #[error("Language model error: {0}")]
    LanguageModel(String),
}

pub type Result<T> = std::result::Result<T, WebsiteChatError>;
