//! Retrieval core for chatting with a crawled website: chunk the saved
//! markdown pages, embed the chunks, and assemble the best matches (plus the
//! landing pages) into a prompt for a language model.

pub mod assistant;
pub mod chunker;
pub mod config;
pub mod context;
pub mod crawl;
pub mod embedding;
pub mod error;
pub mod models;
pub mod prompts;
pub mod retriever;
pub mod store;

pub use assistant::{Answer, Conversation, DocsAssistant, LanguageModel, Role, Turn};
pub use chunker::{Chunker, Segmenter, SentenceSegmenter};
pub use config::Settings;
pub use crawl::{CrawledPage, Crawler};
pub use embedding::{Embedder, FastEmbedder};
pub use error::{Result, WebsiteChatError};
pub use models::{ChunkMetadata, DocumentStats, EmbeddingRecord, RetrievedContext, SearchResult};
pub use retriever::Retriever;
pub use store::VectorStore;
