use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, WebsiteChatError};

const BGE_QUERY_INSTRUCTION: &str = "Represent this sentence for searching relevant passages: ";

/// Turns text into vectors. Queries and documents are embedded separately
/// because retrieval models are trained with different prompts for each.
pub trait Embedder: Send + Sync {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_documents(texts)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed_query(text)
    }
}

/// Prompts a model expects in front of its inputs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelPrompts {
    pub query: Option<String>,
    pub document: Option<String>,
}

/// Maps a model name from the config file onto a fastembed model and the
/// prompts it was trained with.
pub fn resolve_model(name: &str) -> Result<(EmbeddingModel, ModelPrompts)> {
    let prompts = |query: &str, document: Option<&str>| ModelPrompts {
        query: Some(query.to_string()),
        document: document.map(String::from),
    };

    match name.to_lowercase().as_str() {
        "bge-small-en-v1.5" | "bgesmallenv15" => Ok((
            EmbeddingModel::BGESmallENV15,
            prompts(BGE_QUERY_INSTRUCTION, None),
        )),
        "bge-base-en-v1.5" | "bgebaseenv15" => Ok((
            EmbeddingModel::BGEBaseENV15,
            prompts(BGE_QUERY_INSTRUCTION, None),
        )),
        "all-minilm-l6-v2" | "allminilml6v2" => {
            Ok((EmbeddingModel::AllMiniLML6V2, ModelPrompts::default()))
        }
        "multilingual-e5-small" | "multilinguale5small" => Ok((
            EmbeddingModel::MultilingualE5Small,
            prompts("query: ", Some("passage: ")),
        )),
        "nomic-embed-text-v1.5" | "nomicembedtextv15" => Ok((
            EmbeddingModel::NomicEmbedTextV15,
            prompts("search_query: ", Some("search_document: ")),
        )),
        other => Err(WebsiteChatError::InvalidConfig(format!(
            "unknown embedding model: {}",
            other
        ))),
    }
}

fn with_prompt(prompt: Option<&str>, text: &str) -> String {
    match prompt {
        Some(prompt) => format!("{}{}", prompt, text),
        None => text.to_string(),
    }
}

pub struct FastEmbedder {
    model: TextEmbedding,
    prompts: ModelPrompts,
}

impl FastEmbedder {
    /// Loads the named model, downloading it into `cache_dir` on first use.
    pub fn new(
        model_name: &str,
        query_prefix: Option<String>,
        cache_dir: Option<PathBuf>,
        show_download_progress: bool,
    ) -> Result<Self> {
        let (model, mut prompts) = resolve_model(model_name)?;
        if query_prefix.is_some() {
            prompts.query = query_prefix;
        }

        let mut options = InitOptions::new(model).with_show_download_progress(show_download_progress);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let model = TextEmbedding::try_new(options)
            .map_err(|e| WebsiteChatError::Embedding(e.to_string()))?;
        info!("Loaded embedding model {}", model_name);

        Ok(Self { model, prompts })
    }
}

impl Embedder for FastEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let inputs: Vec<String> = texts
            .iter()
            .map(|text| with_prompt(self.prompts.document.as_deref(), text))
            .collect();

        let embeddings = self
            .model
            .embed(inputs, None)
            .map_err(|e| WebsiteChatError::Embedding(e.to_string()))?;
        debug!("Embedded {} document chunks", embeddings.len());
        Ok(embeddings)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let input = with_prompt(self.prompts.query.as_deref(), text);
        self.model
            .embed(vec![input], None)
            .map_err(|e| WebsiteChatError::Embedding(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| WebsiteChatError::Embedding("no embedding returned".to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic embedder for tests: one dimension per keyword group,
    /// each holding how many of the group's words occur in the text.
    pub struct KeywordEmbedder {
        topics: Vec<Vec<String>>,
        fail_on: Option<String>,
        pub query_calls: AtomicUsize,
        pub document_calls: AtomicUsize,
    }

    impl KeywordEmbedder {
        pub fn new(topics: &[&[&str]]) -> Self {
            Self {
                topics: topics
                    .iter()
                    .map(|words| words.iter().map(|w| w.to_string()).collect())
                    .collect(),
                fail_on: None,
                query_calls: AtomicUsize::new(0),
                document_calls: AtomicUsize::new(0),
            }
        }

        /// Fails any document batch containing `marker`.
        pub fn failing_on(mut self, marker: &str) -> Self {
            self.fail_on = Some(marker.to_string());
            self
        }

        fn vectorize(&self, text: &str) -> Vec<f32> {
            let lowered = text.to_lowercase();
            let words: Vec<&str> = lowered
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .collect();

            self.topics
                .iter()
                .map(|topic| words.iter().filter(|w| topic.iter().any(|t| t == *w)).count() as f32)
                .collect()
        }
    }

    impl Embedder for KeywordEmbedder {
        fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.document_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(marker) = &self.fail_on {
                if texts.iter().any(|t| t.contains(marker.as_str())) {
                    return Err(WebsiteChatError::Embedding(format!("refusing {}", marker)));
                }
            }
            Ok(texts.iter().map(|t| self.vectorize(t)).collect())
        }

        fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vectorize(text))
        }
    }

    /// Keyword groups shared by the retrieval tests.
    pub fn sky_water_welcome() -> KeywordEmbedder {
        KeywordEmbedder::new(&[
            &["sky", "blue", "color"],
            &["water", "wet"],
            &["welcome", "page"],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_models() {
        let (model, prompts) = resolve_model("bge-small-en-v1.5").unwrap();
        assert!(matches!(model, EmbeddingModel::BGESmallENV15));
        assert_eq!(prompts.query.as_deref(), Some(BGE_QUERY_INSTRUCTION));
        assert!(prompts.document.is_none());

        let (_, prompts) = resolve_model("Multilingual-E5-Small").unwrap();
        assert_eq!(prompts.query.as_deref(), Some("query: "));
        assert_eq!(prompts.document.as_deref(), Some("passage: "));

        let (_, prompts) = resolve_model("all-minilm-l6-v2").unwrap();
        assert_eq!(prompts, ModelPrompts::default());
    }

    #[test]
    fn test_resolve_unknown_model() {
        assert!(matches!(
            resolve_model("word2vec"),
            Err(WebsiteChatError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_with_prompt() {
        assert_eq!(with_prompt(Some("query: "), "sky"), "query: sky");
        assert_eq!(with_prompt(None, "sky"), "sky");
    }

    #[test]
    #[ignore = "Requires model download"]
    fn test_fastembed_query_and_document_modes_differ() {
        let embedder = FastEmbedder::new("bge-small-en-v1.5", None, None, false).unwrap();
        let text = "The sky is blue.";
        let document = embedder.embed_documents(&[text.to_string()]).unwrap();
        let query = embedder.embed_query(text).unwrap();

        assert_eq!(document[0].len(), 384);
        assert_eq!(query.len(), 384);
        assert_ne!(document[0], query);
    }
}
