use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::prompts::{answer_prompt, contextualize_prompt, NON_RESPONSE};
use crate::retriever::Retriever;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Chat history handed to every `answer` call. The assistant never keeps
/// its own copy; callers record each exchange themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Appends a question and the answer given to it.
    pub fn record(&mut self, query: &str, answer: &Answer) {
        self.turns.push(Turn {
            role: Role::User,
            content: query.to_string(),
        });
        self.turns.push(Turn {
            role: Role::Assistant,
            content: answer.response.clone(),
        });
    }
}

/// Generates text from a prompt.
pub trait LanguageModel: Send + Sync {
    fn complete(&self, prompt: &str, history: &[Turn]) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub response: String,
    /// Empty when the model was not consulted.
    pub prompt: String,
    pub context: String,
    pub sources: Vec<String>,
    /// The query after rewriting it against the conversation.
    pub standalone_query: String,
}

/// Answers questions about the indexed site with a language model.
pub struct DocsAssistant {
    retriever: Retriever,
    model: Box<dyn LanguageModel>,
}

impl DocsAssistant {
    pub fn new(retriever: Retriever, model: Box<dyn LanguageModel>) -> Self {
        Self { retriever, model }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn retriever_mut(&mut self) -> &mut Retriever {
        &mut self.retriever
    }

    /// Swaps the model, e.g. when the user picks another provider mid-chat.
    pub fn set_model(&mut self, model: Box<dyn LanguageModel>) {
        self.model = model;
    }

    fn contextualize(&self, query: &str, conversation: &Conversation) -> Result<String> {
        if conversation.is_empty() {
            return Ok(query.to_string());
        }
        let rewritten = self
            .model
            .complete(&contextualize_prompt(query), conversation.turns())?;
        debug!("Rewrote {:?} as {:?}", query, rewritten);
        Ok(rewritten)
    }

    pub fn answer(&self, query: &str, conversation: &Conversation) -> Result<Answer> {
        let standalone_query = self.contextualize(query, conversation)?;
        let retrieved = self.retriever.get_context_for_query(&standalone_query)?;

        if retrieved.is_empty() {
            info!("No context for {:?}", standalone_query);
            return Ok(Answer {
                response: NON_RESPONSE.to_string(),
                prompt: String::new(),
                context: String::new(),
                sources: Vec::new(),
                standalone_query,
            });
        }

        let prompt = answer_prompt(&retrieved.context, &standalone_query);
        let response = self.model.complete(&prompt, &[])?;

        Ok(Answer {
            response,
            prompt,
            context: retrieved.context,
            sources: retrieved.sources,
            standalone_query,
        })
    }
}
