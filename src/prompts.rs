pub const NON_RESPONSE: &str = "Sorry, I don't know how to help with that. My knowledge is limited to the information present in the urls.";

pub const ASSISTANT_INSTRUCTIONS: &str = "You are a very enthusiastic representative who loves to help people!
Given the following sections from the documentation, answer the question using only that
information, outputted in markdown format.

Please follow these guidelines:

Be kind.
Include emojis where it makes sense.
Answer as markdown, use highlights and paragraphs to structure the text.
Do not mention that you are \"enthusiastic\", the user does not need to know, will feel it from the style of your answers.
Only use information that is available in the context, do not make up any information that is not in the context.";

pub const CONTEXTUALIZE_QUERY_INSTRUCTIONS: &str = "Given a chat history and the latest user question which might reference context \
in the chat history, formulate a standalone question which can be understood \
without the chat history. Do NOT answer the question, just reformulate it \
if needed and otherwise return it as is.";

/// Full prompt for answering `query` from `context`.
pub fn answer_prompt(context: &str, query: &str) -> String {
    format!(
        "{instructions}\nIf you are unsure and the answer is not explicitly written in the documentation, \
say '{non_response}' and ask a follow up question to help the user to specify their question.\n\n\
Context from documents:\n{context}\n\nHuman: {query}\n\nAssistant:",
        instructions = ASSISTANT_INSTRUCTIONS,
        non_response = NON_RESPONSE,
        context = context,
        query = query,
    )
}

/// Prompt asking the model to rewrite a follow-up into a standalone question.
pub fn contextualize_prompt(query: &str) -> String {
    format!(
        "{} <question> {}</question>",
        CONTEXTUALIZE_QUERY_INSTRUCTIONS, query
    )
}
