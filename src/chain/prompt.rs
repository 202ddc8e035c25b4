use itertools::Itertools;

use super::FALLBACK_ANSWER;
use crate::chunking::Chunk;
use crate::index::SearchResult;

/// Build the question-answering prompt from history, retrieved context and the question
pub(crate) fn compose_prompt(history: &str, context: &[SearchResult], question: &str) -> String {
    let history = if history.is_empty() {
        "(no previous conversation)"
    } else {
        history
    };

    let context = context
        .iter()
        .enumerate()
        .map(|(position, result)| {
            format!(
                "[{}] {}\n{}",
                position + 1,
                source_label(&result.chunk),
                result.chunk.text
            )
        })
        .join("\n\n");

    format!(
        "You are a helpful assistant holding a conversation with a user about their documents.
Answer the current question using only the context below and the previous conversation.
If the context does not contain the answer, reply with exactly: \"{FALLBACK_ANSWER}\"

Rules:
- Do not use knowledge that is not in the context.
- Keep the answer short and clear.
- Use a list when the answer has several parts.
- Do not repeat the context or the conversation back.

### Previous conversation
{history}

### Context
{context}

### Question
{question}

### Answer
"
    )
}

/// Build the prompt asking for a one-line invitation to explore the documents
pub(crate) fn intro_prompt(chunks: &[Chunk]) -> String {
    let excerpts = chunks.iter().map(|chunk| chunk.text.trim()).join("\n---\n");

    format!(
        "A user has just loaded some documents. Here are a few excerpts from them:
---
{excerpts}
---

Write one short, friendly sentence of 20 to 30 words inviting the user to ask questions about these documents.
Mention only topics that appear in the excerpts.
Reply with the sentence alone, without any preamble.
"
    )
}

fn source_label(chunk: &Chunk) -> String {
    match chunk.page {
        Some(page) => format!("(source: {}, page {page})", chunk.source.display()),
        None => format!("(source: {})", chunk.source.display()),
    }
}
