// Retrieval-augmented question answering
// Retrieves context from the index, prompts the language model, records the exchange

mod prompt;

#[cfg(test)]
mod tests;

use tracing::{debug, info, info_span, warn};

use crate::chunking::Chunk;
use crate::config::RetrievalConfig;
use crate::index::{SearchResult, VectorIndex};
use crate::memory::ConversationMemory;
use crate::providers::{Embedder, LanguageModel};
use crate::{RagError, Result};

/// Reply given when the documents do not contain an answer
pub const FALLBACK_ANSWER: &str = "I could not find the answer in the provided context.";

/// Number of leading chunks shown to the model when writing the intro message
pub const INTRO_CHUNK_COUNT: usize = 5;

pub struct RagChain {
    index: VectorIndex,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn LanguageModel>,
    settings: RetrievalConfig,
}

impl RagChain {
    #[inline]
    pub fn new(
        index: VectorIndex,
        embedder: Box<dyn Embedder>,
        llm: Box<dyn LanguageModel>,
        settings: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            llm,
            settings,
        }
    }

    #[inline]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[inline]
    pub fn language_model(&self) -> &dyn LanguageModel {
        self.llm.as_ref()
    }

    /// Chunks relevant to `question`, best first, above the configured score floor
    #[inline]
    pub fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let results = self
            .index
            .search(self.embedder.as_ref(), question, self.settings.k)?;
        let retrieved = results.len();

        let relevant: Vec<SearchResult> = results
            .into_iter()
            .filter(|result| result.score > self.settings.min_score)
            .collect();

        debug!(
            "Retrieved {} chunks, {} above minimum score {}",
            retrieved,
            relevant.len(),
            self.settings.min_score
        );
        Ok(relevant)
    }

    /// Answer `question` from the indexed documents and record the exchange in `memory`
    ///
    /// `memory` is left untouched when retrieval or generation fails.
    #[inline]
    pub fn answer(&self, question: &str, memory: &mut ConversationMemory) -> Result<String> {
        let span = info_span!("answer", session = %memory.session_id());
        let _guard = span.enter();

        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::Validation("Please enter a question.".to_string()));
        }

        let context = self.retrieve(question)?;
        let answer = if context.is_empty() {
            info!("No relevant context found, returning fallback answer");
            FALLBACK_ANSWER.to_string()
        } else {
            let prompt = prompt::compose_prompt(&memory.format_history(), &context, question);
            let reply = self.llm.generate(&prompt)?;
            if reply.trim().is_empty() {
                return Err(RagError::Generation(
                    "language model returned an empty answer".to_string(),
                ));
            }
            normalize_answer(&reply)
        };

        memory.record_exchange(question, &answer);
        info!("Answered question with {} context chunks", context.len());
        Ok(answer)
    }
}

/// Ask the model for a one-line invitation based on the first few chunks
#[inline]
pub fn introduce(llm: &dyn LanguageModel, chunks: &[Chunk]) -> Result<String> {
    let sample = chunks.get(..INTRO_CHUNK_COUNT).unwrap_or(chunks);
    if sample.is_empty() {
        return Err(RagError::Validation(
            "No document content to introduce".to_string(),
        ));
    }

    let reply = llm.generate(&prompt::intro_prompt(sample))?;
    let line = strip_decoration(&reply);
    if line.is_empty() {
        warn!("Language model returned an empty intro message");
        return Err(RagError::Generation(
            "language model returned an empty intro message".to_string(),
        ));
    }
    Ok(line.to_string())
}

/// Map decorated renderings of the fallback answer to the exact fallback text
#[inline]
pub fn normalize_answer(reply: &str) -> String {
    let trimmed = reply.trim();
    let bare = strip_decoration(trimmed);

    if bare
        .trim_end_matches('.')
        .eq_ignore_ascii_case(FALLBACK_ANSWER.trim_end_matches('.'))
    {
        FALLBACK_ANSWER.to_string()
    } else {
        trimmed.to_string()
    }
}

fn strip_decoration(text: &str) -> &str {
    text.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '*' | '_' | '`' | '\u{201c}' | '\u{201d}'))
        .trim()
}
