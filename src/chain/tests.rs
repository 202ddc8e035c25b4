use super::*;
use crate::index::IndexEntry;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

const VOCABULARY: [&str; 3] = ["rust", "borrow", "garden"];

struct VocabularyEmbedder;

impl Embedder for VocabularyEmbedder {
    fn model_name(&self) -> &str {
        "vocabulary"
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                VOCABULARY
                    .iter()
                    .map(|word| lower.matches(word).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// Replies from a script and records every prompt it receives
#[derive(Clone, Default)]
struct ScriptedModel {
    replies: Rc<RefCell<VecDeque<Result<String>>>>,
    prompts: Rc<RefCell<Vec<String>>>,
}

impl ScriptedModel {
    fn with_replies(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Rc::new(RefCell::new(replies.into())),
            prompts: Rc::default(),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok("scripted reply".to_string()))
    }
}

fn chunk(text: &str, page: Option<usize>, chunk_index: usize) -> Chunk {
    Chunk {
        text: text.to_string(),
        source: PathBuf::from("guide.pdf"),
        page,
        chunk_index,
    }
}

fn rust_index() -> VectorIndex {
    let chunks = vec![
        chunk("Rust guarantees memory safety through ownership.", Some(1), 0),
        chunk("The borrow checker enforces Rust borrow rules.", Some(2), 1),
    ];
    VectorIndex::build(chunks, &VocabularyEmbedder).expect("should build")
}

fn chain_with(model: &ScriptedModel) -> RagChain {
    RagChain::new(
        rust_index(),
        Box::new(VocabularyEmbedder),
        Box::new(model.clone()),
        RetrievalConfig::default(),
    )
}

#[test]
fn answer_uses_retrieved_context_and_records_exchange() {
    let model = ScriptedModel::with_replies(vec![Ok("Through ownership.".to_string())]);
    let chain = chain_with(&model);
    let mut memory = ConversationMemory::new();

    let answer = chain
        .answer("How does Rust stay safe?", &mut memory)
        .expect("should answer");

    assert_eq!(answer, "Through ownership.");
    assert_eq!(memory.len(), 2);
    assert_eq!(memory.history()[0].text, "How does Rust stay safe?");
    assert_eq!(memory.history()[1].text, "Through ownership.");

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Rust guarantees memory safety through ownership."));
    assert!(prompts[0].contains("(source: guide.pdf, page 1)"));
    assert!(prompts[0].contains("How does Rust stay safe?"));
    assert!(prompts[0].contains(FALLBACK_ANSWER));
}

#[test]
fn second_prompt_contains_first_exchange() {
    let model = ScriptedModel::with_replies(vec![
        Ok("Ownership rules.".to_string()),
        Ok("It checks borrows.".to_string()),
    ]);
    let chain = chain_with(&model);
    let mut memory = ConversationMemory::new();

    chain
        .answer("What makes Rust safe?", &mut memory)
        .expect("first answer");
    chain
        .answer("And the borrow checker?", &mut memory)
        .expect("second answer");

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("Ownership rules."));
    assert!(prompts[1].contains("User: What makes Rust safe?"));
    assert!(prompts[1].contains("Assistant: Ownership rules."));
}

#[test]
fn unrelated_question_returns_fallback_without_model_call() {
    let model = ScriptedModel::default();
    let chain = chain_with(&model);
    let mut memory = ConversationMemory::new();

    let answer = chain
        .answer("How often should I water the garden?", &mut memory)
        .expect("should answer");

    assert_eq!(answer, FALLBACK_ANSWER);
    assert!(model.prompts().is_empty());
    assert_eq!(memory.len(), 2);
}

#[test]
fn generation_failure_leaves_memory_unchanged() {
    let model = ScriptedModel::with_replies(vec![Err(RagError::Generation(
        "model offline".to_string(),
    ))]);
    let chain = chain_with(&model);
    let mut memory = ConversationMemory::new();
    memory.record_exchange("earlier", "reply");

    let result = chain.answer("What is Rust?", &mut memory);

    assert!(matches!(result, Err(RagError::Generation(_))));
    assert_eq!(memory.len(), 2);
    assert_eq!(memory.history()[0].text, "earlier");
}

#[test]
fn empty_model_reply_is_a_generation_error() {
    let model = ScriptedModel::with_replies(vec![Ok("   ".to_string())]);
    let chain = chain_with(&model);
    let mut memory = ConversationMemory::new();

    let result = chain.answer("What is Rust?", &mut memory);

    assert!(matches!(result, Err(RagError::Generation(_))));
    assert!(memory.is_empty());
}

#[test]
fn blank_question_is_rejected() {
    let chain = chain_with(&ScriptedModel::default());
    let mut memory = ConversationMemory::new();

    let result = chain.answer("  \n", &mut memory);
    assert!(matches!(result, Err(RagError::Validation(_))));
    assert!(memory.is_empty());
}

#[test]
fn decorated_fallback_is_normalized() {
    let model = ScriptedModel::with_replies(vec![Ok(format!("**\"{FALLBACK_ANSWER}\"**"))]);
    let chain = chain_with(&model);
    let mut memory = ConversationMemory::new();

    let answer = chain
        .answer("Who designed Rust?", &mut memory)
        .expect("should answer");
    assert_eq!(answer, FALLBACK_ANSWER);
}

#[test]
fn normalize_answer_cases() {
    assert_eq!(normalize_answer(FALLBACK_ANSWER), FALLBACK_ANSWER);
    assert_eq!(
        normalize_answer("\"I could not find the answer in the provided context\""),
        FALLBACK_ANSWER
    );
    assert_eq!(
        normalize_answer("  *I could not find the answer in the provided context.*\n"),
        FALLBACK_ANSWER
    );
    assert_eq!(normalize_answer("  Rust is safe.  "), "Rust is safe.");
    assert_eq!(normalize_answer("**Bold** answer"), "**Bold** answer");
}

#[test]
fn retrieve_respects_k_and_minimum_score() {
    let chain = RagChain::new(
        rust_index(),
        Box::new(VocabularyEmbedder),
        Box::new(ScriptedModel::default()),
        RetrievalConfig {
            k: 1,
            min_score: 0.0,
        },
    );
    let results = chain.retrieve("borrow").expect("should retrieve");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.chunk_index, 1);

    let strict = RagChain::new(
        rust_index(),
        Box::new(VocabularyEmbedder),
        Box::new(ScriptedModel::default()),
        RetrievalConfig {
            k: 4,
            min_score: 0.99,
        },
    );
    assert!(strict.retrieve("borrow").expect("should retrieve").is_empty());
}

#[test]
fn introduce_uses_first_chunks_and_strips_quotes() {
    let model = ScriptedModel::with_replies(vec![Ok(
        "\"Curious how Rust keeps memory safe? Ask me about ownership!\"\n".to_string(),
    )]);
    let chunks: Vec<Chunk> = (0..8)
        .map(|i| chunk(&format!("excerpt number {i}"), None, i))
        .collect();

    let line = introduce(&model, &chunks).expect("should introduce");

    assert_eq!(
        line,
        "Curious how Rust keeps memory safe? Ask me about ownership!"
    );
    let prompt = &model.prompts()[0];
    assert!(prompt.contains("excerpt number 4"));
    assert!(!prompt.contains("excerpt number 5"));
}

#[test]
fn introduce_without_chunks_is_rejected() {
    let model = ScriptedModel::default();
    let result = introduce(&model, &[]);
    assert!(matches!(result, Err(RagError::Validation(_))));
    assert!(model.prompts().is_empty());
}

#[test]
fn chain_exposes_its_index() {
    let chain = chain_with(&ScriptedModel::default());
    assert_eq!(chain.index().len(), 2);
    assert_eq!(chain.language_model().model_name(), "scripted");
    let entries: &[IndexEntry] = chain.index().entries();
    assert_eq!(entries[1].chunk.page, Some(2));
}
