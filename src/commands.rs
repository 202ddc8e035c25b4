use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::Result;
use crate::chain::{INTRO_CHUNK_COUNT, RagChain, introduce};
use crate::config::{Config, ProviderKind};
use crate::index::{VectorIndex, read_manifest};
use crate::ingest::{IngestOutcome, Ingestor};
use crate::loader::validate_selection;
use crate::memory::ConversationMemory;
use crate::providers::{
    LanguageModel, OllamaClient, embedder_from_config, language_model_from_config,
};

/// Validate the selection, ingest it and print a summary
#[inline]
pub fn ingest_files(config: &Config, paths: &[PathBuf], strict: bool) -> Result<IngestOutcome> {
    validate_selection(paths, strict)?;

    let embedder = embedder_from_config(config)?;
    let outcome = Ingestor::new(config, embedder.as_ref()).ingest_and_index(paths)?;

    let stats = &outcome.stats;
    println!("✅ Documents ingested");
    println!("   📄 Files loaded: {}", stats.files_loaded);
    if stats.files_skipped > 0 {
        println!("   ⏭️  Files skipped (unsupported type): {}", stats.files_skipped);
    }
    println!("   📚 Documents: {}", stats.documents);
    println!("   🧩 Chunks: {}", stats.chunks);
    println!("   💾 Index: {}", config.index_path().display());

    if config.generation.intro {
        match language_model_from_config(config) {
            Ok(llm) => print_intro(llm.as_ref(), &outcome.index),
            Err(e) => warn!("Skipping intro message: {}", e),
        }
    }

    Ok(outcome)
}

fn print_intro(llm: &dyn LanguageModel, index: &VectorIndex) {
    let chunks: Vec<_> = index.chunks().take(INTRO_CHUNK_COUNT).cloned().collect();
    match introduce(llm, &chunks) {
        Ok(line) => {
            println!();
            println!("💬 {line}");
        }
        Err(e) => warn!("Failed to generate intro message: {}", e),
    }
}

/// Chat with the persisted index on stdin and stdout
#[inline]
pub fn chat(config: &Config) -> Result<()> {
    let index = VectorIndex::load(&config.index_path())?;
    start_chat(config, index)
}

/// Ingest everything under `data_dir`, then chat with the result
#[inline]
pub fn run_pipeline(config: &Config, data_dir: &Path) -> Result<()> {
    let outcome = ingest_files(config, &[data_dir.to_path_buf()], false)?;
    println!();
    start_chat(config, outcome.index)
}

fn start_chat(config: &Config, index: VectorIndex) -> Result<()> {
    let embedder = embedder_from_config(config)?;
    if index.embedding_model() != embedder.model_name() {
        warn!(
            "Index was built with {} but the configured embedding model is {}; results may be poor",
            index.embedding_model(),
            embedder.model_name()
        );
    }
    let llm = language_model_from_config(config)?;

    let chain = RagChain::new(index, embedder, llm, config.retrieval.clone());
    let mut memory = ConversationMemory::new();
    info!(
        "Starting chat session {} over {} chunks",
        memory.session_id(),
        chain.index().len()
    );

    let stdin = io::stdin();
    let answered = run_chat_loop(&chain, &mut memory, stdin.lock(), io::stdout())?;
    info!("Chat session ended after {} questions", answered);
    Ok(())
}

/// Read questions from `input` and write answers to `output` until `exit` or end of input
///
/// A failed turn is reported and the loop carries on. Returns the number of
/// questions answered.
#[inline]
pub fn run_chat_loop<R: BufRead, W: Write>(
    chain: &RagChain,
    memory: &mut ConversationMemory,
    mut input: R,
    mut output: W,
) -> Result<usize> {
    writeln!(
        output,
        "Ask a question about your documents (type 'exit' to quit)."
    )?;

    let mut answered = 0;
    loop {
        write!(output, "You: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") {
            writeln!(output, "Goodbye!")?;
            break;
        }

        match chain.answer(question, memory) {
            Ok(answer) => {
                writeln!(output, "Assistant: {answer}")?;
                answered += 1;
            }
            Err(e) => {
                error!("Failed to answer question: {}", e);
                writeln!(output, "{}", e.user_message())?;
            }
        }
    }

    Ok(answered)
}

/// Print configuration, service health and index details
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("📊 Doc-Chat Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Model Provider: {}", config.provider);
    match config.provider {
        ProviderKind::Ollama => {
            println!("   📋 Embedding model: {}", config.ollama.embedding_model);
            println!("   📋 Chat model: {}", config.ollama.chat_model);
            match OllamaClient::new(config) {
                Ok(client) => match client.health_check() {
                    Ok(()) => println!(
                        "   ✅ Ollama: Connected ({}:{})",
                        config.ollama.host, config.ollama.port
                    ),
                    Err(e) => println!("   ⚠️  Ollama: Unhealthy - {e:#}"),
                },
                Err(e) => println!("   ❌ Ollama: Invalid configuration - {e:#}"),
            }
        }
        ProviderKind::OpenAi => {
            println!("   🌐 Base URL: {}", config.openai.base_url);
            println!("   📋 Embedding model: {}", config.openai.embedding_model);
            println!("   📋 Chat model: {}", config.openai.chat_model);
            if std::env::var_os(&config.openai.api_key_env).is_some() {
                println!("   ✅ API key: found in ${}", config.openai.api_key_env);
            } else {
                println!("   ❌ API key: ${} is not set", config.openai.api_key_env);
            }
        }
    }

    println!();
    let index_path = config.index_path();
    println!("🔍 Index: {}", index_path.display());
    match read_manifest(&index_path) {
        Ok(manifest) => {
            println!("   ✅ Chunks: {}", manifest.chunk_count);
            println!("   🔢 Dimension: {}", manifest.dimension);
            println!("   📋 Embedding model: {}", manifest.embedding_model);
            println!(
                "   🕒 Created: {}",
                manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        Err(e) => println!("   💤 {e}"),
    }

    Ok(())
}
