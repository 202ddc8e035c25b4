
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, OllamaConfig, OpenAiConfig, ProviderKind};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Doc Chat Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    let providers = &[ProviderKind::Ollama, ProviderKind::OpenAi];
    let default_index = providers
        .iter()
        .position(|&p| p == config.provider)
        .unwrap_or(0);

    let provider_index = Select::new()
        .with_prompt("Model provider")
        .default(default_index)
        .items(providers)
        .interact()?;
    config.provider = providers[provider_index];

    eprintln!();
    match config.provider {
        ProviderKind::Ollama => {
            eprintln!("{}", style("Ollama Configuration").bold().yellow());
            eprintln!("Configure your local Ollama instance for embeddings and answers.");
            eprintln!();

            configure_ollama(&mut config.ollama)?;

            eprintln!();
            eprintln!("{}", style("Testing configuration...").yellow());

            if test_ollama_connection(&config.ollama) {
                eprintln!("{}", style("✓ Ollama connection successful!").green());
            } else {
                eprintln!(
                    "{}",
                    style("⚠ Warning: Could not connect to Ollama").yellow()
                );
                eprintln!("You can continue, but make sure Ollama is running before ingesting.");
            }
        }
        ProviderKind::OpenAi => {
            eprintln!("{}", style("OpenAI Configuration").bold().yellow());
            eprintln!("The API key is read from an environment variable and never saved.");
            eprintln!();

            configure_openai(&mut config.openai)?;

            if std::env::var(&config.openai.api_key_env).is_err() {
                eprintln!(
                    "{}",
                    style(format!(
                        "⚠ Warning: {} is not set in this shell",
                        config.openai.api_key_env
                    ))
                    .yellow()
                );
            }
        }
    }

    eprintln!();
    eprintln!("{}", style("Retrieval").bold().yellow());
    configure_retrieval(&mut config)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();
    eprintln!("  Provider: {}", style(config.provider).cyan());
    eprintln!();

    match config.provider {
        ProviderKind::Ollama => {
            eprintln!("{}", style("Ollama Settings:").bold().yellow());
            match config.ollama_url() {
                Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
                Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
            }
            eprintln!(
                "  Embedding Model: {}",
                style(&config.ollama.embedding_model).cyan()
            );
            eprintln!("  Chat Model: {}", style(&config.ollama.chat_model).cyan());
            eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
        }
        ProviderKind::OpenAi => {
            eprintln!("{}", style("OpenAI Settings:").bold().yellow());
            eprintln!("  Base URL: {}", style(&config.openai.base_url).cyan());
            eprintln!(
                "  Embedding Model: {}",
                style(&config.openai.embedding_model).cyan()
            );
            eprintln!("  Chat Model: {}", style(&config.openai.chat_model).cyan());
            eprintln!("  API Key Variable: {}", style(&config.openai.api_key_env).cyan());
        }
    }

    eprintln!();
    eprintln!("{}", style("Pipeline Settings:").bold().yellow());
    eprintln!(
        "  Chunk Size / Overlap: {} / {}",
        style(config.chunking.chunk_size).cyan(),
        style(config.chunking.chunk_overlap).cyan()
    );
    eprintln!("  Retrieved Chunks: {}", style(config.retrieval.k).cyan());
    eprintln!("  Minimum Score: {}", style(config.retrieval.min_score).cyan());
    eprintln!("  Temperature: {}", style(config.generation.temperature).cyan());
    eprintln!(
        "  Request Timeout: {}",
        style(
            config
                .requests
                .timeout_secs
                .map_or_else(|| "none".to_string(), |secs| format!("{secs}s"))
        )
        .cyan()
    );

    eprintln!();
    eprintln!("Index directory: {}", style(config.index_path().display()).dim());
    eprintln!("Config file: {}", style(config.config_file_path().display()).dim());

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    if !config_dir.join("config.toml").exists() {
        eprintln!(
            "{}",
            style("No existing configuration found. Using defaults.").yellow()
        );
    }

    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("Existing configuration is invalid. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        Ok,
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model = prompt_model("Embedding model", &ollama.embedding_model)?;
    let chat_model = prompt_model("Chat model", &ollama.chat_model)?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_embedding_model(embedding_model)?;
    ollama.set_chat_model(chat_model)?;
    ollama.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_openai(openai: &mut OpenAiConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .default(openai.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            OpenAiConfig {
                base_url: input.clone(),
                ..OpenAiConfig::default()
            }
            .validate()
        })
        .interact_text()?;

    let embedding_model = prompt_model("Embedding model", &openai.embedding_model)?;
    let chat_model = prompt_model("Chat model", &openai.chat_model)?;

    let api_key_env: String = Input::new()
        .with_prompt("Environment variable holding the API key")
        .default(openai.api_key_env.clone())
        .interact_text()?;

    openai.set_base_url(base_url)?;
    openai.set_embedding_model(embedding_model)?;
    openai.set_chat_model(chat_model)?;
    if !api_key_env.trim().is_empty() {
        openai.api_key_env = api_key_env.trim().to_string();
    }

    Ok(())
}

fn configure_retrieval(config: &mut Config) -> Result<()> {
    config.retrieval.k = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(config.retrieval.k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=50).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 50")
            }
        })
        .interact_text()?;

    config.generation.temperature = Input::new()
        .with_prompt("Answer temperature")
        .default(config.generation.temperature)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (0.0..=2.0).contains(input) {
                Ok(())
            } else {
                Err("Must be between 0.0 and 2.0")
            }
        })
        .interact_text()?;

    Ok(())
}

fn prompt_model(prompt: &str, current: &str) -> Result<String> {
    Ok(Input::new()
        .with_prompt(prompt)
        .default(current.to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?)
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) => (400..500).contains(&code),
        Err(_) => false,
    }
}
