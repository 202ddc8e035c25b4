use super::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn config_file_persistence() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join("config.toml");

        let original_config = Config {
            provider: ProviderKind::OpenAi,
            ollama: OllamaConfig {
                protocol: "https".to_string(),
                host: "test-host".to_string(),
                port: 8080,
                embedding_model: "test-model".to_string(),
                chat_model: "test-chat".to_string(),
                batch_size: 32,
            },
            base_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };

        let toml_content = toml::to_string_pretty(&original_config)
            .expect("config should convert to toml string successfully");
        fs::write(&config_path, toml_content).expect("should write to config_path successfully");

        let content =
            fs::read_to_string(&config_path).expect("should read from config_path successfully");
        let mut loaded_config: Config =
            toml::from_str(&content).expect("should parse toml correctly");
        loaded_config.base_dir = temp_dir.path().to_path_buf();

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn invalid_toml_handling() {
        let invalid_toml = r#"
            [ollama
            host = "localhost"
            port = "invalid_port"
        "#;

        let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let result: Result<Config, toml::de::Error> = toml::from_str("provider = \"faiss\"");
        assert!(result.is_err());
    }

    #[test]
    fn complete_valid_config() {
        let valid_toml = r#"
            provider = "ollama"
            index_dir = "/tmp/doc-chat-index"

            [ollama]
            protocol = "http"
            host = "localhost"
            port = 11434
            embedding_model = "nomic-embed-text:latest"
            chat_model = "llama3.2:latest"
            batch_size = 64

            [chunking]
            chunk_size = 1200
            chunk_overlap = 150

            [retrieval]
            k = 6
            min_score = 0.25

            [generation]
            temperature = 0.2
            intro = false

            [requests]
            timeout_secs = 60
            retry_attempts = 2
        "#;

        let config: Config = toml::from_str(valid_toml).expect("should parse toml successfully");
        assert_eq!(config.provider, ProviderKind::Ollama);
        assert_eq!(
            config.index_dir.as_deref(),
            Some(Path::new("/tmp/doc-chat-index"))
        );
        assert_eq!(config.ollama.batch_size, 64);
        assert_eq!(config.chunking.chunk_size, 1200);
        assert_eq!(config.chunking.chunk_overlap, 150);
        assert_eq!(config.retrieval.k, 6);
        assert!((config.retrieval.min_score - 0.25).abs() < f32::EPSILON);
        assert!(!config.generation.intro);
        assert_eq!(config.requests.timeout_secs, Some(60));
        assert_eq!(config.requests.attempts(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_validation_edge_cases() {
        let config = Config {
            ollama: OllamaConfig {
                host: String::new(),
                port: 80,
                ..OllamaConfig::default()
            },
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.is_err()); // Empty host should be invalid
    }

    #[test]
    fn port_boundary_validation() {
        let mut config = OllamaConfig::default();

        assert!(config.set_port(1).is_ok());
        assert!(config.set_port(65535).is_ok());
        assert!(config.set_port(0).is_err());
    }

    #[test]
    fn batch_size_boundary_validation() {
        let mut config = OllamaConfig::default();

        assert!(config.set_batch_size(1).is_ok());
        assert!(config.set_batch_size(1000).is_ok());
        assert!(config.set_batch_size(0).is_err());
        assert!(config.set_batch_size(1001).is_err());
    }

    #[test]
    fn ollama_url_generation_with_different_hosts() {
        let configs = vec![
            ("http", "localhost", 11434, "http://localhost:11434/"),
            ("http", "127.0.0.1", 8080, "http://127.0.0.1:8080/"),
            ("http", "example.com", 3000, "http://example.com:3000/"),
            (
                "https",
                "secure.example.com",
                443,
                "https://secure.example.com/",
            ),
        ];

        for (protocol, host, port, expected_url) in configs {
            let config = Config {
                ollama: OllamaConfig {
                    protocol: protocol.to_string(),
                    host: host.to_string(),
                    port,
                    ..OllamaConfig::default()
                },
                ..Config::default()
            };

            let url = config.ollama_url().expect("ollama_url is ok");
            assert_eq!(url.as_str(), expected_url);
        }
    }

    #[test]
    fn resolve_config_dir_prefers_override() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let resolved = resolve_config_dir(Some(temp_dir.path())).expect("should resolve");
        assert_eq!(resolved, temp_dir.path());
    }

    #[test]
    fn error_display_messages() {
        let errors = vec![
            ConfigError::InvalidProtocol("ftp".to_string()),
            ConfigError::InvalidPort(0),
            ConfigError::InvalidBatchSize(0),
            ConfigError::InvalidModel(String::new()),
            ConfigError::InvalidUrl("invalid-url".to_string()),
            ConfigError::InvalidChunkOverlap(600, 1000),
            ConfigError::InvalidRetrievalCount(0),
            ConfigError::InvalidTemperature(3.0),
        ];

        for error in errors {
            let message = format!("{error}");
            assert!(!message.is_empty());
            assert!(message.len() > 10); // Ensure meaningful error messages
        }
    }
}
