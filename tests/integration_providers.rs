#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Provider clients against mock HTTP servers
// The clients are blocking, so every call runs on tokio's blocking pool

use doc_chat::RagError;
use doc_chat::config::{Config, OllamaConfig};
use doc_chat::providers::{Embedder, LanguageModel, OllamaClient, OpenAiClient};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ollama_config(server: &MockServer) -> Config {
    let address = server.address();
    let mut config = Config {
        ollama: OllamaConfig {
            host: address.ip().to_string(),
            port: address.port(),
            batch_size: 2,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };
    config.generation.temperature = 0.5;
    config
}

fn openai_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.openai.base_url = format!("{}/v1", server.uri());
    config.generation.temperature = 0.5;
    config
}

async fn blocking<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task should not panic")
}

#[tokio::test]
async fn ollama_embeddings_are_batched() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_json(json!({
            "model": "nomic-embed-text:latest",
            "input": ["first", "second"]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"embeddings": [[1.0, 0.0], [0.0, 1.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_json(json!({
            "model": "nomic-embed-text:latest",
            "input": ["third"]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.5, 0.5]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&ollama_config(&server)).expect("should create client");
    let texts = vec![
        "first".to_string(),
        "second".to_string(),
        "third".to_string(),
    ];
    let embeddings = blocking(move || client.embed_documents(&texts))
        .await
        .expect("should embed");

    assert_eq!(
        embeddings,
        vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]
    );
}

#[tokio::test]
async fn ollama_generate_sends_non_streaming_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(json!({
            "model": "llama3.2:latest",
            "prompt": "What is Rust?",
            "stream": false,
            "options": {"temperature": 0.5}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "A language.", "done": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&ollama_config(&server)).expect("should create client");
    let answer = blocking(move || client.generate("What is Rust?"))
        .await
        .expect("should generate");

    assert_eq!(answer, "A language.");
}

#[tokio::test]
async fn ollama_health_check_requires_both_models() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "nomic-embed-text:latest"},
                {"name": "llama3.2:latest", "size": 2019393189_u64}
            ]
        })))
        .mount(&server)
        .await;

    let config = ollama_config(&server);
    let client = OllamaClient::new(&config).expect("should create client");
    let healthy = blocking(move || client.health_check()).await;
    assert!(healthy.is_ok(), "health check failed: {healthy:?}");

    let mut missing_model = config;
    missing_model.ollama.chat_model = "mistral:latest".to_string();
    let client = OllamaClient::new(&missing_model).expect("should create client");
    let unhealthy = blocking(move || client.health_check()).await;
    assert!(unhealthy.is_err());
}

#[tokio::test]
async fn ollama_server_error_is_not_retried_by_default() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&ollama_config(&server)).expect("should create client");
    let result = blocking(move || client.embed_query("question")).await;

    assert!(matches!(result, Err(RagError::EmbeddingService(_))));
}

#[tokio::test]
async fn ollama_retries_server_errors_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "Recovered"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&ollama_config(&server))
        .expect("should create client")
        .with_retry_attempts(2);
    let answer = blocking(move || client.generate("hello"))
        .await
        .expect("second attempt should succeed");

    assert_eq!(answer, "Recovered");
}

#[tokio::test]
async fn openai_embeddings_use_bearer_auth_and_index_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_json(json!({
            "model": "text-embedding-3-small",
            "input": ["alpha", "beta"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
            ],
            "model": "text-embedding-3-small"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::new(&openai_config(&server), "sk-test".to_string())
        .expect("should create client");
    let texts = vec!["alpha".to_string(), "beta".to_string()];
    let embeddings = blocking(move || client.embed_documents(&texts))
        .await
        .expect("should embed");

    assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn openai_chat_completion() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.5,
            "messages": [{"role": "user", "content": "Summarize the document."}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "It is about Rust."},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::new(&openai_config(&server), "sk-test".to_string())
        .expect("should create client");
    let answer = blocking(move || client.generate("Summarize the document."))
        .await
        .expect("should generate");

    assert_eq!(answer, "It is about Rust.");
}

#[tokio::test]
async fn openai_rejected_key_is_a_generation_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::new(&openai_config(&server), "sk-wrong".to_string())
        .expect("should create client");
    let result = blocking(move || client.generate("hello")).await;

    assert!(matches!(result, Err(RagError::Generation(_))));
}
