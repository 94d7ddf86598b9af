//! End-to-end client tests against a canned local HTTP server
//!
//! Each test binds a one-shot TCP listener that captures the request and
//! replies with a fixed response, optionally split into delayed writes so
//! the body reaches the decoder in several pieces.

use ollama_fluent::auth::AuthConfig;
use ollama_fluent::types::{ChatResponse, GenerateResponse};
use ollama_fluent::{ChatMessage, ClientConfig, OllamaClient, OllamaError};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Raw request as seen by the server
struct Captured {
    head: String,
    body: Value,
}

/// Serve exactly one request; `pieces` are written in order with a short pause between
async fn serve_once(status: &'static str, pieces: Vec<&'static str>) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut socket).await;

        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/x-ndjson\r\nConnection: close\r\n\r\n",
            status
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        for piece in pieces {
            socket.write_all(piece.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        socket.shutdown().await.unwrap();
        captured
    });

    (url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Captured {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut buf).await.unwrap();
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        assert!(n > 0, "client closed before sending headers");
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while raw.len() < header_end + content_length {
        let n = socket.read(&mut buf).await.unwrap();
        assert!(n > 0, "client closed mid-body");
        raw.extend_from_slice(&buf[..n]);
    }

    let body = if content_length == 0 {
        Value::Null
    } else {
        serde_json::from_slice(&raw[header_end..header_end + content_length]).unwrap()
    };

    Captured { head, body }
}

fn client_for(url: &str) -> OllamaClient {
    OllamaClient::new(ClientConfig::default().with_url(url)).unwrap()
}

#[tokio::test]
async fn test_generate_stream_across_writes() {
    let (url, server) = serve_once(
        "200 OK",
        vec![
            "{\"model\":\"llama2\",\"response\":\"The\",\"done\":false}\n{\"model\":\"llama2\",\"resp",
            "onse\":\" sky\",\"done\":false}\n",
            "{\"model\":\"llama2\",\"response\":\"\",\"done\":true,\"eval_count\":2,\"eval_duration\":1000000000}",
        ],
    )
    .await;

    let client = client_for(&url);
    let request = client.generate_request("Why is the sky blue?").system("Be brief");

    let mut tokens = Vec::new();
    let chunks = client
        .generate_stream(&request, |chunk| {
            tokens.push(chunk["response"].as_str().unwrap_or_default().to_string())
        })
        .await
        .unwrap();

    assert_eq!(chunks.len(), 3);
    assert_eq!(tokens, vec!["The", " sky", ""]);
    assert_eq!(GenerateResponse::concat_stream(&chunks), "The sky");

    let last: GenerateResponse = serde_json::from_value(chunks[2].clone()).unwrap();
    assert!(last.done);
    assert_eq!(last.metrics.tokens_per_sec(), 2.0);

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("POST /api/generate "));
    assert_eq!(captured.body["stream"], true);
    assert_eq!(captured.body["model"], "llama2");
    assert_eq!(captured.body["system"], "Be brief");
    assert_eq!(captured.body["keep_alive"], "5m");
}

#[tokio::test]
async fn test_truncated_stream_surfaces_decode_error() {
    let (url, _server) = serve_once(
        "200 OK",
        vec!["{\"response\":\"Hel\",\"done\":false}\n", "{\"response\":\"lo\",\"do"],
    )
    .await;

    let client = client_for(&url);
    let mut seen = 0;
    let result = client
        .generate_stream(&client.generate_request("hi"), |_| seen += 1)
        .await;

    match result {
        Err(OllamaError::Decode(err)) => {
            assert_eq!(err.remainder_lossy(), "{\"response\":\"lo\",\"do");
        }
        other => panic!("expected decode error, got {:?}", other),
    }
    assert_eq!(seen, 1);
}

#[tokio::test]
async fn test_chat_non_streaming() {
    let (url, server) = serve_once(
        "200 OK",
        vec!["{\"model\":\"llama2\",\"message\":{\"role\":\"assistant\",\"content\":\"Rayleigh scattering.\"},\"done\":true}"],
    )
    .await;

    let client = client_for(&url);
    let request = client.chat_request(vec![ChatMessage::user("Why is the sky blue?")]);
    let response: ChatResponse = client.chat(&request).await.unwrap();

    assert_eq!(response.message.unwrap().content, "Rayleigh scattering.");

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("POST /api/chat "));
    assert_eq!(captured.body["stream"], false);
    assert_eq!(captured.body["messages"][0]["role"], "user");
}

#[tokio::test]
async fn test_api_error_status() {
    let (url, _server) = serve_once(
        "404 Not Found",
        vec!["{\"error\":\"model 'ghost' not found, try pulling it first\"}"],
    )
    .await;

    let err = client_for(&url)
        .models()
        .show("ghost")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("try pulling it first"));
}

#[tokio::test]
async fn test_list_models_sends_auth() {
    let (url, server) = serve_once(
        "200 OK",
        vec!["{\"models\":[{\"name\":\"llama2:latest\",\"modified_at\":\"2023-12-07T09:32:18.757212583-08:00\",\"size\":3825819519,\"digest\":\"fe938a131f40\"}]}"],
    )
    .await;

    let config = ClientConfig::default()
        .with_url(&url)
        .with_auth(AuthConfig::bearer("test-token"));
    let models = OllamaClient::new(config).unwrap().models().list().await.unwrap();

    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name, "llama2:latest");

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("GET /api/tags "));
    assert!(captured
        .head
        .to_ascii_lowercase()
        .contains("authorization: bearer test-token"));
}

#[tokio::test]
async fn test_pull_stream_reports_progress() {
    let (url, server) = serve_once(
        "200 OK",
        vec![
            "{\"status\":\"pulling manifest\"}\n",
            "{\"status\":\"downloading\",\"digest\":\"sha256:abc\",\"total\":100,\"completed\":50}\n",
            "{\"status\":\"success\"}\n",
        ],
    )
    .await;

    let mut statuses = Vec::new();
    let updates = client_for(&url)
        .models()
        .pull_stream("llama2", |p| statuses.push(p.status.clone()))
        .await
        .unwrap();

    assert_eq!(statuses, vec!["pulling manifest", "downloading", "success"]);
    assert_eq!(updates[1].fraction(), Some(0.5));
    assert!(updates.last().unwrap().is_success());

    let captured = server.await.unwrap();
    assert_eq!(captured.body, json!({"name": "llama2", "stream": true}));
}

#[tokio::test]
async fn test_pull_stream_server_error() {
    let (url, _server) = serve_once(
        "200 OK",
        vec![
            "{\"status\":\"pulling manifest\"}\n",
            "{\"error\":\"pull model manifest: file does not exist\"}\n",
        ],
    )
    .await;

    let err = client_for(&url)
        .models()
        .pull_stream("nope", |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, OllamaError::Server(ref msg) if msg.contains("file does not exist")));
}

#[tokio::test]
async fn test_delete_uses_delete_method() {
    let (url, server) = serve_once("200 OK", vec![]).await;

    client_for(&url).models().delete("old-model").await.unwrap();

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("DELETE /api/delete "));
    assert_eq!(captured.body, json!({"name": "old-model"}));
}

#[tokio::test]
async fn test_embeddings() {
    let (url, server) = serve_once("200 OK", vec!["{\"embedding\":[0.5,-0.25,1.0]}"]).await;

    let response = client_for(&url)
        .embeddings("all-minilm", "hello")
        .await
        .unwrap();

    assert_eq!(response.embedding, vec![0.5, -0.25, 1.0]);

    let captured = server.await.unwrap();
    assert_eq!(captured.body, json!({"model": "all-minilm", "prompt": "hello"}));
}

#[tokio::test]
async fn test_pull_stream_returns_what_callback_saw() {
    let (url, _server) = serve_once(
        "200 OK",
        vec![
            "{\"status\":\"pulling manifest\"}\n{\"status\":\"downloading\",\"total\":10,",
            "\"completed\":10}\n{\"status\":\"success\"}",
        ],
    )
    .await;

    let mut seen = Vec::new();
    let updates = client_for(&url)
        .models()
        .pull_stream("llama2", |p| seen.push(p.clone()))
        .await
        .unwrap();

    assert_eq!(updates, seen);
    assert_eq!(updates[1].fraction(), Some(1.0));
}

#[tokio::test]
async fn test_pull_stream_rejects_mistyped_progress() {
    let (url, _server) = serve_once(
        "200 OK",
        vec!["{\"status\":\"pulling manifest\"}\n{\"status\":7}\n"],
    )
    .await;

    let err = client_for(&url)
        .models()
        .pull_stream("llama2", |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, OllamaError::Serialization(_)));
}
