use aideas_sdk::{
    openai::{OpenAIChatBackend, OpenAIChatBackendOptions},
    ChatBackend, ChatError, ChatMessage, ChatSession, CredentialHolder,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::oneshot,
};

/// Answer a single HTTP request with `status` and `body`, handing back the
/// raw request text.
async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: String,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (request_tx, request_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let _ = request_tx.send(request);

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    (format!("http://{address}/v1"), request_rx)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let read = socket.read(&mut chunk).await.unwrap();
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);

        let text = String::from_utf8_lossy(&buffer);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

fn sse(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str("data: ");
        body.push_str(chunk);
        body.push_str("\n\n");
    }
    body
}

fn backend(base_url: String) -> OpenAIChatBackend {
    OpenAIChatBackend::new(
        "gpt-4o-mini",
        OpenAIChatBackendOptions {
            base_url: Some(base_url),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn streams_delta_content_until_done() {
    let body = sse(&[
        r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#,
        r#"{"choices":[{"index":0,"delta":{"content":"1. Idea A"}}]}"#,
        r#"{"choices":[{"index":0,"delta":{"content":"\n2. Idea B"}}]}"#,
        r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
        "[DONE]",
    ]);
    let (base_url, request) = serve_once("200 OK", "text/event-stream", body).await;

    let stream = backend(base_url)
        .stream(
            vec![ChatMessage::system("rules"), ChatMessage::user("Give me 3 ideas")],
            "sk-test",
        )
        .await
        .expect("stream opens");
    let fragments: Vec<String> = stream.map(|f| f.expect("fragment")).collect().await;
    assert_eq!(fragments, vec!["1. Idea A", "\n2. Idea B"]);

    let request = request.await.unwrap();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request
        .to_ascii_lowercase()
        .contains("authorization: bearer sk-test"));
    assert!(request.contains(r#""stream":true"#));
    assert!(request.contains(r#""role":"system""#));
}

#[tokio::test]
async fn rejected_key_is_a_status_error() {
    let (base_url, _) = serve_once(
        "401 Unauthorized",
        "application/json",
        r#"{"error":{"message":"Incorrect API key provided"}}"#.to_string(),
    )
    .await;

    let err = backend(base_url)
        .stream(vec![ChatMessage::user("hello")], "sk-bad")
        .await
        .err()
        .expect("401 fails");
    match err {
        ChatError::StatusCode(status, body) => {
            assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
            assert!(body.contains("Incorrect API key"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_chunk_fails_the_session_turn() {
    let body = sse(&[
        r#"{"choices":[{"index":0,"delta":{"content":"partial"}}]}"#,
        "{not json",
    ]);
    let (base_url, _) = serve_once("200 OK", "text/event-stream", body).await;

    let session = ChatSession::with_system_prompt(
        Arc::new(backend(base_url)),
        Arc::new(CredentialHolder::with_api_key("sk-test")),
        "rules",
    );

    let err = session.send_prompt("hello there").await.unwrap_err();
    assert!(matches!(err, ChatError::Invariant("openai", _)));
    assert_eq!(session.messages().len(), 2);
    assert_eq!(session.partial(), "");
}
