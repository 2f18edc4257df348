use std::sync::Arc;

use assistant_stream::prelude::*;
use assistant_stream::{AssistantTransport, RunRequest};
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct CapturedRequest {
    head: String,
    body: String,
}

/// Serves exactly one HTTP/1.1 exchange, writing `chunks` one by one after the
/// response head, then closing the connection.
async fn serve_once(
    status_line: &'static str,
    content_type: &'static str,
    chunks: Vec<&'static str>,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut socket).await;
        let _ = tx.send(request);
        let head = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: {content_type}\r\nconnection: close\r\n\r\n"
        );
        socket.write_all(head.as_bytes()).await.expect("write head");
        for chunk in chunks {
            socket.write_all(chunk.as_bytes()).await.expect("write chunk");
            socket.flush().await.expect("flush");
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let _ = socket.shutdown().await;
    });
    (format!("http://{addr}/v1"), rx)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut tmp = [0_u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut tmp).await.expect("read");
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut tmp).await.expect("read body");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
    CapturedRequest {
        head,
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    }
}

fn client(base_url: &str) -> AssistantClient {
    AssistantClient::new(AssistantConfig::new("sk-test", "asst_1").base_url(base_url))
        .expect("client")
}

#[tokio::test]
async fn streamed_run_builds_transcript_and_adopts_thread() {
    let (base_url, captured) = serve_once(
        "200 OK",
        "text/event-stream",
        vec![
            "event: thread.created\ndata: {\"object\":\"thread\",\"id\":\"thread_abc\"}\n\n",
            "event: thread.message.delta\ndata: {\"object\":\"thread.message.delta\",\"delta\":{\"content\":[{\"index\":0,\"type\":\"text\",\"text\":{\"value\":\"Hel",
            "lo _world_\"}}]}}\n\n",
            "event: thread.message.completed\ndata: {\"object\":\"thread.message.completed\",\"content\":[{\"type\":\"text\",\"text\":{\"value\":\"Hello _world_\\n\"}}]}\n\n",
            "event: done\ndata: [DONE]\n\n",
        ],
    )
    .await;

    let mut conversation = Conversation::new(Arc::new(client(&base_url)));
    let outcome = conversation.send("hi there").await.expect("turn");

    assert_eq!(outcome, ConsumeOutcome::Sentinel);
    assert_eq!(conversation.thread_id(), Some("thread_abc"));
    let state = conversation.state().clone();
    assert!(!state.is_loading);
    assert_eq!(state.transcript.fragments(), ["Hello <em>world</em>"]);
    assert_eq!(
        state.transcript.complete(),
        Some("Hello <em>world</em><br/>")
    );

    let request = captured.await.expect("captured request");
    let head = request.head.to_ascii_lowercase();
    assert!(request.head.starts_with("POST /v1/threads/runs "));
    assert!(head.contains("authorization: bearer sk-test"));
    assert!(head.contains("openai-beta: assistants=v2"));
    assert!(head.contains("content-type: application/json"));
    let body: serde_json::Value = serde_json::from_str(&request.body).expect("json body");
    assert_eq!(body["assistant_id"], "asst_1");
    assert_eq!(body["stream"], true);
    assert_eq!(body["thread"]["messages"][0]["content"], "hi there");
}

#[tokio::test]
async fn non_success_status_is_surfaced_without_reading_stream() {
    let (base_url, _captured) = serve_once(
        "401 Unauthorized",
        "application/json",
        vec!["{\"error\":{\"message\":\"Incorrect API key\"}}"],
    )
    .await;

    let mut conversation = Conversation::new(Arc::new(client(&base_url)));
    let err = conversation.send("hi").await.expect_err("should fail");

    match err {
        AssistantError::Status { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("Incorrect API key"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!conversation.is_busy());
    assert!(conversation.state().transcript.is_empty());
}

#[tokio::test]
async fn existing_thread_run_posts_additional_messages() {
    let (base_url, captured) = serve_once(
        "200 OK",
        "text/event-stream",
        vec!["data: {\"object\":\"thread.message.delta\",\"delta\":{\"content\":[{\"text\":{\"value\":\"ok\"}}]}}\n\ndata: [DONE]\n\n"],
    )
    .await;

    let mut conversation =
        Conversation::new(Arc::new(client(&base_url))).with_thread("thread_1");
    conversation.send("next").await.expect("turn");
    assert_eq!(conversation.state().transcript.streamed_text(), "ok");

    let request = captured.await.expect("captured request");
    assert!(request.head.starts_with("POST /v1/threads/thread_1/runs "));
    let body: serde_json::Value = serde_json::from_str(&request.body).expect("json body");
    assert_eq!(body["additional_messages"][0]["role"], "user");
    assert_eq!(body["additional_messages"][0]["content"], "next");
}

#[tokio::test]
async fn latest_message_fetches_newest_text() {
    let (base_url, captured) = serve_once(
        "200 OK",
        "application/json",
        vec!["{\"object\":\"list\",\"data\":[{\"id\":\"msg_9\",\"content\":[{\"type\":\"text\",\"text\":{\"value\":\"Use `cargo`\",\"annotations\":[]}}]}]}"],
    )
    .await;

    let transport = client(&base_url);
    let text = transport.latest_message("thread_7").await.expect("latest");
    assert_eq!(text.as_deref(), Some("Use `cargo`"));

    let request = captured.await.expect("captured request");
    assert!(request.head.starts_with("GET /v1/threads/thread_7/messages "));
}

#[tokio::test]
async fn connection_refused_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let transport = client(&format!("http://{addr}/v1"));
    let result = transport.open_run(&RunRequest::for_turn(None, "hi")).await;
    assert!(matches!(result, Err(AssistantError::Transport(_))));
}
