//! Server integration tests.
//!
//! Plain HTTP routes go through the router with `oneshot`. The WebSocket
//! tests bind a real port and attach with the client transport.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;
use tty_share::server::{create_router, AppState};

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to extract body as string.
async fn response_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&body).to_string()
}

/// Helper to extract JSON from response.
async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

// ============================================================================
// HTTP Routes
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(AppState::default());

    let response = app.oneshot(request(Method::GET, "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_text(response).await, "OK");
}

#[tokio::test]
async fn test_list_sessions_empty() {
    let app = create_router(AppState::default());

    let response = app.oneshot(request(Method::GET, "/l")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_router(AppState::default());

    let response = app.oneshot(request(Method::GET, "/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ws_route_requires_upgrade() {
    let app = create_router(AppState::default());

    let response = app.oneshot(request(Method::GET, "/ws/1")).await.unwrap();

    assert!(response.status().is_client_error());
}

// ============================================================================
// WebSocket Sessions
// ============================================================================

#[cfg(unix)]
mod live {
    use std::net::SocketAddr;
    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tty_share::protocol::{Frame, Message};
    use tty_share::pty::PtySize;
    use tty_share::receiver::{Link, Transport, WsLink, WsTransport};
    use tty_share::server::{serve_on, AppState};

    use super::*;

    const WAIT: Duration = Duration::from_secs(10);

    async fn start(state: AppState) -> (SocketAddr, JoinHandle<tty_share::Result<()>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_on(listener, state));
        (addr, server)
    }

    async fn attach(addr: SocketAddr, id: &str) -> WsLink {
        WsTransport::new()
            .connect(&format!("ws://{}/ws/{}", addr, id))
            .await
            .unwrap()
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    /// Read frames until the output contains `needle`.
    async fn read_until(link: &mut WsLink, needle: &str) -> String {
        let mut output = Vec::new();
        let _ = tokio::time::timeout(WAIT, async {
            while let Some(text) = link.recv().await {
                if let Ok(Message::Write(bytes)) = Frame::from_json(&text).unwrap().decode() {
                    output.extend(bytes);
                    if String::from_utf8_lossy(&output).contains(needle) {
                        break;
                    }
                }
            }
        })
        .await;
        String::from_utf8_lossy(&output).into_owned()
    }

    /// Read frames until the server closes the connection.
    async fn read_to_close(link: &mut WsLink) -> (String, Vec<Message>) {
        let mut output = Vec::new();
        let mut messages = Vec::new();
        tokio::time::timeout(WAIT, async {
            while let Some(text) = link.recv().await {
                let message = Frame::from_json(&text).unwrap().decode().unwrap();
                if let Message::Write(ref bytes) = message {
                    output.extend_from_slice(bytes);
                }
                messages.push(message);
            }
        })
        .await
        .expect("server did not close the connection");
        (String::from_utf8_lossy(&output).into_owned(), messages)
    }

    async fn wait_for_no_sessions(state: &AppState) {
        tokio::time::timeout(WAIT, async {
            while state.store.count().unwrap() > 0 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("session was not removed");
    }

    #[tokio::test]
    async fn test_write_and_resize_reach_the_pty() {
        let state = AppState::new("/bin/cat", Vec::new());
        let (addr, _server) = start(state.clone()).await;
        let mut link = attach(addr, "e1").await;

        link.send(Frame::win_size(100, 30).to_json().unwrap())
            .await
            .unwrap();
        link.send(Frame::write("hello\r").to_json().unwrap())
            .await
            .unwrap();

        let output = read_until(&mut link, "hello").await;
        assert!(output.contains("hello"), "output: {:?}", output);

        let session = state.store.get("e1").unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(session.size().unwrap(), PtySize::new(30, 100));

        let app = create_router(state.clone());
        let response = app.oneshot(request(Method::GET, "/l")).await.unwrap();
        assert_eq!(response_json(response).await, serde_json::json!(["e1"]));

        link.close().await;
        wait_for_no_sessions(&state).await;
        tokio::time::timeout(WAIT, session.wait()).await.unwrap();
    }

    #[tokio::test]
    async fn test_exit_sends_terminate_then_closes() {
        let state = AppState::new("/bin/sh", sh("sleep 0.3; printf done-marker"));
        let (addr, _server) = start(state.clone()).await;
        let mut link = attach(addr, "e2").await;

        let (output, messages) = read_to_close(&mut link).await;

        assert!(output.contains("done-marker"), "output: {:?}", output);
        assert_eq!(messages.last(), Some(&Message::Terminate));
        assert_eq!(
            messages
                .iter()
                .filter(|m| **m == Message::Terminate)
                .count(),
            1
        );
        wait_for_no_sessions(&state).await;
    }

    #[tokio::test]
    async fn test_receivers_share_a_session() {
        let state = AppState::new("/bin/cat", Vec::new());
        let (addr, _server) = start(state.clone()).await;
        let mut first = attach(addr, "shared").await;
        let mut second = attach(addr, "shared").await;

        first
            .send(Frame::write("both\r").to_json().unwrap())
            .await
            .unwrap();

        assert!(read_until(&mut first, "both").await.contains("both"));
        assert!(read_until(&mut second, "both").await.contains("both"));
        assert_eq!(state.store.count().unwrap(), 1);

        // The session survives while a receiver is attached
        first.close().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(state.store.count().unwrap(), 1);

        second.close().await;
        wait_for_no_sessions(&state).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reattach_during_last_detach_keeps_session_alive() {
        let state = AppState::new("/bin/cat", Vec::new());
        let (addr, _server) = start(state.clone()).await;

        for round in 0..5 {
            let mut leaving = attach(addr, "flap").await;
            leaving
                .send(Frame::write("a\r").to_json().unwrap())
                .await
                .unwrap();
            read_until(&mut leaving, "a").await;

            // The next receiver arrives while the last one is leaving
            let (_, mut arriving) = tokio::join!(leaving.close(), attach(addr, "flap"));

            let marker = format!("round-{}", round);
            arriving
                .send(Frame::write(&format!("{}\r", marker)).to_json().unwrap())
                .await
                .unwrap();
            let output = read_until(&mut arriving, &marker).await;
            assert!(output.contains(&marker), "output: {:?}", output);

            // Still attached: no Terminate, and the stored session is running
            tokio::time::sleep(Duration::from_millis(100)).await;
            let session = state.store.get("flap").unwrap().unwrap();
            assert!(!session.has_exited());
            assert_eq!(session.receiver_count(), 1);

            arriving.close().await;
            wait_for_no_sessions(&state).await;
        }
    }

    #[tokio::test]
    async fn test_malformed_frames_are_ignored() {
        let state = AppState::new("/bin/cat", Vec::new());
        let (addr, _server) = start(state.clone()).await;
        let mut link = attach(addr, "e3").await;

        link.send("not json".to_string()).await.unwrap();
        link.send(r#"{"Type":"Bogus","Data":"e30="}"#.to_string())
            .await
            .unwrap();
        link.send(Frame::terminate().to_json().unwrap())
            .await
            .unwrap();
        link.send(Frame::write("still-alive\r").to_json().unwrap())
            .await
            .unwrap();

        let output = read_until(&mut link, "still-alive").await;
        assert!(output.contains("still-alive"), "output: {:?}", output);

        link.close().await;
        wait_for_no_sessions(&state).await;
    }

    #[tokio::test]
    async fn test_once_stops_server() {
        let state = AppState::new("/bin/cat", Vec::new()).with_once(true);
        let (addr, server) = start(state.clone()).await;
        let mut link = attach(addr, "only").await;

        link.send(Frame::write("x\r").to_json().unwrap())
            .await
            .unwrap();
        read_until(&mut link, "x").await;
        link.close().await;

        let result = tokio::time::timeout(WAIT, server)
            .await
            .expect("server kept running")
            .unwrap();
        assert!(result.is_ok());
    }
}
