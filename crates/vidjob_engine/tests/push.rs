mod common;

use std::time::Duration;

use common::{init_logging, TestSink};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use vidjob_engine::{listen, ChannelSignal, EngineEvent, ListenEnd};

/// Accepts one WebSocket client, sends `frames`, then either closes or
/// waits for the client to close. Reports the path the client asked for and
/// whether a close frame arrived from the client.
async fn serve_once(
    frames: Vec<Message>,
    close_after: bool,
) -> (String, oneshot::Receiver<(String, bool)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut requested = String::new();
        let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            requested = req.uri().path().to_string();
            Ok(resp)
        };
        let mut socket = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .unwrap();
        for frame in frames {
            socket.send(frame).await.unwrap();
        }
        let mut client_closed = false;
        if close_after {
            let _ = socket.close(None).await;
        } else {
            while let Some(Ok(frame)) = socket.next().await {
                if frame.is_close() {
                    client_closed = true;
                    break;
                }
            }
        }
        let _ = done_tx.send((requested, client_closed));
    });

    (endpoint, done_rx)
}

fn status(message: &str) -> Message {
    Message::text(format!(r#"{{"type":"status","message":"{message}"}}"#))
}

fn signals(sink: &TestSink) -> Vec<ChannelSignal> {
    sink.take()
        .into_iter()
        .map(|event| match event {
            EngineEvent::Channel { session: 5, signal } => signal,
            other => panic!("unexpected event {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn relays_frames_until_server_closes() {
    init_logging();
    let (endpoint, done) = serve_once(
        vec![
            status("Rendering"),
            Message::text("garbage"),
            status("completed"),
        ],
        true,
    )
    .await;
    let sink = TestSink::new();
    let cancel = CancellationToken::new();

    let end = listen(5, &endpoint, "abc123", &cancel, &sink).await;

    assert_eq!(end, ListenEnd::Closed);
    assert_eq!(
        signals(&sink),
        vec![
            ChannelSignal::Opened,
            ChannelSignal::Status("Rendering".to_string()),
            ChannelSignal::Malformed("garbage".to_string()),
            ChannelSignal::Status("completed".to_string()),
            ChannelSignal::Closed,
        ]
    );
    let (requested, _) = done.await.unwrap();
    assert_eq!(requested, "/progress/abc123");
}

#[tokio::test]
async fn cancel_closes_the_socket_cleanly() {
    init_logging();
    let (endpoint, done) = serve_once(vec![status("Rendering")], false).await;
    let sink = TestSink::new();
    let cancel = CancellationToken::new();

    let listener = {
        let sink = sink.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { listen(5, &endpoint, "abc123", &cancel, &sink).await })
    };

    // Wait for the status frame before cancelling.
    for _ in 0..200 {
        if sink.len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cancel.cancel();

    assert_eq!(listener.await.unwrap(), ListenEnd::Cancelled);
    let (_, client_closed) = done.await.unwrap();
    assert!(client_closed);
    assert_eq!(
        signals(&sink),
        vec![
            ChannelSignal::Opened,
            ChannelSignal::Status("Rendering".to_string()),
        ]
    );
}

#[tokio::test]
async fn refused_connection_reports_error() {
    init_logging();
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let sink = TestSink::new();
    let end = listen(5, &endpoint, "abc123", &CancellationToken::new(), &sink).await;

    assert_eq!(end, ListenEnd::Failed);
    assert!(matches!(signals(&sink).as_slice(), [ChannelSignal::Error(_)]));
}

#[tokio::test]
async fn unsupported_scheme_reports_error_without_connecting() {
    init_logging();
    let sink = TestSink::new();
    let end = listen(5, "ftp://svc", "abc123", &CancellationToken::new(), &sink).await;

    assert_eq!(end, ListenEnd::Failed);
    assert!(matches!(signals(&sink).as_slice(), [ChannelSignal::Error(_)]));
}
