//! WebSocket endpoint tests against a bound server.

mod common;

use std::time::Duration;

use futures_util::{SinkExt, Stream, StreamExt};
use kiln::{App, HandlerError};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use common::spawn_app;

type Closed = (u16, Option<String>);

fn chat_app(closed: mpsc::UnboundedSender<Closed>) -> App {
    let mut app = App::new(common::config());
    app.ws("/chat/:room", move |ws| {
        ws.on_connect(|session| {
            let room = session.path_param("room").unwrap_or_default().to_string();
            session
                .send(format!("welcome to {room}"))
                .map_err(HandlerError::unexpected)
        })
        .on_message(|session, text| session.send(text).map_err(HandlerError::unexpected))
        .on_close(move |_, code, reason| {
            let _ = closed.send((code, reason.map(str::to_string)));
            Ok(())
        });
    });
    app
}

async fn next_close(rx: &mut mpsc::UnboundedReceiver<Closed>) -> Closed {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("close handler was not called")
        .expect("channel closed")
}

async fn next_text<S>(ws: &mut S) -> String
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    match tokio::time::timeout(Duration::from_secs(5), ws.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text.as_str().to_string(),
        other => panic!("expected text message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_echo_and_client_close_code() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let server = spawn_app(chat_app(tx)).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws_url("/chat/rust"))
        .await
        .unwrap();
    assert_eq!(next_text(&mut ws).await, "welcome to rust");

    ws.send(Message::Text("hello".into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "hello");

    ws.close(Some(CloseFrame {
        code: CloseCode::from(4000),
        reason: "done".into(),
    }))
    .await
    .unwrap();

    assert_eq!(next_close(&mut rx).await, (4000, Some("done".to_string())));
    server.stop().await;
}

#[tokio::test]
async fn test_close_without_payload_reports_1005() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let server = spawn_app(chat_app(tx)).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws_url("/chat/quiet"))
        .await
        .unwrap();
    next_text(&mut ws).await;
    ws.close(None).await.unwrap();

    assert_eq!(next_close(&mut rx).await, (1005, None));
    server.stop().await;
}

#[tokio::test]
async fn test_connection_loss_reports_1006() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let server = spawn_app(chat_app(tx)).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws_url("/chat/gone"))
        .await
        .unwrap();
    next_text(&mut ws).await;
    drop(ws);

    assert_eq!(next_close(&mut rx).await, (1006, None));
    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_closes_sessions_with_going_away() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let server = spawn_app(chat_app(tx)).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws_url("/chat/late"))
        .await
        .unwrap();
    next_text(&mut ws).await;

    let stopping = tokio::spawn(server.stop());

    match tokio::time::timeout(Duration::from_secs(5), ws.next()).await {
        Ok(Some(Ok(Message::Close(Some(frame))))) => {
            assert_eq!(u16::from(frame.code), 1001);
        }
        other => panic!("expected close frame, got {other:?}"),
    }
    // Drain so the closing handshake completes.
    while let Ok(Some(Ok(_))) = tokio::time::timeout(Duration::from_secs(5), ws.next()).await {}

    let (code, _) = next_close(&mut rx).await;
    assert_eq!(code, 1001);
    tokio::time::timeout(Duration::from_secs(5), stopping)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_plain_http_still_dispatched_next_to_websocket() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut app = chat_app(tx);
    app.get("/health", |ctx| {
        ctx.result("ok");
        Ok(())
    });
    let server = spawn_app(app).await;

    let body = reqwest::get(server.url("/health"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");
    server.stop().await;
}
