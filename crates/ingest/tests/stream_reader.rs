//! End-to-end tests for `StreamReader` against a local WebSocket server.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use vitals_ingest::{BackoffPolicy, ConnectionState, IngestError, ReaderConfig, StreamReader};
use vitals_store::DataStore;

const T0: i64 = 1_609_459_200_000;

/// Serve one connection: send `lines`, close normally, then drain.
async fn serve_once(lines: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(tcp)
            .await
            .expect("handshake");
        for line in lines {
            ws.send(Message::Text(line)).await.expect("send");
        }
        ws.close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "done".into(),
        }))
        .await
        .expect("close");
        while let Some(Ok(_)) = ws.next().await {}
    });

    format!("ws://{addr}")
}

/// Poll `check` until it holds or two seconds pass.
async fn wait_for<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[tokio::test]
async fn streams_into_store_and_reconnects_after_server_close() {
    let url = serve_once(vec![
        format!("1,{T0},HeartRate,72"),
        format!("1,{},OxygenLevel,97", T0 + 1000),
        "one,two".to_string(),
        format!("2,{T0},SystolicBloodPressure,130"),
    ])
    .await;

    let store = Arc::new(DataStore::new());
    let reader = StreamReader::new(ReaderConfig::new(url));
    reader
        .start_reading(Arc::clone(&store))
        .await
        .expect("server is listening");

    let reconnecting = wait_for(|| {
        let reader = reader.clone();
        async move { reader.state() == ConnectionState::Reconnecting }
    })
    .await;
    assert!(reconnecting, "state was {}", reader.state());

    assert_eq!(store.patient_count(), 2);
    assert_eq!(store.get_records(1, T0, T0 + 1000).len(), 2);

    let stats = reader.statistics();
    assert_eq!(stats.received, 4);
    assert_eq!(stats.processed, 3);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.reconnect_attempts, 1);

    reader.stop_reading().await;
    assert_eq!(reader.state(), ConnectionState::Stopped);
}

#[tokio::test]
async fn refused_connection_is_returned_and_retried() {
    // Bind and drop to find a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let reader = StreamReader::new(ReaderConfig::new(format!("ws://{addr}")));
    let result = reader.start_reading(Arc::new(DataStore::new())).await;

    assert_matches!(result, Err(IngestError::Connect(_)));
    assert_eq!(reader.state(), ConnectionState::Reconnecting);
    assert_eq!(reader.reconnect_attempts(), 1);

    reader.stop_reading().await;
    assert_eq!(reader.state(), ConnectionState::Stopped);
}

#[tokio::test]
async fn stop_during_session_closes_without_reconnecting() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        ws.send(Message::Text(format!("3,{T0},ECG,0.4"))).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let store = Arc::new(DataStore::new());
    let reader = StreamReader::new(ReaderConfig::new(format!("ws://{addr}")));
    reader.start_reading(Arc::clone(&store)).await.unwrap();

    let received = wait_for(|| {
        let store = Arc::clone(&store);
        async move { store.has_patient(3) }
    })
    .await;
    assert!(received);

    reader.stop_reading().await;

    assert_eq!(reader.state(), ConnectionState::Stopped);
    assert_eq!(reader.reconnect_attempts(), 0);
}

// ---------------------------------------------------------------------------
// Reconnection
// ---------------------------------------------------------------------------

fn fast_backoff(url: String, max_attempts: u32) -> ReaderConfig {
    ReaderConfig {
        backoff: BackoffPolicy {
            base_delay: Duration::from_millis(50),
            max_attempts,
        },
        ..ReaderConfig::new(url)
    }
}

#[tokio::test]
async fn reconnects_after_close_and_resets_attempts() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // First session: one reading, then a normal close.
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        ws.send(Message::Text(format!("1,{T0},HeartRate,72")))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}

        // Second session stays open.
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        ws.send(Message::Text(format!("2,{T0},OxygenLevel,95")))
            .await
            .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let store = Arc::new(DataStore::new());
    let reader = StreamReader::new(fast_backoff(format!("ws://{addr}"), 5));
    reader.start_reading(Arc::clone(&store)).await.unwrap();

    let reconnected = wait_for(|| {
        let reader = reader.clone();
        let store = Arc::clone(&store);
        async move { reader.state() == ConnectionState::Connected && store.patient_count() == 2 }
    })
    .await;
    assert!(reconnected, "state was {}", reader.state());
    assert_eq!(reader.reconnect_attempts(), 0);
    assert_eq!(reader.statistics().processed, 2);

    reader.stop_reading().await;
    assert_eq!(reader.state(), ConnectionState::Stopped);
}

#[tokio::test]
async fn gives_up_when_every_attempt_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    // Delays of 50, 100 and 200 ms before giving up.
    let reader = StreamReader::new(fast_backoff(format!("ws://{addr}"), 3));
    let result = reader.start_reading(Arc::new(DataStore::new())).await;
    assert_matches!(result, Err(IngestError::Connect(_)));

    let gave_up = wait_for(|| {
        let reader = reader.clone();
        async move { reader.state() == ConnectionState::GaveUp }
    })
    .await;
    assert!(gave_up, "state was {}", reader.state());
    assert_eq!(reader.reconnect_attempts(), 3);

    reader.stop_reading().await;
    // Stopping after giving up still records the stop.
    assert_eq!(reader.state(), ConnectionState::Stopped);
}
