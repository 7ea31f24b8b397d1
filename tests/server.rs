use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tokio::net::UdpSocket;

use syslog_ingest::server::{MetricsSnapshot, ServerConfig, ServerHandle, UdpServer};
use syslog_ingest::writer::{FileWriter, SinkError};
use syslog_ingest::{Message, Writer};

/// Holds every write until released.
#[derive(Default)]
struct GatedWriter {
    released: Mutex<bool>,
    gate: Condvar,
    messages: Mutex<Vec<Message>>,
}

impl GatedWriter {
    fn release(&self) {
        *self.released.lock() = true;
        self.gate.notify_all();
    }
}

impl Writer for GatedWriter {
    fn name(&self) -> &str {
        "gated"
    }

    fn write(&self, message: Message) -> Result<(), SinkError> {
        let mut released = self.released.lock();
        while !*released {
            self.gate.wait(&mut released);
        }
        drop(released);

        self.messages.lock().push(message);
        Ok(())
    }
}

fn loopback(workers: usize, queue_size: usize) -> ServerConfig {
    ServerConfig {
        address: "127.0.0.1".into(),
        port: 0,
        workers,
        queue_size,
        ..Default::default()
    }
}

async fn wait_for(handle: &ServerHandle, f: impl Fn(&MetricsSnapshot) -> bool) -> MetricsSnapshot {
    for _ in 0..500 {
        let snapshot = handle.metrics();
        if f(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached: {:?}", handle.metrics());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overload_accounting() {
    const SENT: u64 = 50;

    let writer = Arc::new(GatedWriter::default());
    let server = UdpServer::bind(&loopback(1, 1), writer.clone()).await.unwrap();
    let addr = server.local_addr();
    let handle = server.start();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for i in 0..SENT {
        let raw = format!("<34>1 - host app {i} ID{i} - message {i}");
        client.send_to(raw.as_bytes(), addr).await.unwrap();
    }

    // one datagram is stuck in the writer, at most one waits in the queue
    let snapshot = wait_for(&handle, |s| s.received == SENT).await;
    assert!(snapshot.dropped >= SENT - 2, "{snapshot:?}");

    writer.release();
    let snapshot = handle.stop().await;

    assert_eq!(snapshot.received, SENT);
    assert_eq!(snapshot.enqueued(), snapshot.processed());
    assert_eq!(
        snapshot.delivered + snapshot.parse_failures + snapshot.sink_failures + snapshot.dropped,
        snapshot.received
    );

    let messages = writer.messages.lock();
    assert_eq!(messages.len() as u64, snapshot.delivered);

    let unique: HashSet<_> = messages.iter().map(|m| m.msgid.clone()).collect();
    assert_eq!(unique.len(), messages.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_datagram_does_not_stop_ingestion() {
    let writer = Arc::new(GatedWriter::default());
    writer.release();

    let server = UdpServer::bind(&loopback(2, 16), writer.clone()).await.unwrap();
    let addr = server.local_addr();
    let handle = server.start();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(b"<999>1 - - - - - -", addr).await.unwrap();
    client.send_to(b"", addr).await.unwrap();
    client
        .send_to(b"<13>1 2019-02-13T19:48:34+00:00 74794bfb6795 root 8449 - - qwerty", addr)
        .await
        .unwrap();

    wait_for(&handle, |s| s.processed() == 3).await;
    let snapshot = handle.stop().await;

    assert_eq!(snapshot.parse_failures, 2);
    assert_eq!(snapshot.delivered, 1);
    assert_eq!(writer.messages.lock()[0].msg.as_deref(), Some("qwerty"));
}

#[tokio::test]
async fn delivers_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("syslog.log");
    let writer = Arc::new(FileWriter::open(&path).unwrap());

    let server = UdpServer::bind(&loopback(4, 64), writer).await.unwrap();
    let addr = server.local_addr();
    let handle = server.start();

    let line = r#"<165>1 2003-10-11T22:14:15.003Z mymachine.example.com evntslog - ID47 [exampleSDID@32473 iut="3"] An application event log entry"#;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(line.as_bytes(), addr).await.unwrap();

    wait_for(&handle, |s| s.delivered == 1).await;
    handle.stop().await;

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, format!("{line}\n"));
}

#[tokio::test]
async fn large_datagram_is_delivered_whole() {
    let writer = Arc::new(GatedWriter::default());
    writer.release();

    let server = UdpServer::bind(&loopback(2, 16), writer.clone()).await.unwrap();
    let addr = server.local_addr();
    let handle = server.start();

    let body = "x".repeat(3000);
    let raw = format!(r#"<34>1 2003-10-11T22:14:15.003Z host app - ID47 [origin ip="192.168.0.1"] {body}"#);
    assert!(raw.len() > 2048);

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(raw.as_bytes(), addr).await.unwrap();

    wait_for(&handle, |s| s.delivered == 1).await;
    let snapshot = handle.stop().await;
    assert_eq!(snapshot.parse_failures, 0);

    let messages = writer.messages.lock();
    assert_eq!(messages[0].msg.as_deref().map(str::len), Some(3000));
    assert_eq!(messages[0].to_string(), raw);
}

#[tokio::test]
async fn stop_without_traffic() {
    let writer = Arc::new(GatedWriter::default());
    let server = UdpServer::bind(&loopback(10, 10_000), writer).await.unwrap();

    let handle = server.start();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), handle.stop())
        .await
        .expect("stop should join every task");
    assert_eq!(snapshot, MetricsSnapshot::default());
}
