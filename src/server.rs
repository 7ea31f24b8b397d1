//! Syslog UDP server
//!
//! One receive loop reads datagrams off the socket and pushes owned copies
//! onto a bounded queue. A fixed pool of workers pulls from that queue,
//! parses each datagram and hands the message to a [`Writer`].
//!
//! The receive loop never waits on the queue: when it is full the datagram is
//! dropped and counted, and every [`DROP_LOG_INTERVAL`]th drop is logged.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use syslog_ingest::server::{ServerConfig, UdpServer};
//! use syslog_ingest::writer::StdoutWriter;
//!
//! # async fn run() -> Result<(), syslog_ingest::server::ServerError> {
//! let config = ServerConfig {
//!     address: "127.0.0.1".into(),
//!     port: 0,
//!     ..Default::default()
//! };
//!
//! let server = UdpServer::bind(&config, Arc::new(StdoutWriter::new())).await?;
//! println!("listening on {}", server.local_addr());
//!
//! let handle = server.start();
//! let metrics = handle.stop().await;
//! assert_eq!(metrics.received, metrics.enqueued() + metrics.dropped);
//! # Ok(())
//! # }
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::rfc5424::parse_message;
use crate::writer::Writer;

/// Default syslog port (privileged - may need root)
pub const DEFAULT_PORT: u16 = 514;

/// Default number of worker tasks
pub const DEFAULT_WORKERS: usize = 10;

/// Default queue capacity, in datagrams
pub const DEFAULT_QUEUE_SIZE: usize = 10_000;

/// Default receive buffer, large enough for any UDP payload
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 65_535;

/// A warning is logged once per this many dropped datagrams
pub const DROP_LOG_INTERVAL: u64 = 1000;

/// Syslog UDP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port, 0 picks an ephemeral one
    pub port: u16,

    /// Number of worker tasks
    pub workers: usize,

    /// Queue capacity between the receive loop and the workers
    pub queue_size: usize,

    /// Largest datagram read in full; longer ones are truncated by the OS
    pub recv_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            queue_size: DEFAULT_QUEUE_SIZE,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    /// Create config with custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Syslog UDP server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The bound socket could not report its address
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] io::Error),
}

/// Counters shared by the receive loop and the workers
#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Datagrams read off the socket
    pub received: AtomicU64,

    /// Datagrams discarded because the queue was full
    pub dropped: AtomicU64,

    /// Messages accepted by the writer
    pub delivered: AtomicU64,

    /// Datagrams that did not parse
    pub parse_failures: AtomicU64,

    /// Messages the writer rejected
    pub sink_failures: AtomicU64,

    /// Socket read errors
    pub recv_errors: AtomicU64,
}

impl ServerMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            recv_errors: AtomicU64::new(0),
        }
    }

    /// Record a datagram read, returning the running total
    #[inline]
    pub fn record_received(&self) -> u64 {
        self.received.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a dropped datagram, returning the running total
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_recv_error(&self) {
        self.recv_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            recv_errors: self.recv_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ServerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub parse_failures: u64,
    pub sink_failures: u64,
    pub recv_errors: u64,
}

impl MetricsSnapshot {
    /// Datagrams that made it onto the queue
    pub fn enqueued(&self) -> u64 {
        self.received.saturating_sub(self.dropped)
    }

    /// Datagrams a worker has finished with, whatever the outcome
    pub fn processed(&self) -> u64 {
        self.delivered + self.parse_failures + self.sink_failures
    }
}

/// A bound, not yet running, UDP server
pub struct UdpServer {
    config: ServerConfig,
    socket: UdpSocket,
    local_addr: SocketAddr,
    writer: Arc<dyn Writer>,
    metrics: Arc<ServerMetrics>,
}

impl UdpServer {
    /// Bind the socket. Nothing is read until [`UdpServer::start`].
    pub async fn bind(config: &ServerConfig, writer: Arc<dyn Writer>) -> Result<Self, ServerError> {
        let address = config.bind_address();
        let socket = UdpSocket::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = socket.local_addr().map_err(ServerError::LocalAddr)?;

        Ok(Self {
            config: config.clone(),
            socket,
            local_addr,
            writer,
            metrics: Arc::new(ServerMetrics::new()),
        })
    }

    /// The effective address, with the real port when bound to port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics(&self) -> &Arc<ServerMetrics> {
        &self.metrics
    }

    /// Spawn the workers and the receive loop
    pub fn start(self) -> ServerHandle {
        let workers = self.config.workers.max(1);
        let queue_size = self.config.queue_size.max(1);
        let cancel = CancellationToken::new();

        let (tx, rx) = mpsc::channel(queue_size);
        let rx = Arc::new(Mutex::new(rx));

        tracing::info!(
            address = %self.local_addr,
            destination = self.writer.name(),
            workers,
            queue_size,
            "udp: starting server"
        );

        let mut tasks = Vec::with_capacity(workers + 1);
        for id in 0..workers {
            let worker = Worker {
                id,
                queue: Arc::clone(&rx),
                writer: Arc::clone(&self.writer),
                metrics: Arc::clone(&self.metrics),
                cancel: cancel.clone(),
            };
            tasks.push(tokio::spawn(worker.run()));
        }

        let receiver = ReceiveLoop {
            socket: self.socket,
            queue: tx,
            buffer_size: self.config.recv_buffer_size.max(1),
            metrics: Arc::clone(&self.metrics),
            cancel: cancel.clone(),
        };
        tasks.push(tokio::spawn(receiver.run()));

        ServerHandle {
            local_addr: self.local_addr,
            cancel,
            tasks,
            metrics: self.metrics,
        }
    }
}

/// Handle to a running server
pub struct ServerHandle {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    metrics: Arc<ServerMetrics>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stop reading, let the workers drain the queue, and wait for every task.
    pub async fn stop(self) -> MetricsSnapshot {
        self.cancel.cancel();

        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "udp: server task failed");
            }
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            address = %self.local_addr,
            received = snapshot.received,
            dropped = snapshot.dropped,
            delivered = snapshot.delivered,
            parse_failures = snapshot.parse_failures,
            sink_failures = snapshot.sink_failures,
            "udp: server stopped"
        );
        snapshot
    }
}

struct ReceiveLoop {
    socket: UdpSocket,
    queue: mpsc::Sender<Bytes>,
    buffer_size: usize,
    metrics: Arc<ServerMetrics>,
    cancel: CancellationToken,
}

impl ReceiveLoop {
    async fn run(self) {
        let mut buf = vec![0u8; self.buffer_size];

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                result = self.socket.recv_from(&mut buf) => match result {
                    Ok((len, _peer)) => {
                        enqueue(&self.queue, &self.metrics, Bytes::copy_from_slice(&buf[..len]));
                    }
                    Err(e) => {
                        self.metrics.record_recv_error();
                        tracing::warn!(error = %e, "udp: could not read from socket");
                    }
                },
            }
        }

        // dropping the sender lets the workers see the end of the queue
        tracing::debug!("udp: receive loop stopped");
    }
}

/// Push one datagram without waiting; a full queue drops it.
pub(crate) fn enqueue(queue: &mpsc::Sender<Bytes>, metrics: &ServerMetrics, packet: Bytes) {
    let received = metrics.record_received();

    match queue.try_send(packet) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
            let dropped = metrics.record_dropped();
            if dropped % DROP_LOG_INTERVAL == 0 {
                let depth = queue.max_capacity() - queue.capacity();
                tracing::warn!(
                    dropped,
                    received,
                    queue_depth = depth,
                    "udp: unable to process {dropped}/{received} messages with {depth} in queue"
                );
            }
        }
    }
}

struct Worker {
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Bytes>>>,
    writer: Arc<dyn Writer>,
    metrics: Arc<ServerMetrics>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        tracing::debug!(worker_id = self.id, "udp: worker started");

        loop {
            let packet = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                packet = next_packet(&self.queue) => packet,
            };

            match packet {
                Some(packet) => self.process(&packet),
                None => break,
            }
        }

        // the queue closes once the receive loop is gone
        while let Some(packet) = next_packet(&self.queue).await {
            self.process(&packet);
        }

        tracing::debug!(worker_id = self.id, "udp: worker stopped");
    }

    fn process(&self, packet: &[u8]) {
        let message = match parse_message(trim_trailing_newline(packet)) {
            Ok(message) => message,
            Err(e) => {
                self.metrics.record_parse_failure();
                tracing::debug!(worker_id = self.id, error = %e, "udp: could not parse message");
                return;
            }
        };

        match self.writer.write(message) {
            Ok(()) => self.metrics.record_delivered(),
            Err(e) => {
                self.metrics.record_sink_failure();
                tracing::warn!(
                    worker_id = self.id,
                    destination = self.writer.name(),
                    error = %e,
                    "udp: could not write message"
                );
            }
        }
    }
}

async fn next_packet(queue: &Mutex<mpsc::Receiver<Bytes>>) -> Option<Bytes> {
    queue.lock().await.recv().await
}

/// Trim one trailing newline (LF or CRLF), which some clients append
#[inline]
pub(crate) fn trim_trailing_newline(data: &[u8]) -> &[u8] {
    match data.strip_suffix(b"\n") {
        Some(line) => line.strip_suffix(b"\r").unwrap_or(line),
        None => data,
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod server_test;
