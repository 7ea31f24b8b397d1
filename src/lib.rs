//! Ingestion of [RFC 5424](https://tools.ietf.org/html/rfc5424) Syslog messages. Not to be confused
//! with the older [RFC 3164](https://tools.ietf.org/html/rfc3164) BSD Syslog protocol, which many
//! systems still emit.
//!
//! The crate has two halves:
//!
//!  * a bounds-checked scanner, [`parse`], turning a datagram or an octet-counted stream frame
//!    into an owned [`Message`] plus the number of bytes it consumed, and
//!  * a UDP [`server`] that queues datagrams under backpressure and fans them out to a fixed
//!    pool of workers, which parse them and hand them to a [`Writer`].
//!
//! # Example
//!
//! A minimal syslog server
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use syslog_ingest::server::{ServerConfig, UdpServer};
//! use syslog_ingest::writer::StdoutWriter;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::with_port(10514);
//! let server = UdpServer::bind(&config, Arc::new(StdoutWriter::new())).await?;
//! let handle = server.start();
//!
//! tokio::signal::ctrl_c().await?;
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Unimplemented Features
//!
//!  * Theoretically, you can send arbitrary (non-unicode) bytes for the message part of a syslog
//!    message. Rust doesn't have a convenient way to only treat *some* of a buffer as utf-8,
//!    so that is not supported, and neither is the BOM marker.
//!

pub mod codec;
pub mod config;
mod error;
mod facility;
mod message;
mod procid;
pub mod rfc5424;
pub mod server;
mod severity;
mod structured_data;
mod timestamp;
pub mod writer;

pub use error::Error;
pub use facility::Facility;
pub use message::Message;
pub use procid::ProcId;
pub use rfc5424::{parse, parse_message};
pub use severity::Severity;
pub use structured_data::StructuredElement;
pub use timestamp::parse_timestamp;
pub use writer::Writer;
