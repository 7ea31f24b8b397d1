//! Destinations for decoded messages.
//!
//! Workers call [`Writer::write`] concurrently, so every implementation
//! serializes internally where it needs to.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::config::DestinationConfig;
use crate::Message;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Consumer of decoded messages.
pub trait Writer: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    fn write(&self, message: Message) -> Result<(), SinkError>;
}

/// Appends each message, rendered to wire text, as one line of a file.
pub struct FileWriter {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl FileWriter {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Writer for FileWriter {
    fn name(&self) -> &str {
        "file"
    }

    fn write(&self, message: Message) -> Result<(), SinkError> {
        let mut file = self.file.lock();
        writeln!(file, "{message}")?;
        file.flush()?;
        Ok(())
    }
}

/// Prints each message to stdout. Meant for debugging.
#[derive(Debug, Default)]
pub struct StdoutWriter;

impl StdoutWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Writer for StdoutWriter {
    fn name(&self) -> &str {
        "stdout"
    }

    fn write(&self, message: Message) -> Result<(), SinkError> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{message}")?;
        Ok(())
    }
}

/// Builds the writer a destination describes.
pub fn build_writer(config: &DestinationConfig) -> Result<Arc<dyn Writer>, SinkError> {
    let writer: Arc<dyn Writer> = match config {
        DestinationConfig::File { path } => Arc::new(FileWriter::open(path)?),
        DestinationConfig::Stdout => Arc::new(StdoutWriter::new()),
    };

    tracing::debug!(destination = writer.name(), "writer created");
    Ok(writer)
}
