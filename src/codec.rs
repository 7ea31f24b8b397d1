//! Octet-counting (RFC 6587 section 3.4.1) decoder for syslog over TCP.
//!
//! Each frame is `"<len> <message>"`. The decoder buffers until a whole
//! frame is available, then hands exactly that frame to the scanner.
//!
//! A frame that does not parse is yielded as an `Err` item and skipped, so
//! the stream keeps going. Only a broken length prefix or an oversized frame
//! is returned from `decode` as an error, which ends a `FramedRead`.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::rfc5424::{parse_message, split_frame};
use crate::{Error, Message};

/// Largest frame accepted unless configured otherwise
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 65535;

#[derive(Debug, Clone)]
pub struct OctetCountingCodec {
    max_frame_length: usize,
}

impl OctetCountingCodec {
    pub fn new() -> Self {
        Self::with_max_frame_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    pub fn with_max_frame_length(max_frame_length: usize) -> Self {
        Self { max_frame_length }
    }

    pub fn max_frame_length(&self) -> usize {
        self.max_frame_length
    }
}

impl Default for OctetCountingCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for OctetCountingCodec {
    type Item = Result<Message, Error>;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let (frame, consumed) = match split_frame(src) {
            Ok(split) => split,
            Err(Error::IncompleteFrame { declared, .. }) => {
                if declared > self.max_frame_length {
                    return Err(Error::FrameTooLarge {
                        length: declared,
                        limit: self.max_frame_length,
                    });
                }

                // reserve the rest of the frame up front
                src.reserve(declared.saturating_sub(src.len()));
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        if frame.len() > self.max_frame_length {
            return Err(Error::FrameTooLarge {
                length: frame.len(),
                limit: self.max_frame_length,
            });
        }

        let result = parse_message(frame);
        src.advance(consumed);

        Ok(Some(result))
    }
}
