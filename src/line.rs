//! Line framing codec for tokio.
//!
//! [`LineCodec`] frames the byte stream into terminator-stripped lines.
//! Inbound lines are delimited by `\n` with an optional preceding `\r` (the
//! protocol mandates CRLF; bare LF from non-IRC transports is tolerated) and
//! bounded to [`MAX_LINE_LEN`] bytes including the terminator. A line that is
//! nothing but its terminator is a recoverable framing anomaly: the decoder
//! consumes and skips it instead of producing an empty event or slicing out
//! of bounds. Outbound lines get CRLF appended; embedded NUL/CR/LF are
//! rejected before they can split the frame.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{Error, Result};

/// Protocol-standard maximum frame length in bytes, terminator included.
pub const MAX_LINE_LEN: usize = 512;

/// Rejects lines carrying bytes that would split or truncate a frame.
///
/// Shared by the encoder and the enqueue path, so a bad line surfaces as an
/// error to its caller instead of tearing down the write loop.
pub(crate) fn check_line(line: &str) -> Result<()> {
    if let Some(ch) = line.chars().find(|ch| matches!(ch, '\0' | '\r' | '\n')) {
        return Err(Error::IllegalControlChar(ch));
    }
    Ok(())
}

/// Codec converting between the byte stream and terminator-stripped lines.
pub struct LineCodec {
    /// Index of the next byte to check for a line ending.
    next_index: usize,
    /// Maximum line length.
    max_len: usize,
}

impl LineCodec {
    /// Creates a codec with the standard [`MAX_LINE_LEN`] bound.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_len: MAX_LINE_LEN,
        }
    }

    /// Creates a codec with a custom line-length bound, for servers known to
    /// exceed the standard frame size.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                // No complete line yet; remember where the scan stopped.
                self.next_index = src.len();
                if src.len() > self.max_len {
                    return Err(Error::LineTooLong {
                        length: src.len(),
                        limit: self.max_len,
                    });
                }
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(Error::LineTooLong {
                    length: line.len(),
                    limit: self.max_len,
                });
            }

            // Strip the terminator: the `\n`, then an optional `\r`.
            let mut end = line.len() - 1;
            if end > 0 && line[end - 1] == b'\r' {
                end -= 1;
            }
            if end == 0 {
                // The line was only its terminator; skip and keep scanning.
                continue;
            }

            return Ok(Some(String::from_utf8(line[..end].to_vec())?));
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = Error;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<()> {
        check_line(&line)?;
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
