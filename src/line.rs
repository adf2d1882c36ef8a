//! Line-based codec for tokio.
//!
//! This module provides a codec that reads and writes CR/LF-terminated IRC
//! lines, with optional encoding support. Decoded lines have their line
//! terminator stripped; encoded lines get `\r\n` appended.
//!
//! There is no maximum line length at this layer. A last line cut short by
//! end of stream is still returned.

#[cfg(feature = "encoding")]
use std::borrow::Cow;

use bytes::BytesMut;
#[cfg(feature = "encoding")]
use encoding::Encoding;
use tokio_util::codec::{Decoder, Encoder};

use crate::error;

/// Line-based codec that handles newline-terminated messages.
pub struct LineCodec {
    #[cfg(feature = "encoding")]
    encoding: &'static Encoding,
    /// Index of next byte to check for newline
    next_index: usize,
}

impl LineCodec {
    /// Create a new codec with the specified encoding.
    ///
    /// Without the `encoding` feature the label is ignored and lines are
    /// decoded as UTF-8, replacing invalid sequences.
    ///
    /// # Arguments
    /// * `label` - Encoding label (e.g., "utf-8")
    pub fn new(_label: &str) -> error::Result<Self> {
        Ok(Self {
            #[cfg(feature = "encoding")]
            encoding: match Encoding::for_label(_label.as_bytes()) {
                Some(enc) => enc,
                None => {
                    return Err(error::ProtocolError::UnknownEncoding(_label.to_string()));
                }
            },
            next_index: 0,
        })
    }

    /// Cut outgoing data down to a single line.
    ///
    /// Everything from the first CR or LF onwards is dropped.
    pub fn sanitize(mut data: String) -> String {
        if let Some(pos) = data.find(['\r', '\n']) {
            data.truncate(pos);
        }
        data
    }

    fn strip_terminator(line: &[u8]) -> &[u8] {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        line.strip_suffix(b"\r").unwrap_or(line)
    }

    #[cfg(feature = "encoding")]
    fn decode_body(&self, body: &[u8]) -> String {
        let (cow, _enc, _had_errors) = self.encoding.decode(body);
        cow.into_owned()
    }

    #[cfg(not(feature = "encoding"))]
    fn decode_body(&self, body: &[u8]) -> String {
        String::from_utf8_lossy(body).into_owned()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        // Look for newline starting from where we left off
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;
            Ok(Some(self.decode_body(Self::strip_terminator(&line))))
        } else {
            // No complete line yet - remember where we stopped
            self.next_index = src.len();
            Ok(None)
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }

        // The peer hung up mid-line: the fragment is still its last line.
        let rest = src.split();
        Ok(Some(self.decode_body(Self::strip_terminator(&rest))))
    }
}

impl Encoder<String> for LineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        let msg = Self::sanitize(msg);

        #[cfg(feature = "encoding")]
        {
            let (cow_bytes, _enc, _had_errors) = self.encoding.encode(&msg);
            match cow_bytes {
                Cow::Borrowed(b) => dst.extend_from_slice(b),
                Cow::Owned(v) => dst.extend_from_slice(&v),
            }
        }

        #[cfg(not(feature = "encoding"))]
        {
            dst.extend_from_slice(msg.as_bytes());
        }

        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
