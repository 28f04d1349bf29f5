//! Decoder for the AWS `application/vnd.amazon.eventstream` framing used by
//! Bedrock streaming responses.
//!
//! Frame layout (big endian):
//! `total_len:u32 | headers_len:u32 | prelude_crc:u32 | headers | payload | message_crc:u32`.
//! CRCs are not verified.
use std::collections::HashMap;

use crate::errors::{DroidClawError, DroidClawResult};

const PRELUDE_LEN: usize = 12;
const TRAILER_LEN: usize = 4;
/// Refuse frames larger than this; Bedrock chunks are a few KiB.
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// String-valued headers (`:message-type`, `:event-type`, ...).
    pub headers: HashMap<String, String>,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn is_exception(&self) -> bool {
        matches!(self.header(":message-type"), Some("exception") | Some("error"))
    }
}

#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buf: Vec<u8>,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes and returns every frame completed so far.
    pub fn push(&mut self, bytes: &[u8]) -> DroidClawResult<Vec<Frame>> {
        self.buf.extend_from_slice(bytes);
        let mut frames = Vec::new();

        while self.buf.len() >= PRELUDE_LEN {
            let total_len = read_u32(&self.buf, 0) as usize;
            let headers_len = read_u32(&self.buf, 4) as usize;

            if total_len < PRELUDE_LEN + TRAILER_LEN + headers_len || total_len > MAX_FRAME_LEN {
                return Err(DroidClawError::EventStream(format!(
                    "invalid frame lengths: total={total_len} headers={headers_len}"
                )));
            }
            if self.buf.len() < total_len {
                break;
            }

            let frame_bytes: Vec<u8> = self.buf.drain(..total_len).collect();
            let headers_end = PRELUDE_LEN + headers_len;
            let headers = parse_headers(&frame_bytes[PRELUDE_LEN..headers_end])?;
            let payload = frame_bytes[headers_end..total_len - TRAILER_LEN].to_vec();
            frames.push(Frame { headers, payload });
        }

        Ok(frames)
    }

    /// True when a partial frame is still buffered.
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn parse_headers(mut raw: &[u8]) -> DroidClawResult<HashMap<String, String>> {
    let truncated = || DroidClawError::EventStream("truncated header block".into());
    let mut headers = HashMap::new();

    while !raw.is_empty() {
        let name_len = raw[0] as usize;
        raw = &raw[1..];
        if raw.len() < name_len + 1 {
            return Err(truncated());
        }
        let name = String::from_utf8_lossy(&raw[..name_len]).to_string();
        let value_type = raw[name_len];
        raw = &raw[name_len + 1..];

        let value_len = match value_type {
            0 | 1 => 0,
            2 => 1,
            3 => 2,
            4 => 4,
            5 | 8 => 8,
            9 => 16,
            6 | 7 => {
                if raw.len() < 2 {
                    return Err(truncated());
                }
                let len = u16::from_be_bytes([raw[0], raw[1]]) as usize;
                raw = &raw[2..];
                len
            }
            other => {
                return Err(DroidClawError::EventStream(format!(
                    "unknown header value type {other}"
                )))
            }
        };
        if raw.len() < value_len {
            return Err(truncated());
        }
        if value_type == 7 {
            headers.insert(name, String::from_utf8_lossy(&raw[..value_len]).to_string());
        }
        raw = &raw[value_len..];
    }

    Ok(headers)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a frame with string headers; CRC fields are zeroed.
    pub(crate) fn encode_frame(headers: &[(&str, &str)], payload: &[u8]) -> Vec<u8> {
        let mut hdr = Vec::new();
        for (name, value) in headers {
            hdr.push(name.len() as u8);
            hdr.extend_from_slice(name.as_bytes());
            hdr.push(7);
            hdr.extend_from_slice(&(value.len() as u16).to_be_bytes());
            hdr.extend_from_slice(value.as_bytes());
        }
        let total = PRELUDE_LEN + hdr.len() + payload.len() + TRAILER_LEN;
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&(total as u32).to_be_bytes());
        out.extend_from_slice(&(hdr.len() as u32).to_be_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&hdr);
        out.extend_from_slice(payload);
        out.extend_from_slice(&[0; 4]);
        out
    }

    #[test]
    fn decodes_frames_split_across_pushes() {
        let mut bytes = encode_frame(&[(":message-type", "event"), (":event-type", "chunk")], b"{\"a\":1}");
        bytes.extend(encode_frame(&[(":message-type", "event")], b"{\"b\":2}"));

        let mut dec = EventStreamDecoder::new();
        let first = dec.push(&bytes[..10]).unwrap();
        assert!(first.is_empty());
        let rest = dec.push(&bytes[10..]).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].header(":event-type"), Some("chunk"));
        assert_eq!(rest[0].payload, b"{\"a\":1}");
        assert_eq!(rest[1].payload, b"{\"b\":2}");
        assert!(!dec.has_pending());
    }

    #[test]
    fn skips_non_string_headers() {
        let mut hdr = vec![4u8];
        hdr.extend_from_slice(b"flag");
        hdr.push(0); // bool true, no value bytes
        hdr.push(3);
        hdr.extend_from_slice(b"num");
        hdr.push(4);
        hdr.extend_from_slice(&7u32.to_be_bytes());
        let headers = parse_headers(&hdr).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn exception_frames_are_flagged() {
        let bytes = encode_frame(&[(":message-type", "exception")], b"{\"message\":\"denied\"}");
        let frames = EventStreamDecoder::new().push(&bytes).unwrap();
        assert!(frames[0].is_exception());
    }

    #[test]
    fn rejects_impossible_lengths() {
        let mut bytes = vec![0, 0, 0, 8];
        bytes.extend_from_slice(&[0; 8]);
        assert!(EventStreamDecoder::new().push(&bytes).is_err());
    }
}
