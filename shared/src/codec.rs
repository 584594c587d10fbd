//! Length-prefixed codec for TCP framing
//!
//! All messages are framed as:
//! ```text
//! [ 4 bytes: length (u32, big-endian) ][ N bytes: JSON Envelope ]
//! ```
//!
//! This ensures message boundaries are preserved over TCP streams.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::Envelope;

/// Maximum message size (1 MiB)
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Message too large: {0} bytes (max: {MAX_MESSAGE_SIZE})")]
    MessageTooLarge(usize),

    #[error("Invalid message length prefix: {0}")]
    InvalidLength(u32),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode an Envelope into a length-prefixed byte buffer
pub fn encode(envelope: &Envelope) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::new();
    encode_into(envelope, &mut buf)?;
    Ok(buf.freeze())
}

/// Encode an Envelope directly into a provided buffer
pub fn encode_into(envelope: &Envelope, buf: &mut BytesMut) -> Result<(), CodecError> {
    let body = serde_json::to_vec(envelope)?;

    if body.len() > MAX_MESSAGE_SIZE as usize {
        return Err(CodecError::MessageTooLarge(body.len()));
    }

    buf.reserve(4 + body.len());
    buf.put_u32(body.len() as u32);
    buf.put_slice(&body);

    Ok(())
}

/// Try to decode a length-prefixed Envelope from a buffer
///
/// Returns:
/// - `Ok(Some(envelope))` if a complete message was decoded
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the data is invalid
pub fn decode(buf: &mut BytesMut) -> Result<Option<Envelope>, CodecError> {
    if buf.len() < 4 {
        return Ok(None);
    }

    // Peek at the length prefix without consuming
    let msg_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);

    if msg_len > MAX_MESSAGE_SIZE {
        return Err(CodecError::InvalidLength(msg_len));
    }

    let total_len = 4 + msg_len as usize;
    if buf.len() < total_len {
        return Ok(None);
    }

    buf.advance(4);
    let body = buf.split_to(msg_len as usize);

    let envelope = serde_json::from_slice(&body)?;
    Ok(Some(envelope))
}

/// Decoder state machine for streaming decoding
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Partial frame data being accumulated
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next frame from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)` to drain all complete frames
    pub fn decode_next(&mut self) -> Result<Option<Envelope>, CodecError> {
        decode(&mut self.buffer)
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Encoder for building frames
#[derive(Debug, Default)]
pub struct FrameEncoder {
    buffer: BytesMut,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Encode an envelope and add to the output buffer
    pub fn encode(&mut self, envelope: &Envelope) -> Result<(), CodecError> {
        encode_into(envelope, &mut self.buffer)
    }

    /// Take the encoded bytes, leaving an empty buffer
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Payload, Request};

    fn create_test_envelope(id: &str) -> Envelope {
        Envelope::request("console-1", 1, Request::GetRobot { id: id.into() })
    }

    #[test]
    fn test_length_prefix_matches_body() {
        let encoded = encode(&create_test_envelope("r-1")).expect("encode failed");
        let len_prefix = u32::from_be_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]);
        assert_eq!(len_prefix as usize, encoded.len() - 4);

        let mut buf = BytesMut::from(&encoded[..]);
        let decoded = decode(&mut buf).expect("decode failed").expect("no message");
        assert_eq!(decoded.header.sender_id, "console-1");
        assert!(buf.is_empty(), "buffer should be empty after decode");
    }

    #[test]
    fn test_partial_decode() {
        let encoded = encode(&create_test_envelope("r-1")).expect("encode failed");

        let mut buf = BytesMut::from(&encoded[..5]);
        let result = decode(&mut buf).expect("decode should not fail on partial data");
        assert!(result.is_none(), "should return None for partial data");

        // Buffer should be unchanged (data not consumed)
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn test_frame_decoder_across_reads() {
        let encoded = encode(&create_test_envelope("r-2")).expect("encode failed");
        let mut decoder = FrameDecoder::new();

        decoder.extend(&encoded[..3]);
        assert!(decoder.decode_next().expect("decode error").is_none());
        decoder.extend(&encoded[3..10]);
        assert!(decoder.decode_next().expect("decode error").is_none());
        decoder.extend(&encoded[10..]);

        let decoded = decoder
            .decode_next()
            .expect("decode error")
            .expect("should have message");
        assert_eq!(decoded.payload, Payload::Request(Request::GetRobot { id: "r-2".into() }));
        assert_eq!(decoder.buffer_len(), 0);
    }

    #[test]
    fn test_encoder_batches_frames() {
        let mut encoder = FrameEncoder::new();
        encoder.encode(&create_test_envelope("a")).expect("encode failed");
        encoder.encode(&create_test_envelope("b")).expect("encode failed");
        assert!(!encoder.is_empty());

        let mut decoder = FrameDecoder::new();
        decoder.extend(&encoder.take());
        assert!(encoder.is_empty());

        assert!(decoder.decode_next().expect("decode error").is_some());
        assert!(decoder.decode_next().expect("decode error").is_some());
        assert!(decoder.decode_next().expect("decode error").is_none());
    }

    #[test]
    fn test_oversize_prefix_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32(MAX_MESSAGE_SIZE + 1);
        buf.put_bytes(0, 100);

        let result = decode(&mut buf);
        assert!(matches!(result, Err(CodecError::InvalidLength(_))));
    }

    #[test]
    fn test_garbage_body_is_json_error() {
        let mut buf = BytesMut::new();
        buf.put_u32(4);
        buf.put_slice(b"nope");

        let result = decode(&mut buf);
        assert!(matches!(result, Err(CodecError::Json(_))));
        assert!(buf.is_empty(), "bad frame is consumed");
    }
}
