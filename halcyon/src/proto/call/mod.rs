//! Call framing: one request/response exchange per stream.
//!
//! A request goes out as one HEADERS frame followed by DATA frames whose
//! combined payload is a single length-prefixed message: a one-byte
//! compression flag (always "not compressed"), a 4-byte big-endian length,
//! and that many protobuf-encoded bytes. The response is reassembled from
//! DATA frames on the same stream until the peer half-closes it.

use std::io::{Read, Write};
use std::time::Instant;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::proto::h2::hpack::HeaderEntry;
use crate::proto::h2::{Connection, H2Error, Reason, StreamId};

pub const COMPRESSION_NONE: u8 = 0;

/// Compression flag + 4-byte length.
pub const MESSAGE_PREFIX_LEN: usize = 5;

const CONTENT_TYPE: &str = "application/grpc+proto";

#[derive(Debug, Error)]
pub enum CallError {
    /// The stream closed with a body that does not match its declared
    /// length prefix.
    #[error("message declared {declared} bytes but the stream delivered {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// The peer flagged the response as compressed, which this client never
    /// negotiates.
    #[error("unsupported compression flag {0}")]
    UnsupportedCompression(u8),

    /// The attempt deadline elapsed before a complete response arrived.
    #[error("attempt deadline exceeded")]
    Timeout,

    /// The peer reset the call's stream.
    #[error("stream reset by peer: {0}")]
    StreamReset(Reason),

    #[error(transparent)]
    H2(#[from] H2Error),
}

/// Send `payload` as a new call on a freshly allocated stream; returns the
/// stream id to await on.
pub fn send_request<S: Read + Write>(
    conn: &mut Connection<S>,
    path: &str,
    authority: &str,
    payload: &[u8],
) -> Result<StreamId, CallError> {
    let id = conn.open_stream()?;

    let headers = vec![
        HeaderEntry::new(":method", "POST"),
        HeaderEntry::new(":scheme", "http"),
        HeaderEntry::new(":path", path.to_owned()),
        HeaderEntry::new(":authority", authority.to_owned()),
        HeaderEntry::new("content-type", CONTENT_TYPE),
        HeaderEntry::new("te", "trailers"),
    ];
    conn.send_headers(id, headers, false)?;
    conn.send_data(id, wrap_message(payload), true)?;

    Ok(id)
}

/// Read frames until stream `id` holds a complete response message or the
/// deadline passes. A body shorter than its declared length stays pending
/// while the stream is open; it only becomes an error once the peer
/// half-closes.
pub fn await_response<S: Read + Write>(
    conn: &mut Connection<S>,
    id: StreamId,
    deadline: Instant,
) -> Result<Bytes, CallError> {
    loop {
        {
            let stream = match conn.stream(id) {
                Some(stream) => stream,
                None => {
                    return Err(CallError::H2(H2Error::Protocol(format!(
                        "awaiting response on unknown stream {:?}",
                        id
                    ))))
                }
            };

            if let Some(reason) = stream.reset_reason() {
                conn.take_stream(id);
                return Err(CallError::StreamReset(reason));
            }

            if stream.is_recv_closed() {
                let stream = conn.take_stream(id).expect("stream checked above");
                return unwrap_message(stream.body());
            }
        }

        if Instant::now() >= deadline {
            // Release the stream rather than leak it in the table.
            conn.send_reset(id, Reason::CANCEL)?;
            return Err(CallError::Timeout);
        }

        conn.read_and_dispatch()?;
    }
}

/// Abandon a call before its outcome: reset the stream and drop it.
pub fn cancel<S: Read + Write>(conn: &mut Connection<S>, id: StreamId) -> Result<(), CallError> {
    conn.send_reset(id, Reason::CANCEL)?;
    Ok(())
}

/// Strip the length prefix from a fully buffered message body.
fn unwrap_message(body: &[u8]) -> Result<Bytes, CallError> {
    if body.len() < MESSAGE_PREFIX_LEN {
        return Err(CallError::LengthMismatch {
            declared: MESSAGE_PREFIX_LEN,
            actual: body.len(),
        });
    }

    if body[0] != COMPRESSION_NONE {
        return Err(CallError::UnsupportedCompression(body[0]));
    }

    let declared = u32::from_be_bytes([body[1], body[2], body[3], body[4]]) as usize;
    let actual = body.len() - MESSAGE_PREFIX_LEN;
    if declared != actual {
        return Err(CallError::LengthMismatch { declared, actual });
    }

    Ok(Bytes::copy_from_slice(&body[MESSAGE_PREFIX_LEN..]))
}

/// Frame `payload` as a length-prefixed message.
pub fn wrap_message(payload: &[u8]) -> Bytes {
    let mut message = BytesMut::with_capacity(MESSAGE_PREFIX_LEN + payload.len());
    message.put_u8(COMPRESSION_NONE);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_rejects_length_mismatch() {
        let mut body = Vec::new();
        body.put_u8(COMPRESSION_NONE);
        body.put_u32(10);
        body.extend_from_slice(&[0u8; 4]);

        match unwrap_message(&body).unwrap_err() {
            CallError::LengthMismatch { declared, actual } => {
                assert_eq!(declared, 10);
                assert_eq!(actual, 4);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn unwrap_rejects_compressed_flag() {
        let body = [1u8, 0, 0, 0, 0];
        match unwrap_message(&body).unwrap_err() {
            CallError::UnsupportedCompression(1) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn wrap_then_unwrap() {
        let message = wrap_message(b"response");
        assert_eq!(message[0], COMPRESSION_NONE);
        assert_eq!(&unwrap_message(&message).unwrap()[..], b"response");
    }
}
