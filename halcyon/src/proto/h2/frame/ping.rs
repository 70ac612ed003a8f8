use bytes::BufMut;

use crate::proto::h2::frame::{FrameError, Head, Kind, StreamId};

/// A PING frame: 8 opaque payload bytes, echoed back with the ACK flag.
#[derive(Debug, Eq, PartialEq)]
pub struct Ping {
    ack: bool,
    payload: [u8; 8],
}

const ACK_FLAG: u8 = 0x1;

impl Ping {
    pub fn new(payload: [u8; 8]) -> Ping {
        Ping {
            ack: false,
            payload,
        }
    }

    /// An ACK echoing `payload`.
    pub fn pong(payload: [u8; 8]) -> Ping {
        Ping { ack: true, payload }
    }

    pub fn is_ack(&self) -> bool {
        self.ack
    }

    pub fn payload(&self) -> &[u8; 8] {
        &self.payload
    }

    pub fn load(head: Head, bytes: &[u8]) -> Result<Ping, FrameError> {
        debug_assert_eq!(head.kind(), Kind::Ping);

        if !head.stream_id().is_zero() {
            return Err(FrameError::InvalidStreamId);
        }

        if bytes.len() != 8 {
            return Err(FrameError::InvalidPayloadLength);
        }

        let mut payload = [0; 8];
        payload.copy_from_slice(bytes);

        let ack = head.flag() & ACK_FLAG != 0;

        Ok(Ping { ack, payload })
    }

    pub fn encode<T: BufMut>(&self, dst: &mut T) {
        let flags = if self.ack { ACK_FLAG } else { 0 };
        let head = Head::new(Kind::Ping, flags, StreamId::zero());

        head.encode(8, dst);
        dst.put_slice(&self.payload);
    }
}
