use bytes::BufMut;

use crate::proto::h2::frame::{FrameError, Head, Kind, Reason, StreamId};

/// A RST_STREAM frame: forces the named stream to closed.
#[derive(Debug, Eq, PartialEq)]
pub struct Reset {
    stream_id: StreamId,
    error_code: Reason,
}

impl Reset {
    pub fn new(stream_id: StreamId, error: Reason) -> Reset {
        Reset {
            stream_id,
            error_code: error,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn reason(&self) -> Reason {
        self.error_code
    }

    pub fn load(head: Head, payload: &[u8]) -> Result<Reset, FrameError> {
        if payload.len() != 4 {
            return Err(FrameError::InvalidPayloadLength);
        }

        if head.stream_id().is_zero() {
            return Err(FrameError::InvalidStreamId);
        }

        let error_code = unpack_octets_4!(payload, 0, u32);

        Ok(Reset {
            stream_id: head.stream_id(),
            error_code: error_code.into(),
        })
    }

    pub fn encode<T: BufMut>(&self, dst: &mut T) {
        let head = Head::new(Kind::Reset, 0, self.stream_id);
        head.encode(4, dst);
        dst.put_u32(self.error_code.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_load() {
        let frame = Reset::new(StreamId::from(5), Reason::CANCEL);
        let mut buf = Vec::new();
        frame.encode(&mut buf);

        let loaded = Reset::load(Head::parse(&buf), &buf[9..]).unwrap();
        assert_eq!(loaded.stream_id(), StreamId::from(5));
        assert_eq!(loaded.reason(), Reason::CANCEL);
    }
}
