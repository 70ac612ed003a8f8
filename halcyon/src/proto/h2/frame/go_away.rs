use std::fmt;

use bytes::{BufMut, Bytes};

use crate::proto::h2::frame::{FrameError, Head, Kind, Reason, StreamId};

/// A GOAWAY frame: the peer is terminating the connection.
#[derive(Clone, Eq, PartialEq)]
pub struct GoAway {
    last_stream_id: StreamId,
    error_code: Reason,
    debug_data: Bytes,
}

impl GoAway {
    pub fn new(last_stream_id: StreamId, reason: Reason) -> Self {
        GoAway {
            last_stream_id,
            error_code: reason,
            debug_data: Bytes::new(),
        }
    }

    pub fn last_stream_id(&self) -> StreamId {
        self.last_stream_id
    }

    pub fn reason(&self) -> Reason {
        self.error_code
    }

    pub fn debug_data(&self) -> &Bytes {
        &self.debug_data
    }

    pub fn load(payload: Bytes) -> Result<GoAway, FrameError> {
        if payload.len() < 8 {
            return Err(FrameError::BadFrameSize);
        }

        let (last_stream_id, _) = StreamId::parse(&payload[..4]);
        let error_code = unpack_octets_4!(payload, 4, u32);
        let debug_data = payload.slice(8..);

        Ok(GoAway {
            last_stream_id,
            error_code: error_code.into(),
            debug_data,
        })
    }

    pub fn encode<T: BufMut>(&self, dst: &mut T) {
        let head = Head::new(Kind::GoAway, 0, StreamId::zero());
        head.encode(8 + self.debug_data.len(), dst);
        self.last_stream_id.encode(dst);
        dst.put_u32(self.error_code.into());
        dst.put_slice(&self.debug_data);
    }
}

impl fmt::Debug for GoAway {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = fmt.debug_struct("GoAway");
        builder.field("error_code", &self.error_code);
        builder.field("last_stream_id", &self.last_stream_id);
        if !self.debug_data.is_empty() {
            builder.field("debug_data", &self.debug_data);
        }
        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_load() {
        let frame = GoAway::new(StreamId::from(3), Reason::ENHANCE_YOUR_CALM);
        let mut buf = Vec::new();
        frame.encode(&mut buf);

        let loaded = GoAway::load(Bytes::copy_from_slice(&buf[9..])).unwrap();
        assert_eq!(loaded.last_stream_id(), StreamId::from(3));
        assert_eq!(loaded.reason(), Reason::ENHANCE_YOUR_CALM);
    }

    #[test]
    fn short_payload_is_rejected() {
        assert_eq!(
            GoAway::load(Bytes::from_static(&[0; 7])).unwrap_err(),
            FrameError::BadFrameSize
        );
    }
}
