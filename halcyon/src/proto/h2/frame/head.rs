use bytes::BufMut;

use crate::proto::h2::frame::{StreamId, HEADER_LEN};

/// The fixed 9-byte frame header.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Head {
    kind: Kind,
    flag: u8,
    stream_id: StreamId,
}

/// Known frame kinds plus an explicit escape for codes this client does not
/// model. Unknown kinds are ignored on receipt, never an error.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Kind {
    Data,
    Headers,
    Priority,
    Reset,
    Settings,
    PushPromise,
    Ping,
    GoAway,
    WindowUpdate,
    Continuation,
    Unknown(u8),
}

impl Kind {
    pub fn new(byte: u8) -> Kind {
        match byte {
            0 => Kind::Data,
            1 => Kind::Headers,
            2 => Kind::Priority,
            3 => Kind::Reset,
            4 => Kind::Settings,
            5 => Kind::PushPromise,
            6 => Kind::Ping,
            7 => Kind::GoAway,
            8 => Kind::WindowUpdate,
            9 => Kind::Continuation,
            other => Kind::Unknown(other),
        }
    }

    pub fn as_byte(&self) -> u8 {
        match *self {
            Kind::Data => 0,
            Kind::Headers => 1,
            Kind::Priority => 2,
            Kind::Reset => 3,
            Kind::Settings => 4,
            Kind::PushPromise => 5,
            Kind::Ping => 6,
            Kind::GoAway => 7,
            Kind::WindowUpdate => 8,
            Kind::Continuation => 9,
            Kind::Unknown(other) => other,
        }
    }
}

impl Head {
    pub fn new(kind: Kind, flag: u8, stream_id: StreamId) -> Head {
        Head {
            kind,
            flag,
            stream_id,
        }
    }

    /// Parse the 9-byte header; the stream id's reserved bit is cleared.
    pub fn parse(header: &[u8]) -> Head {
        debug_assert!(header.len() >= HEADER_LEN);

        let (stream_id, _) = StreamId::parse(&header[5..]);

        Head {
            kind: Kind::new(header[3]),
            flag: header[4],
            stream_id,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn flag(&self) -> u8 {
        self.flag
    }

    pub fn encode<T: BufMut>(&self, payload_len: usize, dst: &mut T) {
        debug_assert!(payload_len < 1 << 24);

        dst.put_uint(payload_len as u64, 3);
        dst.put_u8(self.kind.as_byte());
        dst.put_u8(self.flag);
        self.stream_id.encode(dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_round_trip() {
        let head = Head::new(Kind::Settings, 0x1, StreamId::zero());
        let mut buf = Vec::new();
        head.encode(0, &mut buf);
        assert_eq!(buf.len(), HEADER_LEN);
        assert_eq!(Head::parse(&buf), head);
    }

    #[test]
    fn parse_clears_reserved_stream_bit() {
        let buf = [0x00, 0x00, 0x04, 0x00, 0x01, 0x80, 0x00, 0x00, 0x07];
        let head = Head::parse(&buf);
        assert_eq!(head.kind(), Kind::Data);
        assert_eq!(head.flag(), 0x01);
        assert_eq!(head.stream_id(), StreamId::from(7));
    }

    #[test]
    fn unknown_kind_keeps_raw_code() {
        let kind = Kind::new(0xfa);
        assert_eq!(kind, Kind::Unknown(0xfa));
        assert_eq!(kind.as_byte(), 0xfa);
    }
}
