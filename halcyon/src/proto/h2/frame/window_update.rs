use bytes::BufMut;

use crate::proto::h2::frame::{FrameError, Head, Kind, StreamId};

const SIZE_INCREMENT_MASK: u32 = 1 << 31;

/// A WINDOW_UPDATE frame: replenishes the connection window (stream id
/// zero) or one stream's window.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct WindowUpdate {
    stream_id: StreamId,
    size_increment: u32,
}

impl WindowUpdate {
    pub fn new(stream_id: StreamId, size_increment: u32) -> WindowUpdate {
        WindowUpdate {
            stream_id,
            size_increment,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn size_increment(&self) -> u32 {
        self.size_increment
    }

    pub fn load(head: Head, payload: &[u8]) -> Result<WindowUpdate, FrameError> {
        debug_assert_eq!(head.kind(), Kind::WindowUpdate);

        if payload.len() != 4 {
            return Err(FrameError::InvalidPayloadLength);
        }

        // The top bit is reserved and masked off on read.
        let size_increment = unpack_octets_4!(payload, 0, u32) & !SIZE_INCREMENT_MASK;

        Ok(WindowUpdate {
            stream_id: head.stream_id(),
            size_increment,
        })
    }

    pub fn encode<T: BufMut>(&self, dst: &mut T) {
        let head = Head::new(Kind::WindowUpdate, 0, self.stream_id);
        head.encode(4, dst);
        dst.put_u32(self.size_increment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_load() {
        let frame = WindowUpdate::new(StreamId::zero(), 1024);
        let mut buf = Vec::new();
        frame.encode(&mut buf);

        let loaded = WindowUpdate::load(Head::parse(&buf), &buf[9..]).unwrap();
        assert_eq!(loaded, frame);
    }

    #[test]
    fn reserved_bit_is_masked() {
        let head = Head::new(Kind::WindowUpdate, 0, StreamId::from(1));
        let loaded = WindowUpdate::load(head, &[0x80, 0x00, 0x00, 0x40]).unwrap();
        assert_eq!(loaded.size_increment(), 64);
    }
}
