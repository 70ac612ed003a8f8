use std::fmt;

use bytes::{BufMut, Bytes};

use crate::proto::h2::frame::{util, FrameError, Head, Kind, StreamId};

/// A DATA frame carrying a chunk of a call payload.
#[derive(Eq, PartialEq)]
pub struct Data {
    stream_id: StreamId,
    data: Bytes,
    flags: DataFlags,
    pad_len: Option<u8>,
}

#[derive(Copy, Clone, Eq, PartialEq)]
struct DataFlags(u8);

const END_STREAM: u8 = 0x1;
const PADDED: u8 = 0x8;
const ALL: u8 = END_STREAM | PADDED;

impl Data {
    pub fn new(stream_id: StreamId, payload: Bytes) -> Self {
        assert!(!stream_id.is_zero());

        Data {
            stream_id,
            data: payload,
            flags: DataFlags::default(),
            pad_len: None,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags.is_end_stream()
    }

    pub fn set_end_stream(&mut self, val: bool) {
        if val {
            self.flags.set_end_stream();
        } else {
            self.flags.unset_end_stream();
        }
    }

    pub fn payload(&self) -> &Bytes {
        &self.data
    }

    pub fn into_payload(self) -> Bytes {
        self.data
    }

    pub fn load(head: Head, mut payload: Bytes) -> Result<Self, FrameError> {
        let flags = DataFlags::load(head.flag());

        if head.stream_id().is_zero() {
            return Err(FrameError::InvalidStreamId);
        }

        let pad_len = if flags.is_padded() {
            let len = util::strip_padding(&mut payload)?;
            Some(len)
        } else {
            None
        };

        Ok(Data {
            stream_id: head.stream_id(),
            data: payload,
            flags,
            pad_len,
        })
    }

    pub(crate) fn head(&self) -> Head {
        Head::new(Kind::Data, self.flags.into(), self.stream_id)
    }

    pub fn encode<T: BufMut>(&self, dst: &mut T) {
        self.head().encode(self.data.len(), dst);
        dst.put_slice(&self.data);
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let mut f = fmt.debug_struct("Data");
        f.field("stream_id", &self.stream_id);
        if !self.flags.is_empty() {
            f.field("flags", &self.flags);
        }
        if let Some(ref pad_len) = self.pad_len {
            f.field("pad_len", pad_len);
        }
        f.finish()
    }
}

impl DataFlags {
    fn load(bits: u8) -> DataFlags {
        DataFlags(bits & ALL)
    }

    fn is_empty(&self) -> bool {
        self.0 == 0
    }

    fn is_end_stream(&self) -> bool {
        self.0 & END_STREAM == END_STREAM
    }

    fn set_end_stream(&mut self) {
        self.0 |= END_STREAM
    }

    fn unset_end_stream(&mut self) {
        self.0 &= !END_STREAM
    }

    fn is_padded(&self) -> bool {
        self.0 & PADDED == PADDED
    }
}

impl Default for DataFlags {
    fn default() -> Self {
        DataFlags(0)
    }
}

impl From<DataFlags> for u8 {
    fn from(src: DataFlags) -> u8 {
        src.0
    }
}

impl fmt::Debug for DataFlags {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        util::debug_flags(fmt, self.0)
            .flag_if(self.is_end_stream(), "END_STREAM")
            .flag_if(self.is_padded(), "PADDED")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_load() {
        let mut frame = Data::new(StreamId::from(1), Bytes::from_static(b"payload"));
        frame.set_end_stream(true);

        let mut buf = Vec::new();
        frame.encode(&mut buf);

        let head = Head::parse(&buf);
        let loaded = Data::load(head, Bytes::copy_from_slice(&buf[9..])).unwrap();
        assert!(loaded.is_end_stream());
        assert_eq!(&loaded.payload()[..], b"payload");
    }

    #[test]
    fn padded_payload_is_stripped() {
        let head = Head::new(Kind::Data, PADDED, StreamId::from(1));
        let loaded = Data::load(head, Bytes::from_static(&[1, b'x', 0])).unwrap();
        assert_eq!(&loaded.payload()[..], b"x");
    }

    #[test]
    fn stream_zero_is_invalid() {
        let head = Head::new(Kind::Data, 0, StreamId::zero());
        assert_eq!(
            Data::load(head, Bytes::new()).unwrap_err(),
            FrameError::InvalidStreamId
        );
    }
}
