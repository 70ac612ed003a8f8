use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::proto::h2::frame::{util, FrameError, Head, Kind, StreamId};
use crate::proto::h2::hpack::{self, HeaderEntry};

/// A HEADERS frame carrying a compressed header block.
///
/// This client never emits CONTINUATION frames: a header block always fits
/// one HEADERS frame, so END_HEADERS is always set on encode.
#[derive(Eq, PartialEq)]
pub struct Headers {
    stream_id: StreamId,
    entries: Vec<HeaderEntry>,
    flags: HeadersFlags,
}

#[derive(Copy, Clone, Eq, PartialEq)]
struct HeadersFlags(u8);

const END_STREAM: u8 = 0x1;
const END_HEADERS: u8 = 0x4;
const PADDED: u8 = 0x8;
const PRIORITY: u8 = 0x20;
const ALL: u8 = END_STREAM | END_HEADERS | PADDED | PRIORITY;

impl Headers {
    pub fn new(stream_id: StreamId, entries: Vec<HeaderEntry>, end_stream: bool) -> Self {
        assert!(!stream_id.is_zero());

        let mut flags = HeadersFlags::default();
        flags.set_end_headers();
        if end_stream {
            flags.set_end_stream();
        }

        Headers {
            stream_id,
            entries,
            flags,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags.is_end_stream()
    }

    pub fn entries(&self) -> &[HeaderEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<HeaderEntry> {
        self.entries
    }

    pub fn load(
        head: Head,
        mut payload: Bytes,
        decoder: &mut hpack::Decoder,
    ) -> Result<Self, FrameError> {
        let flags = HeadersFlags::load(head.flag());

        if head.stream_id().is_zero() {
            return Err(FrameError::InvalidStreamId);
        }

        if flags.is_padded() {
            util::strip_padding(&mut payload)?;
        }

        if flags.is_priority() {
            // stream dependency (4) + weight (1), unused by this client
            if payload.len() < 5 {
                return Err(FrameError::InvalidPayloadLength);
            }
            let _ = payload.split_to(5);
        }

        let mut entries = Vec::new();
        decoder.decode(&payload, |entry| entries.push(entry))?;

        Ok(Headers {
            stream_id: head.stream_id(),
            entries,
            flags,
        })
    }

    pub(crate) fn head(&self) -> Head {
        Head::new(Kind::Headers, self.flags.into(), self.stream_id)
    }

    pub fn encode<T: BufMut>(
        &self,
        encoder: &mut hpack::Encoder,
        dst: &mut T,
    ) -> Result<(), hpack::EncoderError> {
        let mut block = BytesMut::with_capacity(256);
        encoder.encode(&self.entries, &mut block)?;

        self.head().encode(block.len(), dst);
        dst.put_slice(&block);
        Ok(())
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Headers")
            .field("stream_id", &self.stream_id)
            .field("flags", &self.flags)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl HeadersFlags {
    fn load(bits: u8) -> HeadersFlags {
        HeadersFlags(bits & ALL)
    }

    fn is_end_stream(&self) -> bool {
        self.0 & END_STREAM == END_STREAM
    }

    fn set_end_stream(&mut self) {
        self.0 |= END_STREAM;
    }

    fn set_end_headers(&mut self) {
        self.0 |= END_HEADERS;
    }

    fn is_padded(&self) -> bool {
        self.0 & PADDED == PADDED
    }

    fn is_priority(&self) -> bool {
        self.0 & PRIORITY == PRIORITY
    }
}

impl Default for HeadersFlags {
    fn default() -> Self {
        HeadersFlags(0)
    }
}

impl From<HeadersFlags> for u8 {
    fn from(src: HeadersFlags) -> u8 {
        src.0
    }
}

impl fmt::Debug for HeadersFlags {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        util::debug_flags(fmt, self.0)
            .flag_if(self.is_end_stream(), "END_STREAM")
            .flag_if(self.0 & END_HEADERS == END_HEADERS, "END_HEADERS")
            .flag_if(self.is_padded(), "PADDED")
            .flag_if(self.is_priority(), "PRIORITY")
            .finish()
    }
}
