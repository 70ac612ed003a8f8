use std::str;

use thiserror::Error;

use crate::wire::WireType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("buffer truncated mid-field")]
    Truncated,

    #[error("varint exceeds 64 bits")]
    VarintOverflow,

    #[error("unsupported wire type {0}")]
    InvalidWireType(u8),

    #[error("field is not valid utf-8")]
    InvalidUtf8,
}

/// Walks a byte buffer tag-by-tag.
///
/// Callers match on the field number after [`next_field`](Decoder::next_field)
/// and [`skip`](Decoder::skip) anything they do not recognize; decoding stops
/// cleanly at buffer end.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Decoder<'a> {
        Decoder { buf, pos: 0 }
    }

    /// Next `(field_number, wire_type)` pair, or `None` at buffer end.
    pub fn next_field(&mut self) -> Result<Option<(u32, WireType)>, DecodeError> {
        if self.pos == self.buf.len() {
            return Ok(None);
        }
        let tag = self.read_varint()?;
        let wire_type = WireType::from_bits((tag & 0x7) as u8)
            .ok_or_else(|| DecodeError::InvalidWireType((tag & 0x7) as u8))?;
        Ok(Some(((tag >> 3) as u32, wire_type)))
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            if self.pos == self.buf.len() {
                return Err(DecodeError::Truncated);
            }
            if shift >= 64 {
                return Err(DecodeError::VarintOverflow);
            }
            let byte = self.buf[self.pos];
            self.pos += 1;
            value |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    pub fn read_uint64(&mut self) -> Result<u64, DecodeError> {
        self.read_varint()
    }

    pub fn read_uint32(&mut self) -> Result<u32, DecodeError> {
        Ok(self.read_varint()? as u32)
    }

    pub fn read_int64(&mut self) -> Result<i64, DecodeError> {
        Ok(self.read_varint()? as i64)
    }

    pub fn read_int32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_varint()? as i64 as i32)
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_varint()? != 0)
    }

    pub fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        let bytes = self.take(8)?;
        let mut out = [0u8; 8];
        out.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(out))
    }

    pub fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        let mut out = [0u8; 4];
        out.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(out))
    }

    /// Length-delimited payload. The length prefix itself is unrecoverable:
    /// if it is truncated the whole message is abandoned.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_varint()? as usize;
        self.take(len)
    }

    pub fn read_string(&mut self) -> Result<&'a str, DecodeError> {
        str::from_utf8(self.read_bytes()?).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Sub-decoder over one length-delimited submessage.
    pub fn read_message(&mut self) -> Result<Decoder<'a>, DecodeError> {
        Ok(Decoder::new(self.read_bytes()?))
    }

    /// Skip one field of the given wire type.
    pub fn skip(&mut self, wire_type: WireType) -> Result<(), DecodeError> {
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.take(8)?;
            }
            WireType::LengthDelimited => {
                self.read_bytes()?;
            }
            WireType::Fixed32 => {
                self.take(4)?;
            }
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.buf.len() - self.pos < len {
            return Err(DecodeError::Truncated);
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodeError, Decoder};
    use crate::wire::Encoder;

    #[test]
    fn unknown_fields_are_skipped() {
        let mut enc = Encoder::new();
        enc.uint64(1, 7);
        enc.string(99, "ignored");
        enc.fixed64(98, 0xdead_beef);
        enc.fixed32(97, 42);
        enc.uint64(2, 8);
        let buf = enc.finish();

        let mut dec = Decoder::new(&buf);
        let mut first = None;
        let mut second = None;
        while let Some((field, wire_type)) = dec.next_field().unwrap() {
            match field {
                1 => first = Some(dec.read_uint64().unwrap()),
                2 => second = Some(dec.read_uint64().unwrap()),
                _ => dec.skip(wire_type).unwrap(),
            }
        }
        assert_eq!(first, Some(7));
        assert_eq!(second, Some(8));
    }

    #[test]
    fn nested_round_trip_with_negative_int64() {
        // Outer field 24 holding inner field 6 holding an int64, the shape
        // used by a create-topic operation's auto-renew period.
        let mut enc = Encoder::new();
        enc.message(24, |topic| {
            topic.message(6, |period| {
                period.int64(1, -7776000);
            });
        });
        let buf = enc.finish();

        let mut dec = Decoder::new(&buf);
        let (field, _) = dec.next_field().unwrap().unwrap();
        assert_eq!(field, 24);
        let mut topic = dec.read_message().unwrap();
        let (field, _) = topic.next_field().unwrap().unwrap();
        assert_eq!(field, 6);
        let mut period = topic.read_message().unwrap();
        let (field, _) = period.next_field().unwrap().unwrap();
        assert_eq!(field, 1);
        assert_eq!(period.read_int64().unwrap(), -7776000);
    }

    #[test]
    fn truncated_length_prefix_is_unrecoverable() {
        let mut enc = Encoder::new();
        enc.bytes(1, &[0u8; 16]);
        let buf = enc.finish();

        let mut dec = Decoder::new(&buf[..4]);
        dec.next_field().unwrap().unwrap();
        assert_eq!(dec.read_bytes().unwrap_err(), DecodeError::Truncated);
    }

    #[test]
    fn deprecated_group_wire_types_are_rejected() {
        // tag with wire type 3 (start group)
        let buf = [0x0b];
        let mut dec = Decoder::new(&buf);
        assert_eq!(
            dec.next_field().unwrap_err(),
            DecodeError::InvalidWireType(3)
        );
    }

    #[test]
    fn stops_at_buffer_end() {
        let mut dec = Decoder::new(&[]);
        assert!(dec.next_field().unwrap().is_none());
    }
}
