use bytes::{BufMut, Bytes, BytesMut};

use crate::wire::WireType;

/// Appends tagged fields to an owned buffer.
///
/// Submessages are built bottom-up: the nested encoder fills its own buffer,
/// which is then written as one length-delimited field of the parent.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    pub fn new() -> Encoder {
        Encoder {
            buf: BytesMut::with_capacity(256),
        }
    }

    pub fn uint64(&mut self, field: u32, value: u64) {
        self.tag(field, WireType::Varint);
        self.varint(value);
    }

    pub fn uint32(&mut self, field: u32, value: u32) {
        self.uint64(field, value as u64);
    }

    /// Plain two's-complement encoding; a negative value takes ten bytes.
    pub fn int64(&mut self, field: u32, value: i64) {
        self.uint64(field, value as u64);
    }

    /// Sign-extended like `int64`, per the schema contract.
    pub fn int32(&mut self, field: u32, value: i32) {
        self.uint64(field, value as i64 as u64);
    }

    pub fn boolean(&mut self, field: u32, value: bool) {
        self.uint64(field, value as u64);
    }

    pub fn fixed64(&mut self, field: u32, value: u64) {
        self.tag(field, WireType::Fixed64);
        self.buf.put_u64_le(value);
    }

    pub fn fixed32(&mut self, field: u32, value: u32) {
        self.tag(field, WireType::Fixed32);
        self.buf.put_u32_le(value);
    }

    pub fn bytes(&mut self, field: u32, value: &[u8]) {
        self.tag(field, WireType::LengthDelimited);
        self.varint(value.len() as u64);
        self.buf.put_slice(value);
    }

    pub fn string(&mut self, field: u32, value: &str) {
        self.bytes(field, value.as_bytes());
    }

    /// Build a submessage bottom-up and emit it as one length-delimited
    /// field.
    pub fn message<F>(&mut self, field: u32, f: F)
    where
        F: FnOnce(&mut Encoder),
    {
        let mut nested = Encoder::new();
        f(&mut nested);
        self.bytes(field, &nested.buf);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    fn tag(&mut self, field: u32, wire_type: WireType) {
        self.varint(((field as u64) << 3) | wire_type.bits() as u64);
    }

    fn varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.put_u8(byte);
                return;
            }
            self.buf.put_u8(byte | 0x80);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Encoder;

    #[test]
    fn varint_boundaries() {
        let mut enc = Encoder::new();
        enc.uint64(1, 0);
        enc.uint64(1, 127);
        enc.uint64(1, 128);
        enc.uint64(1, 300);
        assert_eq!(
            enc.as_slice(),
            &[0x08, 0x00, 0x08, 0x7f, 0x08, 0x80, 0x01, 0x08, 0xac, 0x02][..]
        );
    }

    #[test]
    fn negative_int64_is_ten_bytes_not_zigzag() {
        let mut enc = Encoder::new();
        enc.int64(1, -1);
        // tag + ten 0xff..0x01 varint bytes; zig-zag would have been 0x01.
        assert_eq!(enc.len(), 11);
        assert_eq!(enc.as_slice()[1], 0xff);
        assert_eq!(enc.as_slice()[10], 0x01);
    }

    #[test]
    fn length_delimited_field() {
        let mut enc = Encoder::new();
        enc.string(2, "hi");
        assert_eq!(enc.as_slice(), &[0x12, 0x02, b'h', b'i'][..]);
    }

    #[test]
    fn nested_message_is_length_delimited() {
        let mut enc = Encoder::new();
        enc.message(24, |topic| {
            topic.string(6, "memo");
        });
        // tag for field 24, wire type 2 => (24 << 3) | 2 = 194, one byte 0xc2 0x01.
        assert_eq!(enc.as_slice()[..2], [0xc2, 0x01]);
        assert_eq!(enc.as_slice()[2], 6); // inner length
    }
}
