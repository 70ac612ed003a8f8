use bytes::{BufMut, BytesMut};
use thiserror::Error;

use crate::proto::h2::hpack::{HeaderEntry, Table, LITERAL_MARKER, MAX_FIELD_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncoderError {
    #[error("header name or value exceeds 255 bytes")]
    FieldTooLong,
}

/// Emits header blocks in the literal-only representation.
#[derive(Debug)]
pub struct Encoder {
    table: Table,
}

impl Encoder {
    pub fn new(max_table_size: usize) -> Encoder {
        Encoder {
            table: Table::new(max_table_size),
        }
    }

    pub fn encode(
        &mut self,
        headers: &[HeaderEntry],
        dst: &mut BytesMut,
    ) -> Result<(), EncoderError> {
        for header in headers {
            if header.name.len() > MAX_FIELD_LEN || header.value.len() > MAX_FIELD_LEN {
                return Err(EncoderError::FieldTooLong);
            }

            dst.put_u8(LITERAL_MARKER);
            dst.put_u8(header.name.len() as u8);
            dst.put_slice(&header.name);
            dst.put_u8(header.value.len() as u8);
            dst.put_slice(&header.value);

            self.table.insert(header.clone());
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn table_size(&self) -> usize {
        self.table.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn literal_layout() {
        let mut encoder = Encoder::new(4096);
        let mut dst = BytesMut::new();
        encoder
            .encode(&[HeaderEntry::new("te", "trailers")], &mut dst)
            .unwrap();

        assert_eq!(
            &dst[..],
            &[
                0x00, 2, b't', b'e', 8, b't', b'r', b'a', b'i', b'l', b'e', b'r', b's'
            ][..]
        );
    }

    #[test]
    fn oversized_field_is_rejected() {
        let mut encoder = Encoder::new(4096);
        let mut dst = BytesMut::new();
        let long = HeaderEntry::new("x", Bytes::from(vec![b'v'; 256]));
        assert_eq!(
            encoder.encode(&[long], &mut dst).unwrap_err(),
            EncoderError::FieldTooLong
        );
    }

    #[test]
    fn table_is_bounded_while_encoding() {
        let mut encoder = Encoder::new(128);
        let mut dst = BytesMut::new();
        for i in 0..32 {
            let entry = HeaderEntry::new(format!("name-{}", i), "value");
            encoder.encode(&[entry], &mut dst).unwrap();
            assert!(encoder.table_size() <= 128);
        }
    }
}
