use bytes::Bytes;
use thiserror::Error;

use crate::proto::h2::hpack::{HeaderEntry, Table, LITERAL_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecoderError {
    #[error("unsupported header representation {0:#x}")]
    InvalidRepresentation(u8),
}

/// Decodes literal-only header blocks.
///
/// A truncated trailing entry is discarded rather than faulted: the block
/// may have been cut at an arbitrary byte boundary.
#[derive(Debug)]
pub struct Decoder {
    table: Table,
}

impl Decoder {
    pub fn new(max_table_size: usize) -> Decoder {
        Decoder {
            table: Table::new(max_table_size),
        }
    }

    pub fn decode<F>(&mut self, src: &[u8], mut f: F) -> Result<(), DecoderError>
    where
        F: FnMut(HeaderEntry),
    {
        let mut pos = 0;

        while pos < src.len() {
            let marker = src[pos];
            if marker != LITERAL_MARKER {
                return Err(DecoderError::InvalidRepresentation(marker));
            }

            let (name, next) = match read_field(src, pos + 1) {
                Some(v) => v,
                None => return Ok(()), // truncated tail, discard
            };
            let (value, next) = match read_field(src, next) {
                Some(v) => v,
                None => return Ok(()),
            };
            pos = next;

            let entry = HeaderEntry {
                name: Bytes::copy_from_slice(name),
                value: Bytes::copy_from_slice(value),
            };
            self.table.insert(entry.clone());
            f(entry);
        }

        Ok(())
    }
}

fn read_field(src: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let len = *src.get(pos)? as usize;
    let start = pos + 1;
    if src.len() < start + len {
        return None;
    }
    Some((&src[start..start + len], start + len))
}
