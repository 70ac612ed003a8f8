use std::fmt;

use bytes::Bytes;

use crate::proto::h2::frame::FrameError;

/// Strip padding from a padded payload: the first byte is the pad length,
/// that many bytes are dropped from the tail.
pub fn strip_padding(payload: &mut Bytes) -> Result<u8, FrameError> {
    let payload_len = payload.len();
    if payload_len == 0 {
        return Err(FrameError::TooMuchPadding);
    }

    let pad_len = payload[0] as usize;
    if pad_len >= payload_len {
        return Err(FrameError::TooMuchPadding);
    }

    let _ = payload.split_to(1);
    let _ = payload.split_off(payload_len - 1 - pad_len);

    Ok(pad_len as u8)
}

pub struct DebugFlags<'a, 'f> {
    fmt: &'a mut fmt::Formatter<'f>,
    result: fmt::Result,
    started: bool,
}

pub fn debug_flags<'a, 'f>(
    fmt: &'a mut fmt::Formatter<'f>,
    bits: u8,
) -> DebugFlags<'a, 'f> {
    let result = write!(fmt, "({:#x}", bits);
    DebugFlags {
        fmt,
        result,
        started: false,
    }
}

impl<'a, 'f> DebugFlags<'a, 'f> {
    pub fn flag_if(&mut self, enabled: bool, name: &str) -> &mut Self {
        if enabled {
            self.result = self.result.and_then(|()| {
                let prefix = if self.started {
                    " | "
                } else {
                    self.started = true;
                    ": "
                };

                write!(self.fmt, "{}{}", prefix, name)
            });
        }
        self
    }

    pub fn finish(&mut self) -> fmt::Result {
        self.result.and_then(|()| write!(self.fmt, ")"))
    }
}

#[cfg(test)]
mod tests {
    use super::strip_padding;
    use bytes::Bytes;

    #[test]
    fn strips_leading_length_and_trailing_pad() {
        let mut payload = Bytes::from_static(&[2, b'a', b'b', 0, 0]);
        assert_eq!(strip_padding(&mut payload).unwrap(), 2);
        assert_eq!(&payload[..], b"ab");
    }

    #[test]
    fn rejects_pad_longer_than_payload() {
        let mut payload = Bytes::from_static(&[5, 1, 2]);
        assert!(strip_padding(&mut payload).is_err());
    }
}
