use std::fmt;

use bytes::{BufMut, Bytes};

use crate::proto::h2::frame::{FrameError, Head, Kind, StreamId};

pub const DEFAULT_SETTINGS_HEADER_TABLE_SIZE: usize = 4_096;
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65_535;
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;
pub const MAX_INITIAL_WINDOW_SIZE: usize = (1 << 31) - 1;
pub const MAX_MAX_FRAME_SIZE: u32 = (1 << 24) - 1;

/// A SETTINGS frame: the negotiated parameter table, or a bare ACK.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Settings {
    flags: SettingsFlags,
    header_table_size: Option<u32>,
    enable_push: Option<u32>,
    max_concurrent_streams: Option<u32>,
    initial_window_size: Option<u32>,
    max_frame_size: Option<u32>,
    max_header_list_size: Option<u32>,
}

#[derive(Copy, Clone, Default, Eq, PartialEq)]
struct SettingsFlags(u8);

const ACK: u8 = 0x1;
const ALL: u8 = ACK;

/// One 6-byte identifier/value entry.
#[derive(Debug)]
pub enum Setting {
    HeaderTableSize(u32),
    EnablePush(u32),
    MaxConcurrentStreams(u32),
    InitialWindowSize(u32),
    MaxFrameSize(u32),
    MaxHeaderListSize(u32),
}

impl Settings {
    pub fn ack() -> Settings {
        Settings {
            flags: SettingsFlags::ack(),
            ..Settings::default()
        }
    }

    pub fn is_ack(&self) -> bool {
        self.flags.is_ack()
    }

    pub fn initial_window_size(&self) -> Option<u32> {
        self.initial_window_size
    }

    pub fn set_initial_window_size(&mut self, size: Option<u32>) {
        self.initial_window_size = size;
    }

    pub fn max_frame_size(&self) -> Option<u32> {
        self.max_frame_size
    }

    pub fn set_max_frame_size(&mut self, size: Option<u32>) {
        self.max_frame_size = size;
    }

    pub fn header_table_size(&self) -> Option<u32> {
        self.header_table_size
    }

    pub fn set_header_table_size(&mut self, size: Option<u32>) {
        self.header_table_size = size;
    }

    pub fn max_concurrent_streams(&self) -> Option<u32> {
        self.max_concurrent_streams
    }

    pub fn set_max_concurrent_streams(&mut self, max: Option<u32>) {
        self.max_concurrent_streams = max;
    }

    pub fn is_push_enabled(&self) -> Option<bool> {
        self.enable_push.map(|val| val == 1)
    }

    pub fn set_enable_push(&mut self, enable: bool) {
        self.enable_push = Some(enable as u32);
    }

    pub fn max_header_list_size(&self) -> Option<u32> {
        self.max_header_list_size
    }

    /// Fold another SETTINGS frame into this table, entry by entry.
    pub fn merge(&mut self, other: &Settings) {
        if other.header_table_size.is_some() {
            self.header_table_size = other.header_table_size;
        }
        if other.enable_push.is_some() {
            self.enable_push = other.enable_push;
        }
        if other.max_concurrent_streams.is_some() {
            self.max_concurrent_streams = other.max_concurrent_streams;
        }
        if other.initial_window_size.is_some() {
            self.initial_window_size = other.initial_window_size;
        }
        if other.max_frame_size.is_some() {
            self.max_frame_size = other.max_frame_size;
        }
        if other.max_header_list_size.is_some() {
            self.max_header_list_size = other.max_header_list_size;
        }
    }

    pub fn load(head: Head, payload: &Bytes) -> Result<Settings, FrameError> {
        use self::Setting::*;

        debug_assert_eq!(head.kind(), Kind::Settings);

        if !head.stream_id().is_zero() {
            return Err(FrameError::InvalidStreamId);
        }

        // ACK carries no payload.
        if head.flag() & ACK == ACK {
            if !payload.is_empty() {
                return Err(FrameError::InvalidPayloadAckSettings);
            }
            return Ok(Settings::ack());
        }

        if payload.len() % 6 != 0 {
            return Err(FrameError::InvalidPayloadLength);
        }

        let mut settings = Settings::default();
        for raw in payload.chunks(6) {
            match Setting::load(raw) {
                Some(HeaderTableSize(val)) => {
                    settings.header_table_size = Some(val);
                }
                Some(EnablePush(val)) => {
                    if val != 0 && val != 1 {
                        return Err(FrameError::InvalidSettingValue);
                    }
                    settings.enable_push = Some(val);
                }
                Some(MaxConcurrentStreams(val)) => {
                    settings.max_concurrent_streams = Some(val);
                }
                Some(InitialWindowSize(val)) => {
                    if val as usize > MAX_INITIAL_WINDOW_SIZE {
                        return Err(FrameError::InvalidSettingValue);
                    }
                    settings.initial_window_size = Some(val);
                }
                Some(MaxFrameSize(val)) => {
                    if val > MAX_MAX_FRAME_SIZE {
                        return Err(FrameError::InvalidSettingValue);
                    }
                    settings.max_frame_size = Some(val);
                }
                Some(MaxHeaderListSize(val)) => {
                    settings.max_header_list_size = Some(val);
                }
                // Unknown identifiers are skipped, not errors.
                None => {}
            }
        }

        Ok(settings)
    }

    pub fn encode<T: BufMut>(&self, dst: &mut T) {
        let head = Head::new(Kind::Settings, self.flags.into(), StreamId::zero());
        let payload_len = self.payload_len();

        head.encode(payload_len, dst);
        self.for_each(|setting| setting.encode(dst));
    }

    fn payload_len(&self) -> usize {
        let mut len = 0;
        self.for_each(|_| len += 6);
        len
    }

    fn for_each<F: FnMut(Setting)>(&self, mut f: F) {
        use self::Setting::*;

        if let Some(v) = self.header_table_size {
            f(HeaderTableSize(v));
        }
        if let Some(v) = self.enable_push {
            f(EnablePush(v));
        }
        if let Some(v) = self.max_concurrent_streams {
            f(MaxConcurrentStreams(v));
        }
        if let Some(v) = self.initial_window_size {
            f(InitialWindowSize(v));
        }
        if let Some(v) = self.max_frame_size {
            f(MaxFrameSize(v));
        }
        if let Some(v) = self.max_header_list_size {
            f(MaxHeaderListSize(v));
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = fmt.debug_struct("Settings");
        builder.field("flags", &self.flags.0);

        self.for_each(|setting| match setting {
            Setting::EnablePush(v) => {
                builder.field("enable_push", &v);
            }
            Setting::HeaderTableSize(v) => {
                builder.field("header_table_size", &v);
            }
            Setting::InitialWindowSize(v) => {
                builder.field("initial_window_size", &v);
            }
            Setting::MaxConcurrentStreams(v) => {
                builder.field("max_concurrent_streams", &v);
            }
            Setting::MaxFrameSize(v) => {
                builder.field("max_frame_size", &v);
            }
            Setting::MaxHeaderListSize(v) => {
                builder.field("max_header_list_size", &v);
            }
        });

        builder.finish()
    }
}

impl Setting {
    /// Build a `Setting` from a 6-byte identifier/value entry; unknown
    /// identifiers yield `None`.
    pub fn load(raw: &[u8]) -> Option<Setting> {
        use self::Setting::*;

        debug_assert_eq!(raw.len(), 6);

        let id = ((raw[0] as u16) << 8) | raw[1] as u16;
        let val = unpack_octets_4!(raw, 2, u32);

        match id {
            1 => Some(HeaderTableSize(val)),
            2 => Some(EnablePush(val)),
            3 => Some(MaxConcurrentStreams(val)),
            4 => Some(InitialWindowSize(val)),
            5 => Some(MaxFrameSize(val)),
            6 => Some(MaxHeaderListSize(val)),
            _ => None,
        }
    }

    fn encode<T: BufMut>(&self, dst: &mut T) {
        use self::Setting::*;

        let (id, val): (u16, u32) = match *self {
            HeaderTableSize(v) => (1, v),
            EnablePush(v) => (2, v),
            MaxConcurrentStreams(v) => (3, v),
            InitialWindowSize(v) => (4, v),
            MaxFrameSize(v) => (5, v),
            MaxHeaderListSize(v) => (6, v),
        };

        dst.put_u16(id);
        dst.put_u32(val);
    }
}

impl SettingsFlags {
    fn ack() -> SettingsFlags {
        SettingsFlags(ACK)
    }

    fn is_ack(&self) -> bool {
        self.0 & ACK == ACK
    }
}

impl From<SettingsFlags> for u8 {
    fn from(src: SettingsFlags) -> u8 {
        src.0 & ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_load() {
        let mut settings = Settings::default();
        settings.set_header_table_size(Some(4096));
        settings.set_enable_push(false);
        settings.set_initial_window_size(Some(65_535));
        settings.set_max_frame_size(Some(16_384));

        let mut buf = Vec::new();
        settings.encode(&mut buf);

        let head = Head::parse(&buf);
        let loaded = Settings::load(head, &Bytes::copy_from_slice(&buf[9..])).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn unknown_identifier_is_skipped() {
        let head = Head::new(Kind::Settings, 0, StreamId::zero());
        // id 0x99 is nothing we know; id 5 follows and must still apply.
        let payload = Bytes::from_static(&[
            0x00, 0x99, 0, 0, 0, 1, //
            0x00, 0x05, 0, 0, 0x40, 0x00,
        ]);
        let loaded = Settings::load(head, &payload).unwrap();
        assert_eq!(loaded.max_frame_size(), Some(16_384));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let head = Head::new(Kind::Settings, 0, StreamId::zero());

        // initial-window-size above 2^31-1
        let payload = Bytes::from_static(&[0x00, 0x04, 0x80, 0, 0, 0]);
        assert_eq!(
            Settings::load(head, &payload).unwrap_err(),
            FrameError::InvalidSettingValue
        );

        // enable-push is a boolean
        let payload = Bytes::from_static(&[0x00, 0x02, 0, 0, 0, 2]);
        assert_eq!(
            Settings::load(head, &payload).unwrap_err(),
            FrameError::InvalidSettingValue
        );
    }

    #[test]
    fn small_max_frame_size_is_accepted() {
        // Some peers advertise frame sizes below the protocol default; the
        // value is honored rather than rejected.
        let head = Head::new(Kind::Settings, 0, StreamId::zero());
        let payload = Bytes::from_static(&[0x00, 0x05, 0, 0, 0x04, 0x00]);
        let loaded = Settings::load(head, &payload).unwrap();
        assert_eq!(loaded.max_frame_size(), Some(1024));
    }

    #[test]
    fn ack_with_payload_is_rejected() {
        let head = Head::new(Kind::Settings, ACK, StreamId::zero());
        let payload = Bytes::from_static(&[0; 6]);
        assert_eq!(
            Settings::load(head, &payload).unwrap_err(),
            FrameError::InvalidPayloadAckSettings
        );
    }
}
