#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use halcyon::proto::call;
use halcyon::proto::h2::frame::{
    Data, GoAway, Head, Headers, Kind, Ping, Reason, Reset, Settings, StreamId,
};
use halcyon::proto::h2::hpack::{self, HeaderEntry};
use halcyon::proto::h2::PREFACE;

/// One end of a scripted conversation: reads are served from a pre-baked
/// server transcript, writes are captured for inspection. An exhausted
/// script behaves like a socket read timeout.
pub struct ScriptChannel {
    script: io::Cursor<Vec<u8>>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl ScriptChannel {
    pub fn new(script: Vec<u8>) -> (ScriptChannel, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let channel = ScriptChannel {
            script: io::Cursor::new(script),
            written: written.clone(),
        };
        (channel, written)
    }
}

impl Read for ScriptChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.script.read(buf)?;
        if n == 0 && !buf.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "script exhausted"));
        }
        Ok(n)
    }
}

impl Write for ScriptChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds the server side of a conversation frame by frame.
pub struct ServerScript {
    buf: Vec<u8>,
    hpack: hpack::Encoder,
}

impl ServerScript {
    pub fn new() -> ServerScript {
        ServerScript {
            buf: Vec::new(),
            hpack: hpack::Encoder::new(4096),
        }
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        settings.encode(&mut self.buf);
        self
    }

    pub fn default_settings(self) -> Self {
        self.settings(Settings::default())
    }

    pub fn response_headers(mut self, stream_id: u32) -> Self {
        let headers = Headers::new(
            StreamId::from(stream_id),
            vec![HeaderEntry::new(":status", "200")],
            false,
        );
        headers.encode(&mut self.hpack, &mut self.buf).unwrap();
        self
    }

    pub fn data(mut self, stream_id: u32, payload: &[u8], end_stream: bool) -> Self {
        let mut frame = Data::new(StreamId::from(stream_id), Bytes::copy_from_slice(payload));
        frame.set_end_stream(end_stream);
        frame.encode(&mut self.buf);
        self
    }

    /// A whole unary response: HEADERS, then the length-prefixed message
    /// spread over `chunks` DATA frames, the last flagged end-stream.
    pub fn unary_response(mut self, stream_id: u32, payload: &[u8], chunks: usize) -> Self {
        self = self.response_headers(stream_id);
        let message = call::wrap_message(payload);
        let chunk_size = (message.len() + chunks - 1) / chunks;
        let parts: Vec<&[u8]> = message.chunks(chunk_size).collect();
        let count = parts.len();
        for (i, part) in parts.into_iter().enumerate() {
            self = self.data(stream_id, part, i + 1 == count);
        }
        self
    }

    pub fn ping(mut self, payload: [u8; 8]) -> Self {
        Ping::new(payload).encode(&mut self.buf);
        self
    }

    pub fn go_away(mut self, last_stream: u32, reason: Reason) -> Self {
        GoAway::new(StreamId::from(last_stream), reason).encode(&mut self.buf);
        self
    }

    pub fn reset(mut self, stream_id: u32, reason: Reason) -> Self {
        Reset::new(StreamId::from(stream_id), reason).encode(&mut self.buf);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// A minimal TLS server-hello record, for scripts driven through the TLS
/// layer.
pub fn tls_server_hello() -> Vec<u8> {
    vec![22, 0x03, 0x03, 0x00, 0x04, 0x02, 0x00, 0x00, 0x00]
}

/// Split captured client bytes into (head, payload) frames, skipping the
/// connection preface if present.
pub fn parse_frames(bytes: &[u8]) -> Vec<(Head, Vec<u8>)> {
    let mut at = 0;
    if bytes.len() >= PREFACE.len() && bytes[..PREFACE.len()] == PREFACE[..] {
        at = PREFACE.len();
    }

    let mut frames = Vec::new();
    while at + 9 <= bytes.len() {
        let head = Head::parse(&bytes[at..at + 9]);
        let len =
            ((bytes[at] as usize) << 16) | ((bytes[at + 1] as usize) << 8) | bytes[at + 2] as usize;
        let start = at + 9;
        frames.push((head, bytes[start..start + len].to_vec()));
        at = start + len;
    }
    frames
}

/// The payload lengths of every DATA frame in `frames`, in order.
pub fn data_frame_lens(frames: &[(Head, Vec<u8>)]) -> Vec<usize> {
    frames
        .iter()
        .filter(|(head, _)| head.kind() == Kind::Data)
        .map(|(_, payload)| payload.len())
        .collect()
}
