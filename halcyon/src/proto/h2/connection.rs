use std::cmp;
use std::io::{Read, Write};

use bytes::{Bytes, BytesMut};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

use crate::observe::SharedObserver;
use crate::proto::h2::frame::{
    self, Data, Frame, GoAway, Head, Headers, Kind, Ping, Reason, Reset, Settings, StreamId,
    WindowUpdate, DEFAULT_INITIAL_WINDOW_SIZE, DEFAULT_MAX_FRAME_SIZE,
    DEFAULT_SETTINGS_HEADER_TABLE_SIZE,
};
use crate::proto::h2::hpack::{self, HeaderEntry};
use crate::proto::h2::stream::Stream;
use crate::proto::h2::{FlowControl, H2Error};

/// The fixed connection preface every client connection opens with.
pub const PREFACE: [u8; 24] = *b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub header_table_size: u32,
    pub max_concurrent_streams: u32,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
}

impl Default for ConnectionConfig {
    fn default() -> ConnectionConfig {
        ConnectionConfig {
            header_table_size: DEFAULT_SETTINGS_HEADER_TABLE_SIZE as u32,
            max_concurrent_streams: 128,
            initial_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// One HTTP/2 connection over a byte channel.
///
/// Not internally synchronized: a connection's stream table, settings
/// table, and compression context are mutated only by its own read/write
/// operations, and concurrent callers must serialize access externally.
pub struct Connection<S> {
    io: S,
    config: ConnectionConfig,
    observer: SharedObserver,
    next_stream_id: StreamId,
    streams: FnvHashMap<StreamId, Stream>,
    peer_settings: Settings,
    hpack_encoder: hpack::Encoder,
    hpack_decoder: hpack::Decoder,
    send_window: FlowControl,
    send_max_frame_size: u32,
    send_initial_window: u32,
    read_buf: BytesMut,
    closed: Option<Reason>,
}

impl<S: Read + Write> Connection<S> {
    /// Send the preface and initial SETTINGS, block for the peer's
    /// SETTINGS, and acknowledge it.
    pub fn handshake(
        io: S,
        config: ConnectionConfig,
        observer: SharedObserver,
    ) -> Result<Connection<S>, H2Error> {
        let table_size = config.header_table_size as usize;
        let mut conn = Connection {
            io,
            observer,
            next_stream_id: StreamId::from(1),
            streams: FnvHashMap::default(),
            peer_settings: Settings::default(),
            hpack_encoder: hpack::Encoder::new(table_size),
            hpack_decoder: hpack::Decoder::new(table_size),
            send_window: FlowControl::new(DEFAULT_INITIAL_WINDOW_SIZE),
            send_max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            send_initial_window: DEFAULT_INITIAL_WINDOW_SIZE,
            read_buf: BytesMut::with_capacity(frame::HEADER_LEN),
            closed: None,
            config,
        };

        conn.io.write_all(&PREFACE)?;

        let mut settings = Settings::default();
        settings.set_header_table_size(Some(conn.config.header_table_size));
        settings.set_enable_push(false);
        settings.set_max_concurrent_streams(Some(conn.config.max_concurrent_streams));
        settings.set_initial_window_size(Some(conn.config.initial_window_size));
        settings.set_max_frame_size(Some(conn.config.max_frame_size));

        let mut buf = BytesMut::with_capacity(frame::HEADER_LEN + 36);
        settings.encode(&mut buf);
        conn.io.write_all(&buf)?;
        conn.io.flush()?;
        conn.observer
            .trace(format_args!("handshake; sent preface and {:?}", settings));

        loop {
            match conn.read_frame()? {
                Some(Frame::Settings(peer)) if !peer.is_ack() => {
                    conn.apply_remote_settings(&peer);

                    let mut buf = BytesMut::with_capacity(frame::HEADER_LEN);
                    Settings::ack().encode(&mut buf);
                    conn.io.write_all(&buf)?;
                    conn.io.flush()?;
                    break;
                }
                Some(other) => conn.dispatch(other)?,
                None => {}
            }
        }

        Ok(conn)
    }

    /// Allocate the next odd stream id and enter it in the stream table.
    pub fn open_stream(&mut self) -> Result<StreamId, H2Error> {
        self.check_open()?;

        let id = self.next_stream_id;
        self.next_stream_id = id.next_id().map_err(|_| H2Error::StreamsExhausted)?;
        self.streams
            .insert(id, Stream::new(id, self.send_initial_window));
        self.observer.trace(format_args!("open_stream; id={:?}", id));
        Ok(id)
    }

    pub fn stream(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(&id)
    }

    /// Remove a stream from the table, yielding its accumulated state.
    pub fn take_stream(&mut self, id: StreamId) -> Option<Stream> {
        self.streams.remove(&id)
    }

    pub fn num_active_streams(&self) -> usize {
        self.streams.len()
    }

    pub fn peer_settings(&self) -> &Settings {
        &self.peer_settings
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    /// Send one HEADERS frame on `id`.
    pub fn send_headers(
        &mut self,
        id: StreamId,
        entries: Vec<HeaderEntry>,
        end_stream: bool,
    ) -> Result<(), H2Error> {
        self.check_open()?;

        let stream = self
            .streams
            .get_mut(&id)
            .ok_or_else(|| H2Error::Protocol(format!("send HEADERS on unknown stream {:?}", id)))?;
        stream.state.send_frame(end_stream)?;

        let frame = Headers::new(id, entries, end_stream);
        let mut buf = BytesMut::with_capacity(256);
        frame.encode(&mut self.hpack_encoder, &mut buf)?;
        self.io.write_all(&buf)?;
        self.io.flush()?;
        self.observer.trace(format_args!("send {:?}", frame));
        Ok(())
    }

    /// Send `payload` as one or more DATA frames, splitting at the
    /// negotiated max frame size; only the final chunk carries end-stream.
    /// Blocks on the peer's WINDOW_UPDATEs when a window is exhausted.
    pub fn send_data(
        &mut self,
        id: StreamId,
        payload: Bytes,
        end_stream: bool,
    ) -> Result<(), H2Error> {
        self.check_open()?;

        let max = self.send_max_frame_size as usize;
        let mut remaining = payload;

        loop {
            let chunk_len = cmp::min(max, remaining.len());
            self.wait_for_window(id, chunk_len)?;

            let chunk = remaining.split_to(chunk_len);
            let last = remaining.is_empty();
            let eos = end_stream && last;

            let stream = self.streams.get_mut(&id).ok_or_else(|| {
                H2Error::Protocol(format!("send DATA on unknown stream {:?}", id))
            })?;
            stream.state.send_frame(eos)?;
            if chunk_len > 0 {
                stream.send_window.dec_window(chunk_len as u32);
                self.send_window.dec_window(chunk_len as u32);
            }

            let mut frame = Data::new(id, chunk);
            frame.set_end_stream(eos);
            let mut buf = BytesMut::with_capacity(frame::HEADER_LEN + chunk_len);
            frame.encode(&mut buf);
            self.io.write_all(&buf)?;
            self.observer.trace(format_args!(
                "send {:?}; len={}",
                frame, chunk_len
            ));

            if last {
                break;
            }
        }

        self.io.flush()?;
        Ok(())
    }

    /// Force `id` closed with RST_STREAM and drop it from the table.
    pub fn send_reset(&mut self, id: StreamId, reason: Reason) -> Result<(), H2Error> {
        let mut buf = BytesMut::with_capacity(frame::HEADER_LEN + 4);
        Reset::new(id, reason).encode(&mut buf);
        self.io.write_all(&buf)?;
        self.io.flush()?;
        self.streams.remove(&id);
        self.observer
            .trace(format_args!("send_reset; id={:?}; reason={:?}", id, reason));
        Ok(())
    }

    /// Read one frame and apply it to connection state. Frames of kinds
    /// outside the dispatch set are read and ignored.
    pub fn read_and_dispatch(&mut self) -> Result<(), H2Error> {
        self.check_open()?;

        match self.read_frame()? {
            Some(frame) => self.dispatch(frame),
            None => Ok(()),
        }
    }

    fn check_open(&self) -> Result<(), H2Error> {
        match self.closed {
            Some(reason) => Err(H2Error::ConnectionClosed {
                last_stream_id: StreamId::zero(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Block until both the connection window and `id`'s window can take a
    /// `len`-byte frame.
    fn wait_for_window(&mut self, id: StreamId, len: usize) -> Result<(), H2Error> {
        loop {
            let (stream_available, stream_dead) = match self.streams.get(&id) {
                Some(stream) => (
                    stream.send_window.available() as usize,
                    stream.state.is_closed(),
                ),
                None => (0, true),
            };

            // A closed stream will never see another WINDOW_UPDATE; let the
            // send path surface the state error.
            if stream_dead {
                return Ok(());
            }

            if self.send_window.available() as usize >= len && stream_available >= len {
                return Ok(());
            }

            self.observer.trace(format_args!(
                "wait_for_window; id={:?}; need={}; conn={}; stream={}",
                id,
                len,
                self.send_window.available(),
                stream_available
            ));
            self.read_and_dispatch()?;
        }
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, H2Error> {
        let mut header = [0u8; frame::HEADER_LEN];
        self.io.read_exact(&mut header)?;

        let len = ((header[0] as u32) << 16) | ((header[1] as u32) << 8) | header[2] as u32;
        if len > self.config.max_frame_size {
            return Err(H2Error::FrameSize);
        }
        let head = Head::parse(&header);

        // Owned read buffer: capacity then length, no sharing across calls.
        self.read_buf.clear();
        self.read_buf.resize(len as usize, 0);
        self.io.read_exact(&mut self.read_buf)?;
        let payload = self.read_buf.split_to(len as usize).freeze();

        self.observer.trace(format_args!(
            "recv frame; kind={:?}; len={}; stream={:?}",
            head.kind(),
            len,
            head.stream_id()
        ));

        let frame = match head.kind() {
            Kind::Data => Frame::Data(Data::load(head, payload)?),
            Kind::Headers => {
                Frame::Headers(Headers::load(head, payload, &mut self.hpack_decoder)?)
            }
            Kind::Settings => Frame::Settings(Settings::load(head, &payload)?),
            Kind::Ping => Frame::Ping(Ping::load(head, &payload)?),
            Kind::GoAway => Frame::GoAway(GoAway::load(payload)?),
            Kind::WindowUpdate => Frame::WindowUpdate(WindowUpdate::load(head, &payload)?),
            Kind::Reset => Frame::Reset(Reset::load(head, &payload)?),
            Kind::Priority | Kind::PushPromise | Kind::Continuation => {
                self.observer.trace(format_args!(
                    "ignoring frame; kind={:?}",
                    head.kind()
                ));
                return Ok(None);
            }
            Kind::Unknown(code) => {
                self.observer
                    .trace(format_args!("ignoring unknown frame; code={}", code));
                return Ok(None);
            }
        };

        Ok(Some(frame))
    }

    fn dispatch(&mut self, frame: Frame) -> Result<(), H2Error> {
        match frame {
            Frame::Settings(settings) => {
                if !settings.is_ack() {
                    self.apply_remote_settings(&settings);

                    let mut buf = BytesMut::with_capacity(frame::HEADER_LEN);
                    Settings::ack().encode(&mut buf);
                    self.io.write_all(&buf)?;
                    self.io.flush()?;
                }
            }
            Frame::Headers(headers) => {
                let id = headers.stream_id();
                let end = headers.is_end_stream();
                let stream = self.streams.get_mut(&id).ok_or_else(|| {
                    H2Error::Protocol(format!("HEADERS on unknown stream {:?}", id))
                })?;
                stream.state.recv_frame(end)?;
                stream.headers.extend(headers.into_entries());
            }
            Frame::Data(data) => {
                let id = data.stream_id();
                let end = data.is_end_stream();
                let len = data.payload().len() as u32;

                let stream = self.streams.get_mut(&id).ok_or_else(|| {
                    H2Error::Protocol(format!("DATA on unknown stream {:?}", id))
                })?;
                stream.state.recv_frame(end)?;
                stream.body.extend_from_slice(data.payload());

                // Replenish the receive windows for the consumed payload.
                if len > 0 {
                    let mut buf = BytesMut::with_capacity(2 * (frame::HEADER_LEN + 4));
                    WindowUpdate::new(StreamId::zero(), len).encode(&mut buf);
                    if !end {
                        WindowUpdate::new(id, len).encode(&mut buf);
                    }
                    self.io.write_all(&buf)?;
                    self.io.flush()?;
                }
            }
            Frame::WindowUpdate(update) => {
                let inc = update.size_increment();
                if inc == 0 {
                    // A zero increment changes nothing; skip the unit.
                } else if update.stream_id().is_zero() {
                    self.send_window.inc_window(inc);
                } else if let Some(stream) = self.streams.get_mut(&update.stream_id()) {
                    stream.send_window.inc_window(inc);
                } else {
                    // The stream may already be gone; tolerated.
                    self.observer.trace(format_args!(
                        "window update for absent stream {:?}",
                        update.stream_id()
                    ));
                }
            }
            Frame::Ping(ping) => {
                if !ping.is_ack() {
                    let mut buf = BytesMut::with_capacity(frame::HEADER_LEN + 8);
                    Ping::pong(*ping.payload()).encode(&mut buf);
                    self.io.write_all(&buf)?;
                    self.io.flush()?;
                }
            }
            Frame::GoAway(goaway) => {
                self.observer
                    .debug(format_args!("recv {:?}", goaway));
                self.streams.clear();
                self.closed = Some(goaway.reason());
                return Err(H2Error::ConnectionClosed {
                    last_stream_id: goaway.last_stream_id(),
                    reason: goaway.reason(),
                });
            }
            Frame::Reset(reset) => {
                if let Some(stream) = self.streams.get_mut(&reset.stream_id()) {
                    stream.state.recv_reset(reset.reason());
                    stream.reset = Some(reset.reason());
                }
            }
        }

        Ok(())
    }

    fn apply_remote_settings(&mut self, settings: &Settings) {
        if let Some(val) = settings.max_frame_size() {
            self.send_max_frame_size = val;
        }
        if let Some(val) = settings.initial_window_size() {
            let delta = val as i64 - self.send_initial_window as i64;
            self.send_initial_window = val;
            for stream in self.streams.values_mut() {
                stream.send_window.adjust(delta as i32);
            }
        }
        self.peer_settings.merge(settings);
        self.observer
            .trace(format_args!("apply_remote_settings; {:?}", settings));
    }
}
