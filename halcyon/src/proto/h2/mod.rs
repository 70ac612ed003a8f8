//! HTTP/2 connection layer: typed frames, stream multiplexing, flow
//! control, and literal-only header compression.

pub mod frame;
pub mod hpack;

mod connection;
mod flow;
mod state;
mod stream;

use thiserror::Error;

pub use connection::{Connection, ConnectionConfig, PREFACE};
pub use flow::{FlowControl, WindowSize, MAX_WINDOW_SIZE};
pub use frame::{Reason, StreamId};
pub use state::State;
pub use stream::Stream;

#[derive(Debug, Error)]
pub enum H2Error {
    /// A frame declared a length above the negotiated maximum. Fatal to the
    /// connection.
    #[error("frame exceeds the negotiated maximum size")]
    FrameSize,

    /// The peer sent GOAWAY. Fatal here; the executor may retry on a fresh
    /// connection.
    #[error("connection closed by peer: {reason}")]
    ConnectionClosed {
        last_stream_id: StreamId,
        reason: Reason,
    },

    /// The odd stream-id space ran out; the connection must be replaced.
    #[error("stream ids exhausted")]
    StreamsExhausted,

    /// Malformed or unexpected traffic. Fatal to the connection.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("frame: {0}")]
    Frame(#[from] frame::FrameError),

    #[error("header block: {0}")]
    HeaderEncode(#[from] hpack::EncoderError),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}
