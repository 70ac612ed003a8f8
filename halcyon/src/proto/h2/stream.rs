use bytes::BytesMut;

use crate::proto::h2::flow::FlowControl;
use crate::proto::h2::frame::{Reason, StreamId};
use crate::proto::h2::hpack::HeaderEntry;
use crate::proto::h2::state::State;

/// One in-flight call: accumulated headers and body plus send-window
/// bookkeeping. Owned exclusively by its Connection and removed from the
/// stream table once it reaches `Closed` and is consumed.
#[derive(Debug)]
pub struct Stream {
    id: StreamId,
    pub(crate) state: State,
    pub(crate) send_window: FlowControl,
    pub(crate) headers: Vec<HeaderEntry>,
    pub(crate) body: BytesMut,
    pub(crate) reset: Option<Reason>,
}

impl Stream {
    pub fn new(id: StreamId, send_window: u32) -> Stream {
        Stream {
            id,
            state: State::default(),
            send_window: FlowControl::new(send_window),
            headers: Vec::new(),
            body: BytesMut::new(),
            reset: None,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn headers(&self) -> &[HeaderEntry] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Set when the peer reset this stream.
    pub fn reset_reason(&self) -> Option<Reason> {
        self.reset
    }

    pub fn is_recv_closed(&self) -> bool {
        self.state.is_recv_closed()
    }
}
