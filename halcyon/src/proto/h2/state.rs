use crate::proto::h2::frame::Reason;
use crate::proto::h2::H2Error;

use self::State::*;

/// Per-stream state.
///
/// Sending or receiving a HEADERS or DATA frame with the end-stream flag
/// moves a stream from `Open` toward whichever half-closed state matches the
/// direction that just completed; RST_STREAM forces `Closed` from any state.
/// The reserved states exist for server pushes, which this client never
/// accepts but still models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    ReservedLocal,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

impl State {
    /// A HEADERS or DATA frame is about to go out on this stream.
    pub fn send_frame(&mut self, end_stream: bool) -> Result<(), H2Error> {
        *self = match *self {
            Idle | Open => {
                if end_stream {
                    HalfClosedLocal
                } else {
                    Open
                }
            }
            HalfClosedRemote => {
                if end_stream {
                    Closed
                } else {
                    HalfClosedRemote
                }
            }
            ReservedLocal => {
                if end_stream {
                    Closed
                } else {
                    HalfClosedRemote
                }
            }
            state => {
                return Err(H2Error::Protocol(format!(
                    "send on stream in state {:?}",
                    state
                )))
            }
        };

        Ok(())
    }

    /// A HEADERS or DATA frame arrived for this stream.
    pub fn recv_frame(&mut self, end_stream: bool) -> Result<(), H2Error> {
        *self = match *self {
            Idle | Open => {
                if end_stream {
                    HalfClosedRemote
                } else {
                    Open
                }
            }
            HalfClosedLocal => {
                if end_stream {
                    Closed
                } else {
                    HalfClosedLocal
                }
            }
            ReservedRemote => {
                if end_stream {
                    Closed
                } else {
                    HalfClosedLocal
                }
            }
            state => {
                return Err(H2Error::Protocol(format!(
                    "recv on stream in state {:?}",
                    state
                )))
            }
        };

        Ok(())
    }

    /// RST_STREAM, either direction.
    pub fn recv_reset(&mut self, _reason: Reason) {
        *self = Closed;
    }

    pub fn is_closed(&self) -> bool {
        match *self {
            Closed => true,
            _ => false,
        }
    }

    /// No more frames will arrive from the peer.
    pub fn is_recv_closed(&self) -> bool {
        match *self {
            Closed | HalfClosedRemote | ReservedLocal => true,
            _ => false,
        }
    }

    pub fn is_send_closed(&self) -> bool {
        match *self {
            Closed | HalfClosedLocal | ReservedRemote => true,
            _ => false,
        }
    }
}

impl Default for State {
    fn default() -> State {
        State::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recv_headers_then_final_data() {
        let mut state = State::Idle;
        state.recv_frame(false).unwrap();
        assert_eq!(state, State::Open);
        state.recv_frame(true).unwrap();
        assert_eq!(state, State::HalfClosedRemote);
    }

    #[test]
    fn full_client_call_lifecycle() {
        let mut state = State::Idle;
        // HEADERS out, then DATA out with end-stream.
        state.send_frame(false).unwrap();
        state.send_frame(true).unwrap();
        assert_eq!(state, State::HalfClosedLocal);
        assert!(state.is_send_closed());
        // Response HEADERS, DATA, trailers with end-stream.
        state.recv_frame(false).unwrap();
        state.recv_frame(false).unwrap();
        state.recv_frame(true).unwrap();
        assert!(state.is_closed());
    }

    #[test]
    fn reset_closes_from_any_state() {
        for start in [
            State::Idle,
            State::Open,
            State::HalfClosedLocal,
            State::HalfClosedRemote,
            State::ReservedLocal,
            State::ReservedRemote,
        ]
        .iter()
        {
            let mut state = *start;
            state.recv_reset(Reason::CANCEL);
            assert!(state.is_closed());
        }
    }

    #[test]
    fn send_after_close_is_an_error() {
        let mut state = State::Closed;
        assert!(state.send_frame(false).is_err());
    }
}
