//! Client-side TLS transport.
//!
//! A single client-driven handshake over a raw bidirectional byte stream:
//! send a ClientHello advertising a fixed set of cipher suites and the
//! required extensions, then read server records until a ServerHello or a
//! terminal alert. After the handshake the session is a plain read/write
//! passthrough to the channel; there is no retry and no renegotiation.

mod handshake;
mod record;

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observe::SharedObserver;

pub use record::{ContentType, RecordHead, RECORD_HEADER_LEN};

#[derive(Debug, Error)]
pub enum TlsError {
    /// A record declared a length exceeding the configured read buffer.
    #[error("record length {len} exceeds the read buffer ({max})")]
    RecordOverflow { len: usize, max: usize },

    /// The peer sent an alert record during the handshake.
    #[error("alert received: level={level}, description={description}")]
    AlertReceived { level: u8, description: u8 },

    #[error("i/o: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Upper bound on a single record's declared payload length.
    pub max_record_len: usize,

    /// Treat a handshake_failure alert during negotiation as a usable,
    /// degraded session instead of an error. Off by default; opting in
    /// means the caller accepts a non-validating connection.
    pub tolerate_handshake_failure: bool,
}

impl Default for TlsConfig {
    fn default() -> TlsConfig {
        TlsConfig {
            max_record_len: 16 * 1024 + 256,
            tolerate_handshake_failure: false,
        }
    }
}

/// An established session over `S`.
pub struct TlsSession<S> {
    channel: S,
}

impl<S: Read + Write> TlsSession<S> {
    /// Drive the client handshake to completion and wrap the channel.
    pub fn handshake(
        mut channel: S,
        server_name: &str,
        config: &TlsConfig,
        observer: &SharedObserver,
    ) -> Result<TlsSession<S>, TlsError> {
        handshake::run(&mut channel, server_name, config, observer)?;
        Ok(TlsSession { channel })
    }

    pub fn get_ref(&self) -> &S {
        &self.channel
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.channel
    }

    pub fn into_inner(self) -> S {
        self.channel
    }
}

impl<S: Read> Read for TlsSession<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.channel.read(buf)
    }
}

impl<S: Write> Write for TlsSession<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.channel.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.channel.flush()
    }
}
