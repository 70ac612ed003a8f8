use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::exec::node::NodeEndpoint;
use crate::proto::tls::TlsSession;

/// Opens raw byte channels to candidate nodes. Tests substitute scripted
/// channels through this seam.
pub trait Dialer {
    type Channel: Read + Write;

    fn dial(&self, node: &NodeEndpoint) -> io::Result<Self::Channel>;
}

/// Plain TCP with connect and read timeouts.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    pub connect_timeout: Duration,
    pub read_timeout: Option<Duration>,
}

impl Default for TcpDialer {
    fn default() -> TcpDialer {
        TcpDialer {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl Dialer for TcpDialer {
    type Channel = TcpStream;

    fn dial(&self, node: &NodeEndpoint) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in node.address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(self.read_timeout)?;
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no addresses resolved for {}", node.address),
            )
        }))
    }
}

/// A node channel, with or without the TLS layer underneath.
pub enum NodeChannel<S> {
    Plain(S),
    Tls(TlsSession<S>),
}

impl<S: Read> Read for NodeChannel<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            NodeChannel::Plain(channel) => channel.read(buf),
            NodeChannel::Tls(session) => session.read(buf),
        }
    }
}

impl<S: Write> Write for NodeChannel<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            NodeChannel::Plain(channel) => channel.write(buf),
            NodeChannel::Tls(session) => session.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            NodeChannel::Plain(channel) => channel.flush(),
            NodeChannel::Tls(session) => session.flush(),
        }
    }
}
