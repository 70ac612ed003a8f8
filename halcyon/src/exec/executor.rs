use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exec::backoff::Backoff;
use crate::exec::call_id::CallId;
use crate::exec::dial::{Dialer, NodeChannel};
use crate::exec::fields;
use crate::exec::node::NodeEndpoint;
use crate::exec::status::{Outcome, Status};
use crate::observe::{default_observer, SharedObserver};
use crate::proto::call::{self, CallError};
use crate::proto::h2::{Connection, ConnectionConfig, H2Error};
use crate::proto::tls::{TlsConfig, TlsSession};
use crate::wire::{Decoder, Encoder};

/// Encodes one request body for a given call identifier and target node.
///
/// Operation builders live outside this crate; the executor re-invokes the
/// seam on every attempt so a regenerated identifier or a different target
/// node is always reflected in the bytes that go out.
pub trait BuildRequest {
    fn encode(&self, id: &CallId, node: &NodeEndpoint) -> Bytes;
}

impl<F> BuildRequest for F
where
    F: Fn(&CallId, &NodeEndpoint) -> Bytes,
{
    fn encode(&self, id: &CallId, node: &NodeEndpoint) -> Bytes {
        self(id, node)
    }
}

/// Whether a call changes ledger state (and therefore has a receipt).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Transaction,
    Query,
}

/// The executor's view of one user request.
pub struct PendingCall {
    pub path: String,
    pub kind: CallKind,
    pub nodes: Vec<NodeEndpoint>,
    pub call_id: CallId,
    pub deadline: Option<Instant>,
    pub attempt: u32,
    builder: Box<dyn BuildRequest>,
}

impl PendingCall {
    pub fn new<P, B>(
        path: P,
        kind: CallKind,
        builder: B,
        nodes: Vec<NodeEndpoint>,
        call_id: CallId,
    ) -> PendingCall
    where
        P: Into<String>,
        B: BuildRequest + 'static,
    {
        PendingCall {
            path: path.into(),
            kind,
            nodes,
            call_id,
            deadline: None,
            attempt: 0,
            builder: Box::new(builder),
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> PendingCall {
        self.deadline = Some(deadline);
        self
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("PendingCall")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("nodes", &self.nodes.len())
            .field("call_id", &self.call_id)
            .field("attempt", &self.attempt)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,

    /// Deadline for a single send/receive exchange.
    pub attempt_timeout: Duration,

    /// Mint a fresh call identifier before each retry instead of reusing
    /// the original. Reuse is the default: it lets the network deduplicate
    /// a retry whose first submission actually landed.
    pub regenerate_call_id: bool,

    pub backoff: Backoff,

    pub receipt_poll_interval: Duration,
    pub receipt_deadline: Duration,
    pub receipt_query_path: String,
}

impl Default for RetryConfig {
    fn default() -> RetryConfig {
        RetryConfig {
            max_attempts: 10,
            attempt_timeout: Duration::from_secs(10),
            regenerate_call_id: false,
            backoff: Backoff::default(),
            receipt_poll_interval: Duration::from_millis(500),
            receipt_deadline: Duration::from_secs(30),
            receipt_query_path: "/ledger.NetworkService/getReceipt".to_owned(),
        }
    }
}

/// A durable record of a state-changing call's final outcome.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub status: Status,
    pub raw: Bytes,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: Status,
    pub payload: Bytes,
    pub node: NodeEndpoint,
    pub attempts: u32,
    pub receipt: Option<Receipt>,
}

/// What went wrong with one attempt; retained so a terminal error can say
/// why the last retry failed.
#[derive(Debug, Clone)]
pub enum Failure {
    Status(Status),
    Connection(String),
    Timeout,
}

impl fmt::Display for Failure {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Failure::Status(status) => write!(fmt, "node answered {}", status),
            Failure::Connection(msg) => write!(fmt, "connection failed: {}", msg),
            Failure::Timeout => write!(fmt, "attempt timed out"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    /// The network rejected the request. Never retried.
    #[error("request rejected by {node}: {status}")]
    Rejected { status: Status, node: NodeEndpoint },

    /// Every allowed attempt failed with something retryable; the caller
    /// may try again later or against other nodes.
    #[error("retries exhausted after {attempts} attempts; last failure: {last}")]
    RetriesExhausted { attempts: u32, last: Failure },

    /// The overall deadline elapsed with the last attempt still retryable.
    #[error("deadline elapsed after {attempts} attempts; last failure: {last}")]
    DeadlineExceeded { attempts: u32, last: Failure },

    /// The call succeeded but no final receipt appeared in time.
    #[error("no final receipt for {id} within the polling deadline; last status: {last}")]
    ReceiptTimeout { id: CallId, last: Status },

    #[error("no candidate nodes")]
    NoNodes,
}

/// Drives a [`PendingCall`] to a terminal outcome across a ranked list of
/// candidate nodes.
pub struct Executor<D: Dialer> {
    dialer: D,
    config: RetryConfig,
    conn_config: ConnectionConfig,
    tls: Option<TlsConfig>,
    observer: SharedObserver,
    connections: FnvHashMap<String, Connection<NodeChannel<D::Channel>>>,
}

impl<D: Dialer> Executor<D> {
    pub fn new(dialer: D, config: RetryConfig) -> Executor<D> {
        Executor {
            dialer,
            config,
            conn_config: ConnectionConfig::default(),
            tls: None,
            observer: default_observer(),
            connections: FnvHashMap::default(),
        }
    }

    /// Wrap node channels in the TLS layer.
    pub fn with_tls(mut self, tls: TlsConfig) -> Executor<D> {
        self.tls = Some(tls);
        self
    }

    pub fn with_connection_config(mut self, conn_config: ConnectionConfig) -> Executor<D> {
        self.conn_config = conn_config;
        self
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Executor<D> {
        self.observer = observer;
        self
    }

    /// Run `call` to a terminal outcome: success (plus a final receipt for
    /// transactions), a terminal rejection, or exhaustion of the retry
    /// budget.
    pub fn execute(&mut self, call: &mut PendingCall) -> Result<Response, ExecError> {
        if call.nodes.is_empty() {
            return Err(ExecError::NoNodes);
        }

        let mut last = Failure::Timeout;

        loop {
            if call.attempt >= self.config.max_attempts {
                return Err(ExecError::RetriesExhausted {
                    attempts: call.attempt,
                    last,
                });
            }
            if let Some(deadline) = call.deadline {
                if Instant::now() >= deadline {
                    return Err(ExecError::DeadlineExceeded {
                        attempts: call.attempt,
                        last,
                    });
                }
            }

            let node = call.nodes[call.attempt as usize % call.nodes.len()].clone();
            call.attempt += 1;
            self.observer.debug(format_args!(
                "attempt {}; node={}; id={}",
                call.attempt, node, call.call_id
            ));

            match self.attempt(call, &node) {
                Ok((status, payload)) => match status.classify() {
                    Outcome::Success => {
                        let receipt = match call.kind {
                            CallKind::Transaction => Some(self.poll_receipt(call)?),
                            CallKind::Query => None,
                        };
                        return Ok(Response {
                            status,
                            payload,
                            node,
                            attempts: call.attempt,
                            receipt,
                        });
                    }
                    Outcome::Terminal => {
                        return Err(ExecError::Rejected { status, node });
                    }
                    Outcome::Retry | Outcome::Pending => {
                        last = Failure::Status(status);
                    }
                },
                Err(failure) => {
                    // Whatever happened, the cached connection is suspect.
                    self.connections.remove(&node.address);
                    last = failure;
                }
            }

            self.observer.debug(format_args!(
                "attempt {} failed ({}); id={}",
                call.attempt, last, call.call_id
            ));

            if call.attempt < self.config.max_attempts {
                thread::sleep(self.config.backoff.delay(call.attempt - 1));
                if self.config.regenerate_call_id {
                    call.call_id = CallId::generate(call.call_id.account);
                }
            }
        }
    }

    fn attempt(
        &mut self,
        call: &PendingCall,
        node: &NodeEndpoint,
    ) -> Result<(Status, Bytes), Failure> {
        let payload = call.builder.encode(&call.call_id, node);
        let body = self.call_once(node, &call.path, &payload)?;
        let status = decode_precheck(&body)?;
        Ok((status, body))
    }

    /// One full exchange on a (possibly cached) connection to `node`.
    fn call_once(
        &mut self,
        node: &NodeEndpoint,
        path: &str,
        payload: &[u8],
    ) -> Result<Bytes, Failure> {
        let deadline = Instant::now() + self.config.attempt_timeout;
        let conn = self.connection(node)?;
        let id = call::send_request(conn, path, &node.address, payload).map_err(map_call_err)?;
        call::await_response(conn, id, deadline).map_err(map_call_err)
    }

    fn connection(
        &mut self,
        node: &NodeEndpoint,
    ) -> Result<&mut Connection<NodeChannel<D::Channel>>, Failure> {
        use std::collections::hash_map::Entry;

        match self.connections.entry(node.address.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let channel = self
                    .dialer
                    .dial(node)
                    .map_err(|err| Failure::Connection(err.to_string()))?;
                let channel = match &self.tls {
                    Some(tls) => NodeChannel::Tls(
                        TlsSession::handshake(channel, &node.tls_name, tls, &self.observer)
                            .map_err(|err| Failure::Connection(err.to_string()))?,
                    ),
                    None => NodeChannel::Plain(channel),
                };
                let conn =
                    Connection::handshake(channel, self.conn_config.clone(), self.observer.clone())
                        .map_err(|err| Failure::Connection(err.to_string()))?;
                Ok(entry.insert(conn))
            }
        }
    }

    /// Periodically query the receipt for `call`'s identifier until a final
    /// status is observed or the polling deadline elapses.
    fn poll_receipt(&mut self, call: &PendingCall) -> Result<Receipt, ExecError> {
        let deadline = Instant::now() + self.config.receipt_deadline;
        let query = encode_receipt_query(&call.call_id);
        let path = self.config.receipt_query_path.clone();
        let mut last = Status::ReceiptNotFound;
        let mut poll = 0usize;

        loop {
            thread::sleep(self.config.receipt_poll_interval);
            if Instant::now() >= deadline {
                return Err(ExecError::ReceiptTimeout {
                    id: call.call_id,
                    last,
                });
            }

            let node = call.nodes[poll % call.nodes.len()].clone();
            poll += 1;

            let body = match self.call_once(&node, &path, &query) {
                Ok(body) => body,
                Err(failure) => {
                    self.connections.remove(&node.address);
                    self.observer.debug(format_args!(
                        "receipt poll failed ({}); id={}",
                        failure, call.call_id
                    ));
                    continue;
                }
            };

            match decode_receipt(&body) {
                Ok(ReceiptAnswer {
                    receipt: Some(receipt),
                    ..
                }) if !receipt.status.is_pending() => {
                    self.observer.debug(format_args!(
                        "receipt final; id={}; status={}",
                        call.call_id, receipt.status
                    ));
                    return Ok(receipt);
                }
                Ok(answer) => {
                    last = answer
                        .receipt
                        .map(|receipt| receipt.status)
                        .unwrap_or(answer.header);
                    if answer.header.classify() == Outcome::Terminal {
                        return Err(ExecError::Rejected {
                            status: answer.header,
                            node,
                        });
                    }
                }
                Err(failure) => {
                    self.observer.debug(format_args!(
                        "receipt poll undecodable ({}); id={}",
                        failure, call.call_id
                    ));
                }
            }
        }
    }
}

fn map_call_err(err: CallError) -> Failure {
    match err {
        CallError::Timeout => Failure::Timeout,
        CallError::H2(H2Error::Io(ref io_err))
            if io_err.kind() == std::io::ErrorKind::TimedOut
                || io_err.kind() == std::io::ErrorKind::WouldBlock =>
        {
            Failure::Timeout
        }
        other => Failure::Connection(other.to_string()),
    }
}

/// The submit response carries the node's validation result in one varint
/// field; an absent field means code zero, accepted.
fn decode_precheck(body: &[u8]) -> Result<Status, Failure> {
    let mut status = Status::Ok;
    let mut dec = Decoder::new(body);
    loop {
        match dec.next_field() {
            Ok(Some((fields::transaction_response::PRECHECK, _))) => {
                status = Status::from_code(
                    dec.read_uint32()
                        .map_err(|err| Failure::Connection(err.to_string()))?,
                );
            }
            Ok(Some((_, wire_type))) => {
                dec.skip(wire_type)
                    .map_err(|err| Failure::Connection(err.to_string()))?;
            }
            Ok(None) => return Ok(status),
            Err(err) => return Err(Failure::Connection(err.to_string())),
        }
    }
}

fn encode_receipt_query(id: &CallId) -> Bytes {
    let id = *id;
    let mut enc = Encoder::new();
    enc.message(fields::query::RECEIPT_QUERY, |query| {
        id.encode_into(fields::receipt_query::CALL_ID, query);
    });
    enc.finish()
}

struct ReceiptAnswer {
    header: Status,
    receipt: Option<Receipt>,
}

fn decode_receipt(body: &[u8]) -> Result<ReceiptAnswer, Failure> {
    let conn_err = |err: crate::wire::DecodeError| Failure::Connection(err.to_string());

    let mut header = Status::Ok;
    let mut receipt = None;

    let mut dec = Decoder::new(body);
    while let Some((field, wire_type)) = dec.next_field().map_err(conn_err)? {
        if field != fields::response::RECEIPT_RESPONSE {
            dec.skip(wire_type).map_err(conn_err)?;
            continue;
        }

        let mut answer = dec.read_message().map_err(conn_err)?;
        while let Some((field, wire_type)) = answer.next_field().map_err(conn_err)? {
            match field {
                fields::receipt_response::HEADER => {
                    let mut head = answer.read_message().map_err(conn_err)?;
                    while let Some((field, wire_type)) = head.next_field().map_err(conn_err)? {
                        match field {
                            fields::response_header::STATUS => {
                                header =
                                    Status::from_code(head.read_uint32().map_err(conn_err)?);
                            }
                            _ => head.skip(wire_type).map_err(conn_err)?,
                        }
                    }
                }
                fields::receipt_response::RECEIPT => {
                    let raw = answer.read_bytes().map_err(conn_err)?;
                    let mut inner = Decoder::new(raw);
                    let mut status = Status::Pending;
                    while let Some((field, wire_type)) = inner.next_field().map_err(conn_err)? {
                        match field {
                            fields::receipt::STATUS => {
                                status =
                                    Status::from_code(inner.read_uint32().map_err(conn_err)?);
                            }
                            _ => inner.skip(wire_type).map_err(conn_err)?,
                        }
                    }
                    receipt = Some(Receipt {
                        status,
                        raw: Bytes::copy_from_slice(raw),
                    });
                }
                _ => answer.skip(wire_type).map_err(conn_err)?,
            }
        }
    }

    Ok(ReceiptAnswer { header, receipt })
}
