//! A client library for a permissioned distributed-ledger network whose
//! public surface is protobuf-encoded remote calls over HTTP/2 over TLS.
//!
//! The crate is organized bottom-up:
//!
//! - [`wire`]: protobuf-style tagged field encoding and decoding. No I/O.
//! - [`proto::tls`]: client handshake and record framing over a raw byte
//!   channel.
//! - [`proto::h2`]: HTTP/2 connection, stream multiplexing, flow control,
//!   and literal-only header compression.
//! - [`proto::call`]: one request/response call framed as a length-prefixed
//!   message inside DATA frames on a dedicated stream.
//! - [`exec`]: the submission orchestrator - node selection, retry with
//!   backoff, outcome classification, and receipt polling.
//!
//! Operation builders and key material live outside this crate; they plug in
//! through [`exec::BuildRequest`] and [`sign::Signer`].
//!
//! ## Example
//!
//! ```ignore
//! use halcyon::exec::{CallKind, Executor, PendingCall, RetryConfig, TcpDialer};
//!
//! let mut executor = Executor::new(TcpDialer::default(), RetryConfig::default());
//! let mut call = PendingCall::new(
//!     "/ledger.CryptoService/createAccount",
//!     CallKind::Transaction,
//!     builder,
//!     nodes,
//!     call_id,
//! );
//! let response = executor.execute(&mut call)?;
//! ```

pub mod error;
pub mod exec;
pub mod observe;
pub mod proto;
pub mod sign;
pub mod wire;

pub use crate::error::{Error, Result};
pub use crate::exec::{CallId, EntityId, Executor, NodeEndpoint, PendingCall, Status};
pub use crate::observe::{NoopObserver, Observer, SharedObserver, TracingObserver};
pub use crate::sign::Signer;
