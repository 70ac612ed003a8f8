//! Submission orchestration: node selection, retry with backoff, outcome
//! classification, and receipt polling.

mod backoff;
mod call_id;
mod dial;
mod executor;
mod node;
mod status;

pub mod fields;

pub use backoff::Backoff;
pub use call_id::CallId;
pub use dial::{Dialer, NodeChannel, TcpDialer};
pub use executor::{
    BuildRequest, CallKind, ExecError, Executor, Failure, PendingCall, Receipt, Response,
    RetryConfig,
};
pub use node::{EntityId, NodeEndpoint};
pub use status::{Outcome, Status};
