//! Crate-level error type.

use thiserror::Error;

/// Top-level error for all halcyon operations.
///
/// Layer errors propagate unchanged; only the executor converts an error
/// into a retry decision versus a caller-visible terminal failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("tls: {0}")]
    Tls(#[from] crate::proto::tls::TlsError),

    #[error("http/2: {0}")]
    H2(#[from] crate::proto::h2::H2Error),

    #[error("call: {0}")]
    Call(#[from] crate::proto::call::CallError),

    #[error("wire: {0}")]
    Wire(#[from] crate::wire::DecodeError),

    #[error("exec: {0}")]
    Exec(#[from] crate::exec::ExecError),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
