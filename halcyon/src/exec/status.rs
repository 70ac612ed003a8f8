use std::fmt;

/// Status codes embedded in response payloads.
///
/// A closed set of known codes plus an explicit escape carrying the raw
/// value. Codes the network adds later classify as retryable: new terminal
/// rejections would be a breaking network change, new transient conditions
/// are routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The call was accepted; for transactions this means accepted for
    /// consensus, not yet finalized.
    Ok,

    /// The request failed validation at the node.
    InvalidRequest,

    /// The node is overloaded; try again, possibly elsewhere.
    Busy,

    /// The request lacked a required authorization.
    Unauthorized,

    /// A call with this identifier was already submitted.
    DuplicateCall,

    /// A signature did not verify against the request body.
    InvalidSignature,

    /// The node is up but the platform is not serving yet.
    PlatformNotActive,

    /// The node cannot currently reach consensus peers.
    Unavailable,

    /// No receipt is known (yet) for the queried call identifier.
    ReceiptNotFound,

    /// No record is known (yet) for the queried call identifier.
    RecordNotFound,

    /// The call is known but its outcome is still pending.
    Pending,

    Unknown(u32),
}

/// How the executor reacts to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Retry,
    Terminal,
    Pending,
}

impl Status {
    pub fn from_code(code: u32) -> Status {
        match code {
            0 => Status::Ok,
            1 => Status::InvalidRequest,
            2 => Status::Busy,
            3 => Status::Unauthorized,
            4 => Status::DuplicateCall,
            5 => Status::InvalidSignature,
            6 => Status::PlatformNotActive,
            7 => Status::Unavailable,
            8 => Status::ReceiptNotFound,
            9 => Status::RecordNotFound,
            10 => Status::Pending,
            other => Status::Unknown(other),
        }
    }

    pub fn code(&self) -> u32 {
        match *self {
            Status::Ok => 0,
            Status::InvalidRequest => 1,
            Status::Busy => 2,
            Status::Unauthorized => 3,
            Status::DuplicateCall => 4,
            Status::InvalidSignature => 5,
            Status::PlatformNotActive => 6,
            Status::Unavailable => 7,
            Status::ReceiptNotFound => 8,
            Status::RecordNotFound => 9,
            Status::Pending => 10,
            Status::Unknown(other) => other,
        }
    }

    pub fn classify(&self) -> Outcome {
        match *self {
            Status::Ok => Outcome::Success,
            Status::Busy | Status::PlatformNotActive | Status::Unavailable => Outcome::Retry,
            Status::InvalidRequest
            | Status::Unauthorized
            | Status::DuplicateCall
            | Status::InvalidSignature => Outcome::Terminal,
            Status::ReceiptNotFound | Status::RecordNotFound | Status::Pending => Outcome::Pending,
            Status::Unknown(_) => Outcome::Retry,
        }
    }

    pub fn is_success(&self) -> bool {
        self.classify() == Outcome::Success
    }

    /// Pending statuses keep a receipt poll going; anything else is final.
    pub fn is_pending(&self) -> bool {
        self.classify() == Outcome::Pending
    }
}

impl fmt::Display for Status {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Status::Unknown(code) => write!(fmt, "UNKNOWN({})", code),
            other => write!(fmt, "{:?} ({})", other, other.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip() {
        for code in 0..16 {
            assert_eq!(Status::from_code(code).code(), code);
        }
    }

    #[test]
    fn classification() {
        assert_eq!(Status::Ok.classify(), Outcome::Success);
        assert_eq!(Status::Busy.classify(), Outcome::Retry);
        assert_eq!(Status::Unavailable.classify(), Outcome::Retry);
        assert_eq!(Status::InvalidRequest.classify(), Outcome::Terminal);
        assert_eq!(Status::Unauthorized.classify(), Outcome::Terminal);
        assert_eq!(Status::ReceiptNotFound.classify(), Outcome::Pending);
        assert_eq!(Status::Unknown(999).classify(), Outcome::Retry);
    }
}
