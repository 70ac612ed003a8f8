//! Fixed protobuf field numbers for the envelope and receipt messages the
//! executor encodes and decodes itself.
//!
//! These numbers are part of the network's wire contract and must never
//! change. Operation payload numbers (for example 24 for create-topic, 35
//! and 36 for the administrative delete/undelete pair) belong to the
//! external builders.

pub mod entity_id {
    pub const SHARD: u32 = 1;
    pub const REALM: u32 = 2;
    pub const NUM: u32 = 3;
}

pub mod timestamp {
    pub const SECONDS: u32 = 1;
    pub const NANOS: u32 = 2;
}

pub mod call_id {
    pub const VALID_START: u32 = 1;
    pub const ACCOUNT: u32 = 2;
    pub const SCHEDULED: u32 = 3;
    pub const NONCE: u32 = 4;
}

pub mod transaction_response {
    pub const PRECHECK: u32 = 1;
    pub const COST: u32 = 2;
}

pub mod query {
    /// Oneof arm selecting the receipt query.
    pub const RECEIPT_QUERY: u32 = 4;
}

pub mod receipt_query {
    pub const HEADER: u32 = 1;
    pub const CALL_ID: u32 = 2;
}

pub mod response {
    /// Oneof arm carrying the receipt response.
    pub const RECEIPT_RESPONSE: u32 = 4;
}

pub mod receipt_response {
    pub const HEADER: u32 = 1;
    pub const RECEIPT: u32 = 2;
}

pub mod response_header {
    pub const STATUS: u32 = 1;
    pub const RESPONSE_TYPE: u32 = 2;
    pub const COST: u32 = 3;
}

pub mod receipt {
    pub const STATUS: u32 = 1;
}
