use std::fmt;

use serde::{Deserialize, Serialize};

/// The ledger-wide numeric identifier of an account or node: a
/// shard/realm/serial-number triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl EntityId {
    pub fn new(shard: u64, realm: u64, num: u64) -> EntityId {
        EntityId { shard, realm, num }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

/// One server endpoint capable of accepting calls on behalf of the whole
/// ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeEndpoint {
    /// `host:port` to dial.
    pub address: String,

    /// Server name to present during the TLS handshake.
    pub tls_name: String,

    /// The node's identity inside request envelopes.
    pub id: EntityId,
}

impl NodeEndpoint {
    pub fn new<A, T>(address: A, tls_name: T, id: EntityId) -> NodeEndpoint
    where
        A: Into<String>,
        T: Into<String>,
    {
        NodeEndpoint {
            address: address.into(),
            tls_name: tls_name.into(),
            id,
        }
    }
}

impl fmt::Display for NodeEndpoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{} ({})", self.address, self.id)
    }
}
