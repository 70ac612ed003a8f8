use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::exec::fields;
use crate::exec::node::EntityId;
use crate::wire::Encoder;

/// The identifier correlating a submitted call with its eventual receipt:
/// the paying account plus a valid-start timestamp and an optional nonce.
///
/// Unique per logical call; stable across retries unless the caller opted
/// into regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallId {
    pub account: EntityId,
    pub seconds: i64,
    pub nanos: i32,
    pub nonce: Option<i32>,
}

impl CallId {
    /// A fresh identifier stamped with the current wall clock.
    pub fn generate(account: EntityId) -> CallId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        CallId {
            account,
            seconds: now.as_secs() as i64,
            nanos: now.subsec_nanos() as i32,
            nonce: None,
        }
    }

    pub fn with_nonce(mut self, nonce: i32) -> CallId {
        self.nonce = Some(nonce);
        self
    }

    /// Write this identifier as one submessage field of `enc`.
    pub fn encode_into(&self, field: u32, enc: &mut Encoder) {
        let id = *self;
        enc.message(field, |msg| {
            msg.message(fields::call_id::VALID_START, |ts| {
                ts.int64(fields::timestamp::SECONDS, id.seconds);
                ts.int32(fields::timestamp::NANOS, id.nanos);
            });
            msg.message(fields::call_id::ACCOUNT, |account| {
                account.uint64(fields::entity_id::SHARD, id.account.shard);
                account.uint64(fields::entity_id::REALM, id.account.realm);
                account.uint64(fields::entity_id::NUM, id.account.num);
            });
            if let Some(nonce) = id.nonce {
                msg.int32(fields::call_id::NONCE, nonce);
            }
        });
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}@{}.{}", self.account, self.seconds, self.nanos)?;
        if let Some(nonce) = self.nonce {
            write!(fmt, "/{}", nonce)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Decoder;

    #[test]
    fn encode_preserves_field_numbers() {
        let id = CallId {
            account: EntityId::new(0, 0, 1001),
            seconds: 1_700_000_000,
            nanos: 42,
            nonce: Some(3),
        };

        let mut enc = Encoder::new();
        id.encode_into(2, &mut enc);
        let buf = enc.finish();

        let mut dec = Decoder::new(&buf);
        let (field, _) = dec.next_field().unwrap().unwrap();
        assert_eq!(field, 2);

        let mut msg = dec.read_message().unwrap();
        let mut seconds = 0;
        let mut num = 0;
        let mut nonce = None;
        while let Some((field, wire_type)) = msg.next_field().unwrap() {
            match field {
                fields::call_id::VALID_START => {
                    let mut ts = msg.read_message().unwrap();
                    while let Some((field, wire_type)) = ts.next_field().unwrap() {
                        match field {
                            fields::timestamp::SECONDS => seconds = ts.read_int64().unwrap(),
                            _ => ts.skip(wire_type).unwrap(),
                        }
                    }
                }
                fields::call_id::ACCOUNT => {
                    let mut account = msg.read_message().unwrap();
                    while let Some((field, wire_type)) = account.next_field().unwrap() {
                        match field {
                            fields::entity_id::NUM => num = account.read_uint64().unwrap(),
                            _ => account.skip(wire_type).unwrap(),
                        }
                    }
                }
                fields::call_id::NONCE => nonce = Some(msg.read_int32().unwrap()),
                _ => msg.skip(wire_type).unwrap(),
            }
        }

        assert_eq!(seconds, 1_700_000_000);
        assert_eq!(num, 1001);
        assert_eq!(nonce, Some(3));
    }

    #[test]
    fn generated_ids_advance() {
        let account = EntityId::new(0, 0, 2);
        let a = CallId::generate(account);
        assert!(a.seconds > 0);
        assert_eq!(a.account, account);
        assert_eq!(a.nonce, None);
    }
}
