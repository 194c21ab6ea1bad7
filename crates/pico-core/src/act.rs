use serde::{Deserialize, Serialize};

use crate::types::Hash;

/// The discriminated payload of a transaction.
///
/// On the wire an act is an object with exactly one discriminant key
/// (`ivc` / `pay` / `msg` / `rew`); `#[serde(untagged)]` with distinct field
/// names reproduces that shape, and an unknown tag matches no variant and is
/// rejected at parse time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Act {
    /// Request for payment; informational only.
    Invoice { ivc: u64 },

    /// Transfer of coins from sender to recipient.
    Payment { pay: u64 },

    /// Free text; no economic effect.
    Message { msg: String },

    /// Coinbase credit for the solver of block `blk`. Carried by a
    /// transaction with a null sender.
    Reward { rew: f64, blk: Hash },
}

impl Act {
    pub fn is_reward(&self) -> bool {
        matches!(self, Act::Reward { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_key_wire_shape() {
        let json = serde_json::to_string(&Act::Invoice { ivc: 5 }).unwrap();
        assert_eq!(json, r#"{"ivc":5}"#);

        let json = serde_json::to_string(&Act::Payment { pay: 10 }).unwrap();
        assert_eq!(json, r#"{"pay":10}"#);

        let json = serde_json::to_string(&Act::Message { msg: "hi".into() }).unwrap();
        assert_eq!(json, r#"{"msg":"hi"}"#);
    }

    #[test]
    fn reward_keeps_field_order_and_float_form() {
        let act = Act::Reward {
            rew: 256.0,
            blk: Hash::from_digest([0; 32]),
        };
        let json = serde_json::to_string(&act).unwrap();
        assert!(json.starts_with(r#"{"rew":256.0,"blk":""#));
    }

    #[test]
    fn parses_each_tag() {
        assert_eq!(
            serde_json::from_str::<Act>(r#"{"pay":42}"#).unwrap(),
            Act::Payment { pay: 42 }
        );
        assert_eq!(
            serde_json::from_str::<Act>(r#"{"msg":"x"}"#).unwrap(),
            Act::Message { msg: "x".into() }
        );
        assert!(matches!(
            serde_json::from_str::<Act>(r#"{"rew":1.5,"blk":"ab"}"#).unwrap(),
            Act::Reward { .. }
        ));
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(serde_json::from_str::<Act>(r#"{"steal":1}"#).is_err());
        assert!(serde_json::from_str::<Act>(r#"{"rew":1.0}"#).is_err());
    }
}
