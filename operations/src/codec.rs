//! Wire codec for operation payloads.
//!
//! Layout: `opcode (1 byte) || body`, where the body is the operation struct
//! in bincode with fixed-width little-endian integers and u64 length
//! prefixes. Decoding is strict: the body must be consumed exactly and must
//! re-encode to the same bytes, so every operation has one encoding.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{CodecError, Opcode, Operation};

/// Largest payload, opcode included, that a node will decode.
pub const MAX_PAYLOAD_LEN: usize = 4096;

fn encode_options() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

fn decode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_PAYLOAD_LEN as u64)
}

/// Encode an operation into its payload bytes.
pub fn encode(op: &Operation) -> Result<Vec<u8>, CodecError> {
    let (opcode, body) = match op {
        Operation::RegisterDelegate(b) => (Opcode::RegisterDelegate.as_u8(), body_bytes(b)?),
        Operation::VoteDelegates(b) => (Opcode::VoteDelegates.as_u8(), body_bytes(b)?),
        Operation::RevokeDelegates(b) => (Opcode::RevokeDelegates.as_u8(), body_bytes(b)?),
        Operation::RegisterCommittee(b) => (Opcode::RegisterCommittee.as_u8(), body_bytes(b)?),
        Operation::VoteCommittee(b) => (Opcode::VoteCommittee.as_u8(), body_bytes(b)?),
        Operation::RevokeCommittee(b) => (Opcode::RevokeCommittee.as_u8(), body_bytes(b)?),
        Operation::SubmitBill(b) => (Opcode::SubmitBill.as_u8(), body_bytes(b)?),
        Operation::VoteBill(b) => (Opcode::VoteBill.as_u8(), body_bytes(b)?),
        Operation::RegisterName(b) => (Opcode::RegisterName.as_u8(), body_bytes(b)?),
        Operation::CreateToken(b) => (Opcode::CreateToken.as_u8(), body_bytes(b)?),
        Operation::TransferToken(b) => (Opcode::TransferToken.as_u8(), body_bytes(b)?),
        Operation::LockToken(b) => (Opcode::LockToken.as_u8(), body_bytes(b)?),
        Operation::Unrecognized { opcode, body } => (*opcode, body.clone()),
    };

    let len = body.len() + 1;
    if len > MAX_PAYLOAD_LEN {
        return Err(CodecError::TooLarge {
            len,
            max: MAX_PAYLOAD_LEN,
        });
    }
    let mut out = Vec::with_capacity(len);
    out.push(opcode);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode payload bytes into an operation.
///
/// Unknown opcodes are not an error: they decode to
/// [`Operation::Unrecognized`] so that newer operation kinds pass through
/// older nodes untouched.
pub fn decode(bytes: &[u8]) -> Result<Operation, CodecError> {
    let (&first, body) = bytes.split_first().ok_or(CodecError::Empty)?;
    if bytes.len() > MAX_PAYLOAD_LEN {
        return Err(CodecError::TooLarge {
            len: bytes.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let Some(opcode) = Opcode::from_u8(first) else {
        return Ok(Operation::Unrecognized {
            opcode: first,
            body: body.to_vec(),
        });
    };

    let op = match opcode {
        Opcode::RegisterDelegate => Operation::RegisterDelegate(parse_body(opcode, body)?),
        Opcode::VoteDelegates => Operation::VoteDelegates(parse_body(opcode, body)?),
        Opcode::RevokeDelegates => Operation::RevokeDelegates(parse_body(opcode, body)?),
        Opcode::RegisterCommittee => Operation::RegisterCommittee(parse_body(opcode, body)?),
        Opcode::VoteCommittee => Operation::VoteCommittee(parse_body(opcode, body)?),
        Opcode::RevokeCommittee => Operation::RevokeCommittee(parse_body(opcode, body)?),
        Opcode::SubmitBill => Operation::SubmitBill(parse_body(opcode, body)?),
        Opcode::VoteBill => Operation::VoteBill(parse_body(opcode, body)?),
        Opcode::RegisterName => Operation::RegisterName(parse_body(opcode, body)?),
        Opcode::CreateToken => Operation::CreateToken(parse_body(opcode, body)?),
        Opcode::TransferToken => Operation::TransferToken(parse_body(opcode, body)?),
        Opcode::LockToken => Operation::LockToken(parse_body(opcode, body)?),
    };

    // Sets arrive sorted and unique; anything else collapses on decode and
    // would re-encode differently.
    if encode(&op)? != bytes {
        return Err(CodecError::NonCanonical { opcode: first });
    }
    Ok(op)
}

fn body_bytes<T: Serialize>(body: &T) -> Result<Vec<u8>, CodecError> {
    encode_options()
        .serialize(body)
        .map_err(|e| CodecError::Malformed {
            opcode: 0,
            reason: e.to_string(),
        })
}

fn parse_body<T: DeserializeOwned>(opcode: Opcode, body: &[u8]) -> Result<T, CodecError> {
    decode_options()
        .deserialize(body)
        .map_err(|e| CodecError::Malformed {
            opcode: opcode.as_u8(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DelegateSet, RegisterCommittee, RegisterDelegate, SubmitBill, VoteBill};
    use agora_types::{BillId, KeyId};

    fn key(b: u8) -> KeyId {
        KeyId::new([b; 20])
    }

    #[test]
    fn register_delegate_layout() {
        let op = Operation::RegisterDelegate(RegisterDelegate {
            name: "alice".into(),
        });
        let bytes = encode(&op).unwrap();
        assert_eq!(bytes[0], 0xc0);
        // u64 little-endian length prefix followed by the utf-8 bytes
        assert_eq!(&bytes[1..9], &5u64.to_le_bytes());
        assert_eq!(&bytes[9..], b"alice");
        assert_eq!(decode(&bytes).unwrap(), op);
    }

    #[test]
    fn vote_bill_round_trip() {
        let op = Operation::VoteBill(VoteBill {
            bill: BillId::new([7; 20]),
            option: 3,
        });
        let bytes = encode(&op).unwrap();
        assert_eq!(bytes.len(), 1 + 20 + 1);
        assert_eq!(decode(&bytes).unwrap(), op);
    }

    #[test]
    fn unknown_opcode_is_preserved() {
        let bytes = [0xe5, 1, 2, 3];
        let op = decode(&bytes).unwrap();
        assert_eq!(
            op,
            Operation::Unrecognized {
                opcode: 0xe5,
                body: vec![1, 2, 3]
            }
        );
        assert_eq!(encode(&op).unwrap(), bytes);
        assert_eq!(op.kind(), "unrecognized");
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert_eq!(decode(&[]), Err(CodecError::Empty));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let bytes = vec![0xc0; MAX_PAYLOAD_LEN + 1];
        assert!(matches!(decode(&bytes), Err(CodecError::TooLarge { .. })));
    }

    #[test]
    fn truncated_body_is_malformed() {
        let op = Operation::RegisterCommittee(RegisterCommittee {
            name: "alpha".into(),
            url: "http://a".into(),
        });
        let bytes = encode(&op).unwrap();
        let err = decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { opcode: 0xc3, .. }));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let op = Operation::RegisterDelegate(RegisterDelegate { name: "bob".into() });
        let mut bytes = encode(&op).unwrap();
        bytes.push(0);
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let mut bytes = vec![0xc8];
        bytes.extend_from_slice(&2u64.to_le_bytes());
        bytes.extend_from_slice(&[0xff, 0xfe]);
        assert!(matches!(decode(&bytes), Err(CodecError::Malformed { .. })));
    }

    #[test]
    fn unsorted_delegate_set_is_non_canonical() {
        let mut bytes = vec![0xc1];
        bytes.extend_from_slice(&2u64.to_le_bytes());
        bytes.extend_from_slice(key(9).as_bytes());
        bytes.extend_from_slice(key(1).as_bytes());
        assert_eq!(
            decode(&bytes),
            Err(CodecError::NonCanonical { opcode: 0xc1 })
        );
    }

    #[test]
    fn duplicate_delegate_is_non_canonical() {
        let mut bytes = vec![0xc2];
        bytes.extend_from_slice(&2u64.to_le_bytes());
        bytes.extend_from_slice(key(4).as_bytes());
        bytes.extend_from_slice(key(4).as_bytes());
        assert_eq!(
            decode(&bytes),
            Err(CodecError::NonCanonical { opcode: 0xc2 })
        );
    }

    #[test]
    fn equal_sets_encode_identically() {
        let a = Operation::VoteDelegates(DelegateSet::new([key(3), key(1), key(2)]));
        let b = Operation::VoteDelegates(DelegateSet::new([key(2), key(3), key(1), key(1)]));
        assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn submit_bill_round_trip() {
        let op = Operation::SubmitBill(SubmitBill {
            title: "t1".into(),
            detail: "d".into(),
            url: "u".into(),
            duration_days: 1,
            options: vec!["yes".into(), "no".into()],
        });
        assert_eq!(decode(&encode(&op).unwrap()).unwrap(), op);
    }

    #[test]
    fn oversized_encode_is_rejected() {
        let op = Operation::RegisterName(crate::RegisterName {
            name: "x".repeat(MAX_PAYLOAD_LEN),
        });
        assert!(matches!(encode(&op), Err(CodecError::TooLarge { .. })));
    }
}
