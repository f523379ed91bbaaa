use proptest::prelude::*;

use agora_types::{format_fixed_point, parse_fixed_point, BillId, KeyId, Timestamp, TokenId};

proptest! {
    /// KeyId hex display parses back to the same id.
    #[test]
    fn key_id_display_parse(bytes in prop::array::uniform20(0u8..)) {
        let id = KeyId::new(bytes);
        let parsed: KeyId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// BillId hex display parses back to the same id.
    #[test]
    fn bill_id_display_parse(bytes in prop::array::uniform20(0u8..)) {
        let id = BillId::new(bytes);
        let parsed: BillId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// KeyId ordering agrees with byte ordering, which the stores rely on for scans.
    #[test]
    fn key_id_order_is_byte_order(
        a in prop::array::uniform20(0u8..),
        b in prop::array::uniform20(0u8..),
    ) {
        prop_assert_eq!(KeyId::new(a).cmp(&KeyId::new(b)), a.cmp(&b));
    }

    /// Big-endian token id bytes sort the same way as the ids.
    #[test]
    fn token_id_be_bytes_sort(a in 0u64.., b in 0u64..) {
        let (ta, tb) = (TokenId::new(a), TokenId::new(b));
        prop_assert_eq!(ta.to_be_bytes().cmp(&tb.to_be_bytes()), ta.cmp(&tb));
    }

    /// Formatting a raw amount and parsing it back yields the raw amount.
    #[test]
    fn fixed_point_format_parse(raw in 0u64.., digits in 0u8..=8) {
        let s = format_fixed_point(raw, digits);
        prop_assert_eq!(parse_fixed_point(&s, digits).unwrap(), raw);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// KeyId bincode serialization roundtrip.
    #[test]
    fn key_id_bincode_roundtrip(bytes in prop::array::uniform20(0u8..)) {
        let id = KeyId::new(bytes);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: KeyId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }
}
