//! Canonical byte layout of a price update
//!
//! contract (32) || key (32) || payload, where payload is either `RESET` or the
//! decimal ASCII of `data`, `heartbeat`, `timestamp` followed by the minimal
//! big-endian bytes of `price`. The text/binary mix matches the contract's own
//! `to_string` / `to_bytes_be` path and must be reproduced byte for byte.

use ethers::types::U256;

use crate::types::{PricePayload, PriceKey, PriceUpdate, SigningContext, RESET_MARKER};

/// Encode one key/payload pair for the given contract
pub fn encode(context: &SigningContext, key: &PriceKey, payload: &PricePayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + 32);
    out.extend_from_slice(context.contract.as_bytes());
    out.extend_from_slice(key.as_bytes());
    encode_payload(payload, &mut out);
    out
}

/// Encode several updates under one digest: all keys first, then all payloads
pub fn encode_batch(context: &SigningContext, updates: &[PriceUpdate]) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + updates.len() * 64);
    out.extend_from_slice(context.contract.as_bytes());
    for update in updates {
        out.extend_from_slice(update.key.as_bytes());
    }
    for update in updates {
        encode_payload(&update.payload, &mut out);
    }
    out
}

fn encode_payload(payload: &PricePayload, out: &mut Vec<u8>) {
    match payload {
        PricePayload::Reset => out.extend_from_slice(RESET_MARKER),
        PricePayload::Full(record) => {
            out.extend_from_slice(decimal_ascii(record.data as u64).as_bytes());
            out.extend_from_slice(decimal_ascii(record.heartbeat as u64).as_bytes());
            out.extend_from_slice(decimal_ascii(record.timestamp as u64).as_bytes());
            out.extend_from_slice(&minimal_be_bytes(&record.price));
        }
    }
}

/// Base-10 text, no sign, no padding, "0" for zero
pub fn decimal_ascii(value: u64) -> String {
    value.to_string()
}

/// Big-endian bytes without leading zeros; zero encodes as no bytes
pub fn minimal_be_bytes(value: &U256) -> Vec<u8> {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    let first = buf.iter().position(|b| *b != 0).unwrap_or(buf.len());
    buf[first..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChainAddress, PriceData};

    fn context() -> SigningContext {
        let mut bytes = [0u8; 32];
        bytes[8..].copy_from_slice(&[
            251, 19, 151, 232, 34, 94, 168, 94, 15, 14, 110, 140, 123, 18, 109, 0, 22, 204, 189,
            224, 230, 103, 21, 30,
        ]);
        SigningContext::new(ChainAddress::from_bytes(bytes))
    }

    #[test]
    fn test_encodes_eth_usd_observation_exactly() {
        let ctx = context();
        let key = PriceKey::from_symbol("ETH-USD");
        let payload = PricePayload::Full(PriceData::new(0, 0, 1688998114, 1_000_000_000u64));

        let bytes = encode(&ctx, &key, &payload);

        assert_eq!(&bytes[..32], ctx.contract.as_bytes());
        assert_eq!(&bytes[32..64], key.as_bytes());
        let mut tail = b"001688998114".to_vec();
        tail.extend_from_slice(&[0x3b, 0x9a, 0xca, 0x00]);
        assert_eq!(&bytes[64..], tail.as_slice());
    }

    #[test]
    fn test_reset_substitutes_marker() {
        let ctx = context();
        let key = PriceKey::from_symbol("ETH-USD");
        let bytes = encode(&ctx, &key, &PricePayload::Reset);
        assert_eq!(bytes.len(), 69);
        assert_eq!(&bytes[64..], b"RESET");
    }

    #[test]
    fn test_decimal_fields_are_not_padded() {
        assert_eq!(decimal_ascii(0), "0");
        assert_eq!(decimal_ascii(7), "7");
        assert_eq!(decimal_ascii(255), "255");
        assert_eq!(decimal_ascii(u32::MAX as u64), "4294967295");
    }

    #[test]
    fn test_price_bytes_are_minimal() {
        assert!(minimal_be_bytes(&U256::zero()).is_empty());
        assert_eq!(minimal_be_bytes(&U256::from(1u64)), vec![1]);
        assert_eq!(minimal_be_bytes(&U256::from(256u64)), vec![1, 0]);
        assert_eq!(minimal_be_bytes(&U256::MAX).len(), 32);
    }

    #[test]
    fn test_zero_price_contributes_no_bytes() {
        let ctx = context();
        let key = PriceKey::from_symbol("BTC-USD");
        let bytes = encode(
            &ctx,
            &key,
            &PricePayload::Full(PriceData::new(1, 60, 10, 0u64)),
        );
        assert_eq!(&bytes[64..], b"16010");
    }

    #[test]
    fn test_single_batch_matches_single_encoding() {
        let ctx = context();
        let update = PriceUpdate::new(
            PriceKey::from_symbol("ETH-USD"),
            PricePayload::Full(PriceData::new(0, 3600, 1688998114, 12345u64)),
        );
        assert_eq!(
            encode_batch(&ctx, std::slice::from_ref(&update)),
            encode(&ctx, &update.key, &update.payload)
        );
    }

    #[test]
    fn test_batch_puts_keys_before_payloads() {
        let ctx = context();
        let a = PriceUpdate::new(PriceKey::from_symbol("A"), PricePayload::Reset);
        let b = PriceUpdate::new(
            PriceKey::from_symbol("B"),
            PricePayload::Full(PriceData::new(0, 0, 1, 2u64)),
        );
        let bytes = encode_batch(&ctx, &[a.clone(), b.clone()]);
        assert_eq!(&bytes[32..64], a.key.as_bytes());
        assert_eq!(&bytes[64..96], b.key.as_bytes());
        assert_eq!(&bytes[96..], b"RESET001\x02");
    }
}
