//! Two-stage digest: keccak of the canonical bytes, then keccak of the
//! personal-sign envelope around it.

use ethers::types::H256;
use ethers::utils::keccak256;
use tracing::debug;

use super::encoder::encode_batch;
use crate::types::{PriceUpdate, SigningContext};

/// Envelope prefix; the trailing `32` is the text length of the inner digest
pub const SIGNED_MESSAGE_PREFIX: &[u8; 30] = b"\x19MultiversX Signed Message:\n32";

/// Stage one: hash of the canonical encoding
pub fn digest(encoded: &[u8]) -> H256 {
    H256(keccak256(encoded))
}

/// Stage two: hash of prefix || stage-one digest
pub fn wrap(inner: &H256) -> H256 {
    let mut envelope = Vec::with_capacity(SIGNED_MESSAGE_PREFIX.len() + 32);
    envelope.extend_from_slice(SIGNED_MESSAGE_PREFIX);
    envelope.extend_from_slice(inner.as_bytes());
    H256(keccak256(envelope))
}

/// Final digest that signers sign and the verifier recomputes
pub fn signable_digest(context: &SigningContext, updates: &[PriceUpdate]) -> H256 {
    let encoded = encode_batch(context, updates);
    let inner = digest(&encoded);
    let outer = wrap(&inner);
    debug!(
        contract = %context.contract,
        updates = updates.len(),
        encoded_len = encoded.len(),
        digest = ?outer,
        "Computed signable digest"
    );
    outer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encoder::encode;
    use crate::types::{ChainAddress, PriceData, PriceKey, PricePayload};
    use ethers::types::U256;

    fn eth_usd() -> PriceUpdate {
        PriceUpdate::new(
            PriceKey::from_symbol("ETH-USD"),
            PricePayload::Full(PriceData::new(0, 0, 1688998114, 1_000_000_000u64)),
        )
    }

    fn ctx() -> SigningContext {
        SigningContext::new(ChainAddress::from_bytes([7u8; 32]))
    }

    #[test]
    fn test_prefix_is_thirty_bytes_with_text_length() {
        assert_eq!(SIGNED_MESSAGE_PREFIX.len(), 30);
        assert_eq!(SIGNED_MESSAGE_PREFIX[0], 0x19);
        assert!(SIGNED_MESSAGE_PREFIX.ends_with(b":\n32"));
    }

    #[test]
    fn test_empty_input_hashes_to_keccak_empty() {
        assert_eq!(
            hex::encode(digest(&[]).as_bytes()),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_pipeline_composes_both_stages() {
        let update = eth_usd();
        let encoded = encode(&ctx(), &update.key, &update.payload);
        let expected = wrap(&digest(&encoded));
        assert_eq!(signable_digest(&ctx(), &[update]), expected);
        assert_ne!(expected, digest(&encoded));
    }

    #[test]
    fn test_digest_is_deterministic() {
        let a = signable_digest(&ctx(), &[eth_usd()]);
        let b = signable_digest(&ctx(), &[eth_usd()]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_any_field_change_moves_the_digest() {
        let base = signable_digest(&ctx(), &[eth_usd()]);

        let mut price = eth_usd();
        if let PricePayload::Full(record) = &mut price.payload {
            record.price += U256::one();
        }
        assert_ne!(signable_digest(&ctx(), &[price]), base);

        let mut ts = eth_usd();
        if let PricePayload::Full(record) = &mut ts.payload {
            record.timestamp += 1;
        }
        assert_ne!(signable_digest(&ctx(), &[ts]), base);

        let other_contract = SigningContext::new(ChainAddress::from_bytes([8u8; 32]));
        assert_ne!(signable_digest(&other_contract, &[eth_usd()]), base);

        let reset = PriceUpdate::new(eth_usd().key, PricePayload::Reset);
        assert_ne!(signable_digest(&ctx(), &[reset]), base);
    }
}
