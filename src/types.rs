//! Core types used throughout feedsign
//!
//! Defines the value types that flow through encoding, signing and verification:
//! price keys, addresses, price records and signature entries.

use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Literal substituted for the numeric fields when a record is reset
pub const RESET_MARKER: &[u8; 5] = b"RESET";

/// `data` value of the record stored for a reset key
pub const RESET_SENTINEL_DATA: u8 = 255;

/// Length of a raw secp256k1 signature (r || s || v)
pub const SIGNATURE_LEN: usize = 65;

/// 32-byte chain address.
///
/// Contract identities use all 32 bytes. Signer addresses are the 20-byte
/// secp256k1 address left-padded with zeros, so they order and compare the
/// same way on both sides of the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChainAddress(pub H256);

impl ChainAddress {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(H256(bytes))
    }

    /// Pad a 20-byte signer address to the 32-byte chain width
    pub fn from_signer(address: Address) -> Self {
        Self(H256::from(address))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_fixed_bytes()
    }
}

impl From<Address> for ChainAddress {
    fn from(address: Address) -> Self {
        Self::from_signer(address)
    }
}

impl FromStr for ChainAddress {
    type Err = hex::FromHexError;

    /// Parse 64 hex characters, with or without a `0x` prefix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self::from_bytes(bytes))
    }
}

impl fmt::Display for ChainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

/// Lookup key of a feed: keccak256 of the feed name (e.g. "ETH-USD")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceKey(pub H256);

impl PriceKey {
    pub fn from_symbol(symbol: &str) -> Self {
        Self(H256(keccak256(symbol.as_bytes())))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_fixed_bytes()
    }
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

/// Price record as stored by the feeds contract
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceData {
    /// Free-form flag byte; 255 marks a reset record
    pub data: u8,
    /// Expected update interval in seconds
    pub heartbeat: u32,
    /// Observation time, unix seconds
    pub timestamp: u32,
    /// Price scaled by the feed decimals
    pub price: U256,
}

impl PriceData {
    pub fn new(data: u8, heartbeat: u32, timestamp: u32, price: impl Into<U256>) -> Self {
        Self {
            data,
            heartbeat,
            timestamp,
            price: price.into(),
        }
    }

    /// Record written in place of real values when a key is reset
    pub fn reset_sentinel() -> Self {
        Self {
            data: RESET_SENTINEL_DATA,
            heartbeat: 0,
            timestamp: 0,
            price: U256::zero(),
        }
    }

    pub fn is_reset_sentinel(&self) -> bool {
        *self == Self::reset_sentinel()
    }
}

/// Either a full price record or the reset marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum PricePayload {
    Full(PriceData),
    Reset,
}

impl PricePayload {
    pub fn is_reset(&self) -> bool {
        matches!(self, PricePayload::Reset)
    }

    /// Record the store keeps once this payload is accepted
    pub fn stored_record(&self) -> PriceData {
        match self {
            PricePayload::Full(data) => data.clone(),
            PricePayload::Reset => PriceData::reset_sentinel(),
        }
    }
}

impl fmt::Display for PricePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricePayload::Full(d) => write!(
                f,
                "data={} heartbeat={} timestamp={} price={}",
                d.data, d.heartbeat, d.timestamp, d.price
            ),
            PricePayload::Reset => write!(f, "RESET"),
        }
    }
}

/// A named observation as produced by a data provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub symbol: String,
    pub payload: PricePayload,
}

impl PriceObservation {
    pub fn full(symbol: impl Into<String>, data: PriceData) -> Self {
        Self {
            symbol: symbol.into(),
            payload: PricePayload::Full(data),
        }
    }

    pub fn reset(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            payload: PricePayload::Reset,
        }
    }

    pub fn key(&self) -> PriceKey {
        PriceKey::from_symbol(&self.symbol)
    }

    pub fn to_update(&self) -> PriceUpdate {
        PriceUpdate {
            key: self.key(),
            payload: self.payload.clone(),
        }
    }
}

/// Key/payload pair as carried inside a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub key: PriceKey,
    pub payload: PricePayload,
}

impl PriceUpdate {
    pub fn new(key: PriceKey, payload: PricePayload) -> Self {
        Self { key, payload }
    }
}

/// Binds signatures to exactly one deployed feeds contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningContext {
    pub contract: ChainAddress,
}

impl SigningContext {
    pub fn new(contract: ChainAddress) -> Self {
        Self { contract }
    }
}

/// One signer's signature over a final digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub signer: ChainAddress,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

/// Updates plus the ordered signatures over their shared digest
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuorumSubmission {
    pub updates: Vec<PriceUpdate>,
    pub signatures: Vec<SignatureEntry>,
}

impl QuorumSubmission {
    pub fn single(update: PriceUpdate, signatures: Vec<SignatureEntry>) -> Self {
        Self {
            updates: vec![update],
            signatures,
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.strip_prefix("0x").unwrap_or(&raw);
        hex::decode(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eth_usd_price_key_matches_known_hash() {
        let key = PriceKey::from_symbol("ETH-USD");
        assert_eq!(
            hex::encode(key.as_bytes()),
            "2430f68ea2e8d4151992bb7fc3a4c472087a6149bf7e0232704396162ab7c1f7"
        );
    }

    #[test]
    fn test_signer_address_is_left_padded() {
        let addr: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
            .parse()
            .unwrap();
        let chain = ChainAddress::from_signer(addr);
        assert_eq!(&chain.as_bytes()[..12], &[0u8; 12]);
        assert_eq!(&chain.as_bytes()[12..], addr.as_bytes());
    }

    #[test]
    fn test_chain_address_parses_with_and_without_prefix() {
        let raw = "00000000000000000500fb1397e8225ea85e0f0e6e8c7b126d0016ccbde0e667";
        let a: ChainAddress = raw.parse().unwrap();
        let b: ChainAddress = format!("0x{}", raw).parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), format!("0x{}", raw));
        assert!("0x1234".parse::<ChainAddress>().is_err());
    }

    #[test]
    fn test_reset_payload_stores_sentinel() {
        let record = PricePayload::Reset.stored_record();
        assert_eq!(record, PriceData::new(255, 0, 0, 0u64));
        assert!(record.is_reset_sentinel());
    }

    #[test]
    fn test_signature_entry_serializes_hex() {
        let entry = SignatureEntry {
            signer: ChainAddress::default(),
            signature: vec![0xab, 0xcd],
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"0xabcd\""));
        let back: SignatureEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
