//! Error taxonomy for signing and verification

use crate::types::{ChainAddress, PriceKey};

/// Why a quorum submission was turned down.
///
/// Every variant maps to one reason string of the feeds contract so off-chain
/// tooling can tell the checks apart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("not enough signatures: need {required}, have {provided}")]
    InsufficientSignatures { required: usize, provided: usize },

    #[error("invalid signature at position {index}")]
    InvalidSignature { index: usize },

    #[error("signatures out of order at position {index}")]
    SignaturesOutOfOrder { index: usize },

    #[error("invalid signer {address}")]
    InvalidSigner { address: ChainAddress },
}

/// Coarse category of a rejection, recoverable from a ledger reason string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    InsufficientSignatures,
    InvalidSignature,
    SignaturesOutOfOrder,
    InvalidSigner,
}

impl Rejection {
    /// Reason string the feeds contract reverts with
    pub fn reason(&self) -> &'static str {
        self.kind().reason()
    }

    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::InsufficientSignatures { .. } => RejectionKind::InsufficientSignatures,
            Rejection::InvalidSignature { .. } => RejectionKind::InvalidSignature,
            Rejection::SignaturesOutOfOrder { .. } => RejectionKind::SignaturesOutOfOrder,
            Rejection::InvalidSigner { .. } => RejectionKind::InvalidSigner,
        }
    }
}

impl RejectionKind {
    pub fn reason(&self) -> &'static str {
        match self {
            RejectionKind::InsufficientSignatures => "Not enough signatures",
            RejectionKind::InvalidSignature => "invalid signature",
            RejectionKind::SignaturesOutOfOrder => "Signatures out of order",
            RejectionKind::InvalidSigner => "Invalid signer",
        }
    }

    /// Map a reason string reported by the ledger back to its category
    pub fn from_reason(reason: &str) -> Option<Self> {
        let reason = reason.trim();
        [
            RejectionKind::InsufficientSignatures,
            RejectionKind::InvalidSignature,
            RejectionKind::SignaturesOutOfOrder,
            RejectionKind::InvalidSigner,
        ]
        .into_iter()
        .find(|kind| kind.reason().eq_ignore_ascii_case(reason))
    }
}

/// Errors raised by the signing side of the protocol
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Key material missing or corrupt
    #[error("key error: {0}")]
    Key(String),

    /// The curve operation itself failed
    #[error("signing error: {0}")]
    Signing(String),

    #[error(transparent)]
    Rejected(#[from] Rejection),
}

/// Validator bank errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Validator already exists: {0}")]
    ValidatorAlreadyExists(ChainAddress),

    #[error("Validator not exists: {0}")]
    ValidatorNotExists(ChainAddress),
}

/// Errors raised by the feed store when applying an update
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// Timestamp does not advance past the stored record
    #[error("Old data: key {key} stored timestamp {stored}, submitted {submitted}")]
    OldData {
        key: PriceKey,
        stored: u32,
        submitted: u32,
    },

    #[error("Arrays data do not match: {keys} keys, {payloads} payloads")]
    LengthMismatch { keys: usize, payloads: usize },

    #[error("required signatures must be at least 1")]
    NoQuorum,
}

impl StoreError {
    /// Reason string the feeds contract reverts with
    pub fn reason(&self) -> &'static str {
        match self {
            StoreError::Rejected(rejection) => rejection.reason(),
            StoreError::OldData { .. } => "Old data",
            StoreError::LengthMismatch { .. } => "Arrays data do not match",
            StoreError::NoQuorum => "Invalid required signatures",
        }
    }
}
