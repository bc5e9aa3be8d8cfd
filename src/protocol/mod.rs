//! Signing protocol for price feed updates
//!
//! - [`encoder`]: canonical byte layout of an update
//! - [`digest`]: keccak + personal-sign envelope
//! - [`signer`]: ECDSA signatures over the final digest
//! - [`verifier`]: quorum checks on the receiving side
//!
//! Everything here is pure: no network, no disk, no shared state.

pub mod digest;
pub mod encoder;
pub mod signer;
pub mod verifier;

pub use digest::{digest, signable_digest, wrap, SIGNED_MESSAGE_PREFIX};
pub use encoder::{encode, encode_batch};
pub use signer::{assemble_submission, sign, sign_all};
pub use verifier::{verify, verify_batch, verify_digest, SignerRegistry};

use crate::errors::ProtocolError;
use crate::keystore::SigningKeyHandle;
use crate::types::{PriceObservation, QuorumSubmission, SigningContext};

/// Sign a set of observations with every key and assemble the submission
pub fn build_submission(
    context: &SigningContext,
    observations: &[PriceObservation],
    keys: &[SigningKeyHandle],
) -> Result<QuorumSubmission, ProtocolError> {
    let updates: Vec<_> = observations.iter().map(|o| o.to_update()).collect();
    let final_digest = signable_digest(context, &updates);
    let signatures = sign_all(keys, &final_digest)?;
    Ok(QuorumSubmission {
        updates,
        signatures,
    })
}
