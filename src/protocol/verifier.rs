//! Quorum Verifier
//!
//! Checks, in this order: signature count, every signature against the
//! recomputed digest, strict ascending signer order, registry membership.
//! The first failing check decides the rejection.

use std::collections::{BTreeSet, HashSet};

use ethers::types::{Signature, H256};
use tracing::{debug, warn};

use super::digest::signable_digest;
use crate::errors::Rejection;
use crate::types::{
    ChainAddress, PricePayload, PriceKey, PriceUpdate, SignatureEntry, SigningContext,
    SIGNATURE_LEN,
};

/// Authoritative set of addresses allowed to sign updates
pub trait SignerRegistry {
    fn is_signer(&self, address: &ChainAddress) -> bool;
}

impl SignerRegistry for BTreeSet<ChainAddress> {
    fn is_signer(&self, address: &ChainAddress) -> bool {
        self.contains(address)
    }
}

impl SignerRegistry for HashSet<ChainAddress> {
    fn is_signer(&self, address: &ChainAddress) -> bool {
        self.contains(address)
    }
}

impl<R: SignerRegistry + ?Sized> SignerRegistry for &R {
    fn is_signer(&self, address: &ChainAddress) -> bool {
        (**self).is_signer(address)
    }
}

/// Verify a single-update submission
pub fn verify<R: SignerRegistry + ?Sized>(
    context: &SigningContext,
    key: &PriceKey,
    payload: &PricePayload,
    signatures: &[SignatureEntry],
    registry: &R,
    required: usize,
) -> Result<(), Rejection> {
    let update = PriceUpdate::new(*key, payload.clone());
    verify_batch(
        context,
        std::slice::from_ref(&update),
        signatures,
        registry,
        required,
    )
}

/// Verify a submission covering one or more updates under a shared digest
pub fn verify_batch<R: SignerRegistry + ?Sized>(
    context: &SigningContext,
    updates: &[PriceUpdate],
    signatures: &[SignatureEntry],
    registry: &R,
    required: usize,
) -> Result<(), Rejection> {
    let digest = signable_digest(context, updates);
    let result = verify_digest(&digest, signatures, registry, required);
    match &result {
        Ok(()) => debug!(
            signatures = signatures.len(),
            required, "Quorum submission accepted"
        ),
        Err(rejection) => warn!(reason = rejection.reason(), %rejection, "Quorum submission rejected"),
    }
    result
}

/// Quorum checks against an already computed final digest
pub fn verify_digest<R: SignerRegistry + ?Sized>(
    digest: &H256,
    signatures: &[SignatureEntry],
    registry: &R,
    required: usize,
) -> Result<(), Rejection> {
    if signatures.len() < required {
        return Err(Rejection::InsufficientSignatures {
            required,
            provided: signatures.len(),
        });
    }

    for (index, entry) in signatures.iter().enumerate() {
        if !signature_matches(digest, entry) {
            return Err(Rejection::InvalidSignature { index });
        }
    }

    // strictly ascending also rules out a signer appearing twice
    for (index, pair) in signatures.windows(2).enumerate() {
        if pair[1].signer <= pair[0].signer {
            return Err(Rejection::SignaturesOutOfOrder { index: index + 1 });
        }
    }

    if let Some(entry) = signatures.iter().find(|e| !registry.is_signer(&e.signer)) {
        return Err(Rejection::InvalidSigner {
            address: entry.signer,
        });
    }

    Ok(())
}

/// Recover the signer from the raw signature and compare with the declared address
fn signature_matches(digest: &H256, entry: &SignatureEntry) -> bool {
    if entry.signature.len() != SIGNATURE_LEN {
        return false;
    }
    let Ok(signature) = Signature::try_from(entry.signature.as_slice()) else {
        return false;
    };
    match signature.recover(*digest) {
        Ok(recovered) => ChainAddress::from_signer(recovered) == entry.signer,
        Err(_) => false,
    }
}
