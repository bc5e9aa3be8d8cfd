//! Signer - ECDSA/secp256k1 signatures over the final digest
//!
//! Stateless per call. Multi-signer quorums are produced by signing the same
//! digest with every key and sorting the entries by signer address.

use ethers::types::H256;
use tracing::debug;

use crate::errors::ProtocolError;
use crate::keystore::SigningKeyHandle;
use crate::types::{SignatureEntry, SIGNATURE_LEN};

/// Sign a final digest with one key
pub fn sign(key: &SigningKeyHandle, digest: &H256) -> Result<SignatureEntry, ProtocolError> {
    let signature = key
        .wallet()
        .sign_hash(*digest)
        .map_err(|e| ProtocolError::Signing(e.to_string()))?;
    let bytes = signature.to_vec();
    if bytes.len() != SIGNATURE_LEN {
        return Err(ProtocolError::Signing(format!(
            "unexpected signature length {}",
            bytes.len()
        )));
    }

    let entry = SignatureEntry {
        signer: key.address(),
        signature: bytes,
    };
    debug!(signer = %entry.signer, digest = ?digest, "Signed digest");
    Ok(entry)
}

/// Sign the same digest with every key; entries come back in submission order
pub fn sign_all(
    keys: &[SigningKeyHandle],
    digest: &H256,
) -> Result<Vec<SignatureEntry>, ProtocolError> {
    let entries = keys
        .iter()
        .map(|key| sign(key, digest))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(assemble_submission(entries))
}

/// Put independently produced entries into canonical (ascending address) order
pub fn assemble_submission(mut entries: Vec<SignatureEntry>) -> Vec<SignatureEntry> {
    entries.sort_by(|a, b| a.signer.cmp(&b.signer));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Signature;

    #[test]
    fn test_signature_recovers_to_signer() {
        let key = SigningKeyHandle::random();
        let digest = H256::repeat_byte(0x42);
        let entry = sign(&key, &digest).unwrap();

        assert_eq!(entry.signature.len(), SIGNATURE_LEN);
        let sig = Signature::try_from(entry.signature.as_slice()).unwrap();
        let recovered = sig.recover(digest).unwrap();
        assert_eq!(crate::types::ChainAddress::from_signer(recovered), entry.signer);
    }

    #[test]
    fn test_signing_is_deterministic_per_key() {
        let key = SigningKeyHandle::random();
        let digest = H256::repeat_byte(0x01);
        assert_eq!(sign(&key, &digest).unwrap(), sign(&key, &digest).unwrap());
    }

    #[test]
    fn test_sign_all_orders_by_address() {
        let keys: Vec<_> = (0..4).map(|_| SigningKeyHandle::random()).collect();
        let entries = sign_all(&keys, &H256::repeat_byte(0x09)).unwrap();
        assert_eq!(entries.len(), 4);
        assert!(entries.windows(2).all(|w| w[0].signer < w[1].signer));
    }
}
