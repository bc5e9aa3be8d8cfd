//! Key Store - loads signing keys from persisted material
//!
//! Keys are hex-encoded secp256k1 scalars (with or without `0x`), read either
//! from environment variables or from `<dir>/<id>.key` files. A loaded key
//! lives inside a [`SigningKeyHandle`]; the wrapped `k256` signing key zeroizes
//! its scalar on drop, so releasing the handle releases the secret. Text and
//! byte buffers that carry the key on the way in or out are [`Zeroizing`] too.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use ethers::core::k256::elliptic_curve::sec1::ToEncodedPoint;
use ethers::core::k256::elliptic_curve::zeroize::Zeroizing;
use ethers::signers::{LocalWallet, Signer};
use tracing::debug;

use crate::errors::ProtocolError;
use crate::types::ChainAddress;

/// Owned signing key. Never logged, never serialized.
pub struct SigningKeyHandle {
    wallet: LocalWallet,
}

impl SigningKeyHandle {
    /// Parse a hex private key
    pub fn from_hex(raw: &str) -> Result<Self, ProtocolError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ProtocolError::Key("empty key material".to_string()));
        }
        let raw = raw.strip_prefix("0x").unwrap_or(raw);
        if raw.len() != 64 {
            return Err(ProtocolError::Key(format!(
                "private key must be 64 hex characters, got {}",
                raw.len()
            )));
        }
        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(raw, &mut bytes[..])
            .map_err(|e| ProtocolError::Key(format!("private key is not hex: {}", e)))?;
        let wallet = LocalWallet::from_bytes(&bytes[..])
            .map_err(|e| ProtocolError::Key(format!("invalid private key scalar: {}", e)))?;
        Ok(Self { wallet })
    }

    /// Fresh random key
    pub fn random() -> Self {
        Self {
            wallet: LocalWallet::new(&mut rand::thread_rng()),
        }
    }

    /// Signer address padded to the 32-byte chain width
    pub fn address(&self) -> ChainAddress {
        ChainAddress::from_signer(self.wallet.address())
    }

    /// SEC1 uncompressed public key (65 bytes, leading 0x04)
    pub fn public_key(&self) -> Vec<u8> {
        self.wallet
            .signer()
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// Hex of the raw scalar, for writing a freshly generated key to a file
    pub fn export_hex(&self) -> Zeroizing<String> {
        let mut scalar = Zeroizing::new([0u8; 32]);
        scalar.copy_from_slice(&self.wallet.signer().to_bytes());
        Zeroizing::new(hex::encode(&scalar[..]))
    }

    pub(crate) fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }
}

impl fmt::Debug for SigningKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyHandle")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Source of signing keys
#[cfg_attr(test, mockall::automock)]
pub trait KeyStore {
    fn load_signing_key(&self, id: &str) -> Result<SigningKeyHandle, ProtocolError>;
}

/// Derive the public key of a loaded handle
pub fn derive_public_key(handle: &SigningKeyHandle) -> Vec<u8> {
    handle.public_key()
}

/// Keys held in environment variables named `<PREFIX><ID>`
#[derive(Debug, Clone, Default)]
pub struct EnvKeyStore {
    prefix: String,
}

impl EnvKeyStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Variable consulted for a key id: uppercased, `-` and `.` become `_`
    pub fn var_name(&self, id: &str) -> String {
        let id: String = id
            .chars()
            .map(|c| match c {
                '-' | '.' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        format!("{}{}", self.prefix, id)
    }
}

impl KeyStore for EnvKeyStore {
    fn load_signing_key(&self, id: &str) -> Result<SigningKeyHandle, ProtocolError> {
        let var = self.var_name(id);
        let raw = std::env::var(&var)
            .map(Zeroizing::new)
            .map_err(|_| ProtocolError::Key(format!("environment variable {} is not set", var)))?;
        let handle = SigningKeyHandle::from_hex(&raw)?;
        debug!(var = %var, signer = %handle.address(), "Loaded signing key from environment");
        Ok(handle)
    }
}

/// Keys stored as hex text in `<dir>/<id>.key`
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.key", id))
    }
}

impl KeyStore for FileKeyStore {
    fn load_signing_key(&self, id: &str) -> Result<SigningKeyHandle, ProtocolError> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(ProtocolError::Key(format!("invalid key id {:?}", id)));
        }
        let path = self.path_for(id);
        let raw = fs::read_to_string(&path).map(Zeroizing::new).map_err(|e| {
            ProtocolError::Key(format!("cannot read key file {}: {}", path.display(), e))
        })?;
        let handle = SigningKeyHandle::from_hex(&raw)?;
        debug!(path = %path.display(), signer = %handle.address(), "Loaded signing key from file");
        Ok(handle)
    }
}
