//! Configuration sections

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    /// 32-byte address of the feeds contract, hex
    pub address: String,
    /// Signatures the contract requires per update
    pub required_signatures: usize,
    /// Decimals prices are scaled by
    pub decimals: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignerConfig {
    /// Key identifier handed to the key store
    pub key_id: String,
    /// Prefix of the environment variable holding the key
    pub key_env_prefix: String,
    /// Directory of `<id>.key` files; when set it takes precedence over the environment
    pub key_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorConfig {
    pub address: String,
    pub location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Validators loaded into the local registry
    pub validators: Vec<ValidatorConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub filter: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}
