//! Configuration management for feedsign
//!
//! Loads from config files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::keystore::{EnvKeyStore, FileKeyStore, KeyStore};
use crate::registry::{Validator, ValidatorBank};
use crate::types::{ChainAddress, SigningContext};

/// Contract address used by the upstream test vectors
pub const DEFAULT_CONTRACT_ADDRESS: &str =
    "0x0000000000000000fb1397e8225ea85e0f0e6e8c7b126d0016ccbde0e667151e";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub contract: ContractConfig,
    pub signer: SignerConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Contract defaults
            .set_default("contract.address", DEFAULT_CONTRACT_ADDRESS)?
            .set_default("contract.required_signatures", 1)?
            .set_default("contract.decimals", 8)?
            // Signer defaults
            .set_default("signer.key_id", "signer")?
            .set_default("signer.key_env_prefix", "FEEDSIGN_KEY_")?
            // Registry defaults
            .set_default("registry.validators", Vec::<String>::new())?
            // Logging defaults
            .set_default("logging.filter", "feedsign=info")?
            .set_default("logging.json", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (FEEDSIGN__*)
            .add_source(Environment::with_prefix("FEEDSIGN").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        format!(
            "contract={} required={} decimals={} key_id={} validators={}",
            self.contract.address,
            self.contract.required_signatures,
            self.contract.decimals,
            self.signer.key_id,
            self.registry.validators.len()
        )
    }

    /// Check values the protocol cannot work without
    pub fn validate(&self) -> Result<()> {
        self.signing_context()?;

        if self.contract.required_signatures == 0 {
            bail!("contract.required_signatures must be at least 1");
        }

        let validators = self.registry.validators.len();
        if validators > 0 && self.contract.required_signatures > validators {
            bail!(
                "contract.required_signatures ({}) exceeds the {} configured validators",
                self.contract.required_signatures,
                validators
            );
        }

        for v in &self.registry.validators {
            v.address
                .parse::<ChainAddress>()
                .with_context(|| format!("Invalid validator address {}", v.address))?;
        }

        Ok(())
    }

    pub fn signing_context(&self) -> Result<SigningContext> {
        let contract: ChainAddress = self
            .contract
            .address
            .parse()
            .with_context(|| format!("Invalid contract address {}", self.contract.address))?;
        if contract == ChainAddress::default() {
            bail!("contract.address must not be the zero address");
        }
        Ok(SigningContext::new(contract))
    }

    /// Registry holding the configured validators
    pub fn validator_bank(&self) -> Result<ValidatorBank> {
        let validators = self
            .registry
            .validators
            .iter()
            .map(|v| -> Result<Validator> {
                Ok(Validator {
                    id: v
                        .address
                        .parse()
                        .with_context(|| format!("Invalid validator address {}", v.address))?,
                    location: v.location.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        ValidatorBank::with_validators(validators).context("Duplicate validator in configuration")
    }

    /// Key store selected by the signer section
    pub fn key_store(&self) -> Box<dyn KeyStore> {
        match &self.signer.key_dir {
            Some(dir) => Box::new(FileKeyStore::new(dir)),
            None => Box::new(EnvKeyStore::new(self.signer.key_env_prefix.clone())),
        }
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            contract: ContractConfig {
                address: DEFAULT_CONTRACT_ADDRESS.to_string(),
                required_signatures: 1,
                decimals: 8,
            },
            signer: SignerConfig {
                key_id: "signer".into(),
                key_env_prefix: "FEEDSIGN_KEY_".into(),
                key_dir: None,
            },
            registry: RegistryConfig {
                validators: vec![ValidatorConfig {
                    address: format!("0x{}", "11".repeat(32)),
                    location: "localhost".into(),
                }],
            },
            logging: LoggingConfig {
                filter: "feedsign=info".into(),
                json: false,
            },
        }
    }

    #[test]
    fn test_defaults_load_without_files() {
        let cfg = AppConfig::load().unwrap();
        assert_eq!(cfg.contract.required_signatures, 1);
        assert_eq!(cfg.contract.decimals, 8);
        assert!(cfg.signing_context().is_ok());
    }

    #[test]
    fn test_sample_validates_and_builds_bank() {
        let cfg = sample();
        cfg.validate().unwrap();
        let bank = cfg.validator_bank().unwrap();
        assert_eq!(bank.number_of_validators(), 1);
        assert!(cfg.digest().contains("required=1"));
    }

    #[test]
    fn test_quorum_above_validator_count_is_rejected() {
        let mut cfg = sample();
        cfg.contract.required_signatures = 2;
        assert!(cfg.validate().is_err());
        cfg.contract.required_signatures = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bad_addresses_are_rejected() {
        let mut cfg = sample();
        cfg.contract.address = format!("0x{}", "00".repeat(32));
        assert!(cfg.validate().is_err());

        let mut cfg = sample();
        cfg.registry.validators[0].address = "0xnothex".into();
        assert!(cfg.validate().is_err());
        assert!(cfg.validator_bank().is_err());
    }
}
