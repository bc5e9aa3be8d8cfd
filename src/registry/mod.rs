//! Validator bank - the signer registry consulted by the verifier
//!
//! Owner-managed set of validators keyed by address, each with a location
//! (the endpoint the validator publishes from).

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::RegistryError;
use crate::protocol::SignerRegistry;
use crate::types::ChainAddress;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub id: ChainAddress,
    pub location: String,
}

#[derive(Default)]
pub struct ValidatorBank {
    validators: RwLock<HashMap<ChainAddress, Validator>>,
    /// Registration order, kept for listing
    addresses: RwLock<Vec<ChainAddress>>,
}

impl ValidatorBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bank pre-populated with validators, e.g. from configuration
    pub fn with_validators<I>(validators: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = Validator>,
    {
        let bank = Self::new();
        for v in validators {
            bank.create(v.id, v.location)?;
        }
        Ok(bank)
    }

    pub fn create(&self, id: ChainAddress, location: impl Into<String>) -> Result<(), RegistryError> {
        let mut validators = write(&self.validators);
        if validators.contains_key(&id) {
            return Err(RegistryError::ValidatorAlreadyExists(id));
        }
        let location = location.into();
        validators.insert(
            id,
            Validator {
                id,
                location: location.clone(),
            },
        );
        write(&self.addresses).push(id);
        info!(validator = %id, location = %location, "Validator registered");
        Ok(())
    }

    pub fn remove(&self, id: &ChainAddress) -> Result<(), RegistryError> {
        if write(&self.validators).remove(id).is_none() {
            return Err(RegistryError::ValidatorNotExists(*id));
        }
        let mut addresses = write(&self.addresses);
        if let Some(pos) = addresses.iter().position(|a| a == id) {
            addresses.swap_remove(pos);
        }
        info!(validator = %id, "Validator removed");
        Ok(())
    }

    pub fn update(&self, id: &ChainAddress, location: impl Into<String>) -> Result<(), RegistryError> {
        let mut validators = write(&self.validators);
        let validator = validators
            .get_mut(id)
            .ok_or(RegistryError::ValidatorNotExists(*id))?;
        validator.location = location.into();
        info!(validator = %id, location = %validator.location, "Validator updated");
        Ok(())
    }

    pub fn number_of_validators(&self) -> usize {
        read(&self.addresses).len()
    }

    pub fn is_validator(&self, id: &ChainAddress) -> bool {
        read(&self.validators).contains_key(id)
    }

    /// True when every address is a registered validator
    pub fn verify_validators<'a, I>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = &'a ChainAddress>,
    {
        let validators = read(&self.validators);
        ids.into_iter().all(|id| validators.contains_key(id))
    }

    pub fn validator(&self, id: &ChainAddress) -> Option<Validator> {
        read(&self.validators).get(id).cloned()
    }

    /// Validators in registration order (after swap-removals)
    pub fn validators(&self) -> Vec<Validator> {
        let validators = read(&self.validators);
        read(&self.addresses)
            .iter()
            .filter_map(|a| validators.get(a).cloned())
            .collect()
    }
}

impl SignerRegistry for ValidatorBank {
    fn is_signer(&self, address: &ChainAddress) -> bool {
        self.is_validator(address)
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> ChainAddress {
        ChainAddress::from_bytes([b; 32])
    }

    #[test]
    fn test_create_and_query() {
        let bank = ValidatorBank::new();
        bank.create(addr(1), "localhost").unwrap();
        bank.create(addr(2), "https://validator.example").unwrap();

        assert_eq!(bank.number_of_validators(), 2);
        assert!(bank.is_validator(&addr(1)));
        assert!(!bank.is_validator(&addr(3)));
        assert!(bank.verify_validators(&[addr(1), addr(2)]));
        assert!(!bank.verify_validators(&[addr(1), addr(3)]));
        assert!(bank.is_signer(&addr(2)));
    }

    #[test]
    fn test_duplicate_create_fails() {
        let bank = ValidatorBank::new();
        bank.create(addr(1), "a").unwrap();
        assert_eq!(
            bank.create(addr(1), "b"),
            Err(RegistryError::ValidatorAlreadyExists(addr(1)))
        );
        assert_eq!(bank.validator(&addr(1)).unwrap().location, "a");
    }

    #[test]
    fn test_remove_and_update_require_existing() {
        let bank = ValidatorBank::new();
        assert_eq!(
            bank.remove(&addr(9)),
            Err(RegistryError::ValidatorNotExists(addr(9)))
        );
        assert_eq!(
            bank.update(&addr(9), "x"),
            Err(RegistryError::ValidatorNotExists(addr(9)))
        );

        bank.create(addr(1), "a").unwrap();
        bank.create(addr(2), "b").unwrap();
        bank.create(addr(3), "c").unwrap();
        bank.update(&addr(2), "b2").unwrap();
        bank.remove(&addr(1)).unwrap();

        assert!(!bank.is_validator(&addr(1)));
        assert_eq!(bank.number_of_validators(), 2);
        let listed: Vec<_> = bank.validators().into_iter().map(|v| v.location).collect();
        assert_eq!(listed, vec!["c".to_string(), "b2".to_string()]);
    }

    #[test]
    fn test_with_validators_rejects_duplicates() {
        let dup = vec![
            Validator {
                id: addr(1),
                location: "a".into(),
            },
            Validator {
                id: addr(1),
                location: "b".into(),
            },
        ];
        assert!(ValidatorBank::with_validators(dup).is_err());
    }
}
