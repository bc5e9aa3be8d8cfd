//! Feed store - the receiving side of a quorum submission
//!
//! Verifies a submission against the signer registry, then stores each record
//! under its price key. Full records must move the timestamp forward, which
//! also stops a signed submission from being replayed. A reset stores the
//! sentinel record `(255, 0, 0, 0)`.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use ethers::types::U256;
use tracing::{info, warn};

use crate::errors::StoreError;
use crate::protocol::{verify_batch, SignerRegistry};
use crate::types::{
    PriceData, PriceKey, PricePayload, PriceUpdate, QuorumSubmission, SignatureEntry,
    SigningContext,
};

pub struct FeedStore<R> {
    context: SigningContext,
    registry: R,
    required_signatures: usize,
    decimals: u8,
    prices: RwLock<HashMap<PriceKey, PriceData>>,
}

impl<R: SignerRegistry> FeedStore<R> {
    /// Fails with [`StoreError::NoQuorum`] when `required_signatures` is zero
    pub fn new(
        context: SigningContext,
        registry: R,
        required_signatures: usize,
        decimals: u8,
    ) -> Result<Self, StoreError> {
        if required_signatures == 0 {
            return Err(StoreError::NoQuorum);
        }
        Ok(Self {
            context,
            registry,
            required_signatures,
            decimals,
            prices: RwLock::new(HashMap::new()),
        })
    }

    pub fn context(&self) -> &SigningContext {
        &self.context
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn required_signatures(&self) -> usize {
        self.required_signatures
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Apply a submission atomically: either every update is stored or none is
    pub fn update(&self, submission: &QuorumSubmission) -> Result<(), StoreError> {
        self.apply(&submission.updates, &submission.signatures)
    }

    /// Same as [`Self::update`] for the contract's parallel-list call shape
    pub fn update_parts(
        &self,
        keys: &[PriceKey],
        payloads: &[PricePayload],
        signatures: &[SignatureEntry],
    ) -> Result<(), StoreError> {
        if keys.len() != payloads.len() {
            return Err(StoreError::LengthMismatch {
                keys: keys.len(),
                payloads: payloads.len(),
            });
        }
        let updates: Vec<_> = keys
            .iter()
            .zip(payloads)
            .map(|(k, p)| PriceUpdate::new(*k, p.clone()))
            .collect();
        self.apply(&updates, signatures)
    }

    fn apply(&self, updates: &[PriceUpdate], signatures: &[SignatureEntry]) -> Result<(), StoreError> {
        verify_batch(
            &self.context,
            updates,
            signatures,
            &self.registry,
            self.required_signatures,
        )?;

        let mut prices = write(&self.prices);

        // nothing is written until every update in the batch has passed
        let mut staged: HashMap<PriceKey, PriceData> = HashMap::new();
        for update in updates {
            if let PricePayload::Full(record) = &update.payload {
                let previous = staged.get(&update.key).or_else(|| prices.get(&update.key));
                if let Some(old) = previous {
                    if record.timestamp <= old.timestamp {
                        warn!(key = %update.key, stored = old.timestamp, submitted = record.timestamp, "Old data");
                        return Err(StoreError::OldData {
                            key: update.key,
                            stored: old.timestamp,
                            submitted: record.timestamp,
                        });
                    }
                }
            }
            staged.insert(update.key, update.payload.stored_record());
        }

        for (key, record) in staged {
            info!(
                key = %key,
                reset = record.is_reset_sentinel(),
                timestamp = record.timestamp,
                price = %record.price,
                "Price record stored"
            );
            prices.insert(key, record);
        }
        Ok(())
    }

    pub fn price_data(&self, key: &PriceKey) -> Option<PriceData> {
        read(&self.prices).get(key).cloned()
    }

    pub fn many_price_data(&self, keys: &[PriceKey]) -> Vec<Option<PriceData>> {
        keys.iter().map(|k| self.price_data(k)).collect()
    }

    pub fn price_data_by_name(&self, name: &str) -> Option<PriceData> {
        self.price_data(&PriceKey::from_symbol(name))
    }

    pub fn price(&self, key: &PriceKey) -> Option<U256> {
        self.price_data(key).map(|d| d.price)
    }

    pub fn price_timestamp(&self, key: &PriceKey) -> Option<(U256, u32)> {
        self.price_data(key).map(|d| (d.price, d.timestamp))
    }

    pub fn price_timestamp_heartbeat(&self, key: &PriceKey) -> Option<(U256, u32, u32)> {
        self.price_data(key)
            .map(|d| (d.price, d.timestamp, d.heartbeat))
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
