//! Ledger client - submission of signed update calls
//!
//! [`LedgerClient`] is the seam towards a real chain. [`LocalLedger`] runs the
//! feeds contract logic in-process over a [`FeedStore`], which is what the
//! binary's dry-run mode and the tests use.

pub mod codec;

pub use codec::{CodecError, UpdateCall};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::RejectionKind;
use crate::feeds::FeedStore;
use crate::protocol::SignerRegistry;
use crate::types::{PriceData, PriceKey, PricePayload, QuorumSubmission};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The contract reverted with a reason string
    #[error("call rejected: {reason}")]
    Rejected { reason: String },

    #[error("invalid call data: {0}")]
    Codec(#[from] CodecError),

    #[error("transport error: {0}")]
    Transport(String),
}

impl LedgerError {
    /// Verification category behind a rejection, if the reason names one
    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        match self {
            LedgerError::Rejected { reason } => RejectionKind::from_reason(reason),
            LedgerError::Codec(CodecError::BadSignatureLength { .. }) => {
                Some(RejectionKind::InvalidSignature)
            }
            _ => None,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Send one contract call; `args` is the encoded argument list
    async fn submit(&self, function: &str, args: Vec<u8>) -> Result<(), LedgerError>;

    async fn price_data(&self, key: PriceKey) -> Result<Option<PriceData>, LedgerError>;
}

/// Encode a submission and hand it to the ledger
pub async fn submit_submission<C>(client: &C, submission: &QuorumSubmission) -> Result<(), LedgerError>
where
    C: LedgerClient + ?Sized,
{
    let call = UpdateCall::from_submission(submission)?;
    let function = call.function_name();
    let args = call.encode();
    info!(
        function,
        updates = submission.updates.len(),
        signatures = submission.signatures.len(),
        bytes = args.len(),
        "Submitting signed update"
    );
    match client.submit(function, args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(function, error = %e, "Submission failed");
            Err(e)
        }
    }
}

/// In-process ledger backed by a feed store
pub struct LocalLedger<R> {
    store: FeedStore<R>,
}

impl<R: SignerRegistry> LocalLedger<R> {
    pub fn new(store: FeedStore<R>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FeedStore<R> {
        &self.store
    }

    fn execute(&self, function: &str, args: &[u8]) -> Result<(), LedgerError> {
        let call = UpdateCall::decode(function, args)?;
        let result = match call {
            UpdateCall::Update {
                keys,
                datas,
                signatures,
            } => {
                let payloads: Vec<_> = datas.into_iter().map(PricePayload::Full).collect();
                self.store.update_parts(&keys, &payloads, &signatures)
            }
            reset @ UpdateCall::Reset { .. } => self.store.update(&reset.into_submission()?),
        };
        result.map_err(|e| LedgerError::Rejected {
            reason: e.reason().to_string(),
        })
    }
}

#[async_trait]
impl<R: SignerRegistry + Send + Sync> LedgerClient for LocalLedger<R> {
    async fn submit(&self, function: &str, args: Vec<u8>) -> Result<(), LedgerError> {
        self.execute(function, &args)
    }

    async fn price_data(&self, key: PriceKey) -> Result<Option<PriceData>, LedgerError> {
        Ok(self.store.price_data(&key))
    }
}
