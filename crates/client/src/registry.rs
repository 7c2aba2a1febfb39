//! Typed registry binding.
//!
//! A `RegistryClient` is an immutable value binding the contract surface to
//! one session generation. It is rebuilt, never mutated, whenever the
//! contract address or the session changes; operations dispatched through an
//! old binding detect supersession on completion and discard their results.

use std::sync::Arc;

use registry_core::{
    ContentDigest, PendingTransaction, REGISTRATION_FEE_UNITS, Receipt, RecordDraft,
    RegistryContract, RegistryError, RegistryRecord, SignerRef, TxStatus,
};

use crate::session::WalletSession;

struct WriterBinding {
    signer: SignerRef,
    generation: u64,
}

pub struct RegistryClient {
    contract: Arc<dyn RegistryContract>,
    session: Arc<WalletSession>,
    /// Present only when the session was connected at bind time; reads work
    /// without it.
    writer: Option<WriterBinding>,
}

impl RegistryClient {
    /// Bind the contract surface to the current session.
    ///
    /// `None` for the contract means deployment configuration is absent:
    /// the binding is unusable and fails fast here.
    pub fn bind(
        contract: Option<Arc<dyn RegistryContract>>,
        session: &Arc<WalletSession>,
    ) -> Result<Self, RegistryError> {
        let contract = contract.ok_or(RegistryError::NoBinding)?;
        let writer = session.identity().map(|identity| WriterBinding {
            signer: identity.signer,
            generation: identity.generation,
        });
        Ok(Self {
            contract,
            session: session.clone(),
            writer,
        })
    }

    /// Generation this binding was built against, if it can write.
    pub fn generation(&self) -> Option<u64> {
        self.writer.as_ref().map(|writer| writer.generation)
    }

    fn writer(&self) -> Result<&WriterBinding, RegistryError> {
        self.writer.as_ref().ok_or(RegistryError::Unauthorized)
    }

    fn ensure_live(&self, generation: u64) -> Result<(), RegistryError> {
        if self.session.current_generation() != Some(generation) {
            return Err(RegistryError::StaleSession);
        }
        Ok(())
    }

    /// Dispatch one record write with the mandatory registration fee.
    /// Returns once the node accepts the transaction into its pool.
    pub async fn submit(
        &self,
        draft: &RecordDraft,
        digest: Option<&ContentDigest>,
    ) -> Result<PendingTransaction, RegistryError> {
        let writer = self.writer()?;
        self.ensure_live(writer.generation)?;

        let tx_hash = self
            .contract
            .submit_record(&writer.signer, draft, digest, REGISTRATION_FEE_UNITS)
            .await?;

        // The session may have been replaced while the node was accepting
        // the transaction; the result then belongs to a signer this client
        // no longer represents.
        self.ensure_live(writer.generation)?;

        Ok(PendingTransaction {
            tx_hash,
            status: TxStatus::Submitted,
        })
    }

    /// Suspend until the transaction is mined. Callers impose their own
    /// timeout; cancelling leaves the on-chain outcome untouched.
    pub async fn await_confirmation(
        &self,
        pending: &PendingTransaction,
    ) -> Result<Receipt, RegistryError> {
        let writer = self.writer()?;
        let receipt = self.contract.await_confirmation(&pending.tx_hash).await?;
        self.ensure_live(writer.generation)?;
        Ok(receipt)
    }

    /// Full ordered read of the record set. Works without a signer.
    pub async fn list_all(&self) -> Result<Vec<RegistryRecord>, RegistryError> {
        let records = self.contract.list_records().await?;

        // Append-only storage must yield 1-based, gap-free positions.
        for (position, record) in records.iter().enumerate() {
            let expected = position as u64 + 1;
            if record.sequence_index != expected {
                return Err(RegistryError::Codec(format!(
                    "sequence index {} at position {expected}",
                    record.sequence_index
                )));
            }
        }

        Ok(records)
    }
}
