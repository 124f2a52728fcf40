//! Drift-safe wrapper around the external asset ledger.
//!
//! Some assets deduct a transfer fee or rebase total supply between calls,
//! so the amount a transfer *names* is not the amount that *moves*. Every
//! value movement is therefore bracketed by balance reads, and the observed
//! delta is the authoritative figure for all downstream bookkeeping. The
//! nominal amount is only the caller's intent and an upper bound.

use std::sync::Arc;

use tracing::warn;

use sluice_core::error::DistributionError;
use sluice_core::traits::AssetLedger;
use sluice_core::types::{AccountId, Amount, AssetId};

/// Measures every transfer against the ledger instead of trusting it.
pub struct DriftAccountant {
    ledger: Arc<dyn AssetLedger>,
    /// The engine's own holder account on the ledger.
    treasury: AccountId,
}

impl DriftAccountant {
    pub fn new(ledger: Arc<dyn AssetLedger>, treasury: AccountId) -> Self {
        Self { ledger, treasury }
    }

    pub fn treasury(&self) -> AccountId {
        self.treasury
    }

    /// Pull `nominal` of `asset` from `from` into the treasury and return the
    /// treasury's observed balance increase.
    ///
    /// Fails with [`InsufficientTransfer`](DistributionError::InsufficientTransfer)
    /// if the increase falls short of `min_required`.
    pub fn collect(
        &self,
        asset: AssetId,
        from: AccountId,
        nominal: Amount,
        min_required: Amount,
    ) -> Result<Amount, DistributionError> {
        let before = self.ledger.balance_of(asset, self.treasury)?;
        self.ledger.transfer_in(asset, from, nominal)?;
        let after = self.ledger.balance_of(asset, self.treasury)?;
        // A concurrent rebase can shrink the balance mid-call; saturate so the
        // minimum check below reports it instead of an underflow.
        let received = after.saturating_sub(before);
        if received < min_required {
            return Err(DistributionError::InsufficientTransfer {
                received,
                required: min_required,
            });
        }
        if received != nominal {
            warn!(asset = %asset, nominal = %nominal, received = %received, "inbound transfer drift");
        }
        Ok(received)
    }

    /// Push `nominal` of `asset` from the treasury to `to` and return the
    /// recipient's observed balance increase.
    pub fn disburse(
        &self,
        asset: AssetId,
        to: AccountId,
        nominal: Amount,
        min_required: Amount,
    ) -> Result<Amount, DistributionError> {
        let before = self.ledger.balance_of(asset, to)?;
        self.ledger.transfer_out(asset, to, nominal)?;
        let after = self.ledger.balance_of(asset, to)?;
        let received = after.saturating_sub(before);
        if received < min_required {
            return Err(DistributionError::InsufficientTransfer {
                received,
                required: min_required,
            });
        }
        if received != nominal {
            warn!(asset = %asset, nominal = %nominal, received = %received, "outbound transfer drift");
        }
        Ok(received)
    }
}
