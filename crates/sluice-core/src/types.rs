//! Core protocol types: periods, entitlements, identifiers.
//!
//! All monetary values are `u128` fixed-point integers at
//! [`UNIT`](crate::constants::UNIT) scale (10^18). Division always truncates
//! toward zero; downstream conservation invariants depend on that exact
//! truncation, so no rounding is ever applied.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DistributionError;

/// Fixed-point monetary amount at 10^18 scale.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Monotonically assigned period identifier (first period = 1).
pub type PeriodId = u64;

/// Truncating fixed-point multiply-divide: `a * b / d`.
///
/// The intermediate product is checked; returns
/// [`ArithmeticOverflow`](DistributionError::ArithmeticOverflow) if it does
/// not fit in a `u128` or `d` is zero.
pub fn mul_div(a: Amount, b: Amount, d: Amount) -> Result<Amount, DistributionError> {
    a.checked_mul(b)
        .and_then(|p| p.checked_div(d))
        .ok_or(DistributionError::ArithmeticOverflow)
}

/// A 32-byte hash value.
///
/// Used for commitment-tree leaves, internal nodes, and roots (BLAKE3).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash (32 zero bytes). Marks "no commitment root yet".
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Opaque 32-byte account identifier on the external asset ledger.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Abbreviated form for logs; full identity lives in the bytes.
        write!(f, "{}…", hex::encode(&self.0[..4]))
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Opaque 32-byte identifier of a transferable asset.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AssetId(pub [u8; 32]);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", hex::encode(&self.0[..4]))
    }
}

impl From<[u8; 32]> for AssetId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// The two distribution disciplines a period can run under.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub enum DistributionMode {
    /// Entitlements unlock linearly over a fixed duration from credit time.
    Vested,
    /// Entitlements are paid in full once the period is settled.
    Immediate,
}

/// Mode-specific terms and accumulators of a vested period.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct VestedTerms {
    /// Linear unlock duration in seconds, counted from each credit.
    pub vest_duration: u64,
    /// Early-exit penalty floor in basis points.
    pub penalty_base_bps: u32,
    /// Additional penalty at `elapsed = 0`, decaying linearly to zero.
    pub penalty_add_bps: u32,
    /// Extra delay after `expire_time` before the never-credited remainder
    /// may be recovered by the operator.
    pub reclaim_window: u64,
    /// Sum of all credited entitlements.
    pub credited_total: Amount,
    /// Accumulated early-exit penalties.
    pub penalty_total: Amount,
    /// Portion of `penalty_total` already swept by the operator.
    pub penalty_withdrawn: Amount,
    /// Never-credited remainder already recovered by the operator.
    pub expired_withdrawn: Amount,
}

/// Post-campaign settlement figures of an immediate period.
///
/// Written exactly once by the operator; the three figures must sum to the
/// period's drift-measured `total`.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Settlement {
    /// Value reserved for proof-based claims.
    pub claim_allocation: Amount,
    /// Value accrued to the per-asset fee pool.
    pub tax: Amount,
    /// Value never allocated to any recipient.
    pub undistributed: Amount,
}

/// Mode-specific terms and accumulators of an immediate period (tranche).
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct ImmediateTerms {
    /// Claim window after `expire_time`; claims past
    /// `expire_time + reclaim_duration` are rejected and the remainder
    /// becomes recyclable.
    pub reclaim_duration: u64,
    /// Settlement figures, absent until the operator records them.
    pub settlement: Option<Settlement>,
    /// Value claimed since settlement.
    pub claimed_total: Amount,
    /// Value already recycled back to the provider.
    pub recycled_total: Amount,
}

/// Mode-specific half of a [`DistributionPeriod`].
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub enum PeriodTerms {
    Vested(VestedTerms),
    Immediate(ImmediateTerms),
}

/// A time-bounded pool of value with its own commitment root and accounting
/// totals.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct DistributionPeriod {
    pub id: PeriodId,
    /// Asset being distributed.
    pub asset: AssetId,
    /// Account that funded the period; owns reclamation rights.
    pub provider: AccountId,
    /// Root of the entitlement commitment tree. Zero for immediate periods
    /// until settlement records it.
    pub commitment_root: Hash256,
    /// Drift-measured deposit, not the nominal figure the provider requested.
    pub total: Amount,
    pub start_time: Timestamp,
    pub expire_time: Timestamp,
    pub terms: PeriodTerms,
}

impl DistributionPeriod {
    pub fn mode(&self) -> DistributionMode {
        match self.terms {
            PeriodTerms::Vested(_) => DistributionMode::Vested,
            PeriodTerms::Immediate(_) => DistributionMode::Immediate,
        }
    }

    /// The vested terms, or [`WrongMode`](DistributionError::WrongMode).
    pub fn vested(&self) -> Result<&VestedTerms, DistributionError> {
        match &self.terms {
            PeriodTerms::Vested(t) => Ok(t),
            PeriodTerms::Immediate(_) => Err(DistributionError::WrongMode),
        }
    }

    pub fn vested_mut(&mut self) -> Result<&mut VestedTerms, DistributionError> {
        match &mut self.terms {
            PeriodTerms::Vested(t) => Ok(t),
            PeriodTerms::Immediate(_) => Err(DistributionError::WrongMode),
        }
    }

    /// The immediate terms, or [`WrongMode`](DistributionError::WrongMode).
    pub fn immediate(&self) -> Result<&ImmediateTerms, DistributionError> {
        match &self.terms {
            PeriodTerms::Immediate(t) => Ok(t),
            PeriodTerms::Vested(_) => Err(DistributionError::WrongMode),
        }
    }

    pub fn immediate_mut(&mut self) -> Result<&mut ImmediateTerms, DistributionError> {
        match &mut self.terms {
            PeriodTerms::Immediate(t) => Ok(t),
            PeriodTerms::Vested(_) => Err(DistributionError::WrongMode),
        }
    }
}

/// Per-recipient record of a credited entitlement, keyed by
/// `(PeriodId, AccountId)`.
///
/// Created on the first successful proof verification and never deleted;
/// its existence is what makes crediting exactly-once.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountEntitlement {
    /// Proven entitlement. Set exactly once, immutable thereafter.
    pub amount: Amount,
    /// Value already paid out (withdrawals, exit payout, conversions).
    pub withdrawn: Amount,
    /// Penalty recorded by an early exit.
    pub penalty: Amount,
    /// Terminal: set by an early exit.
    pub exited: bool,
    /// Terminal: set by a conversion into the external time-lock.
    pub converted: bool,
    /// When the vesting clock started (credit time). Unused in immediate mode.
    pub vest_start: Timestamp,
}

impl AccountEntitlement {
    /// Remaining value not yet paid out or forfeited.
    pub fn remaining(&self) -> Amount {
        self.amount
            .saturating_sub(self.withdrawn)
            .saturating_sub(self.penalty)
    }
}

/// Result of an early-exit computation over the unwithdrawn remainder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitQuote {
    /// Value forfeited to the period's penalty pool.
    pub penalty: Amount,
    /// Value paid out to the recipient.
    pub payout: Amount,
}

/// State of an account's external time-lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockState {
    pub amount: Amount,
    pub unlock_time: Timestamp,
}

/// Creation parameters for a vested period.
///
/// The commitment root must be known up front: vested crediting starts as
/// soon as the window opens.
#[derive(Clone, Debug)]
pub struct VestedSpec {
    pub asset: AssetId,
    pub commitment_root: Hash256,
    pub total: Amount,
    pub start_time: Timestamp,
    pub expire_time: Timestamp,
    pub vest_duration: u64,
    pub penalty_base_bps: u32,
    pub penalty_add_bps: u32,
    pub reclaim_window: u64,
}

/// Creation parameters for an immediate period (tranche).
///
/// The commitment root is deferred to settlement.
#[derive(Clone, Debug)]
pub struct ImmediateSpec {
    pub asset: AssetId,
    pub total: Amount,
    pub start_time: Timestamp,
    pub expire_time: Timestamp,
    pub reclaim_duration: u64,
}
