//! Error types for the Sluice protocol.
use thiserror::Error;

use crate::types::{Amount, PeriodId, Timestamp};

/// Failures surfaced by the distribution engine.
///
/// Every failed call maps to exactly one variant; nothing here is transient
/// and nothing is retried. Idempotent no-ops (e.g. a repeated penalty sweep
/// that moves zero) are successes, not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributionError {
    #[error("unknown period: {0}")] UnknownPeriod(PeriodId),
    #[error("operation does not apply to this period mode")] WrongMode,
    #[error("invalid window: start {start}, expire {expire}")] InvalidWindow { start: Timestamp, expire: Timestamp },
    #[error("incomplete config: {0}")] ConfigIncomplete(&'static str),
    #[error("period already started")] AlreadyStarted,
    #[error("period not ended")] NotEnded,
    #[error("period not started")] NotStarted,
    #[error("period expired")] Expired,
    #[error("settlement mismatch: parts sum to {parts}, total is {total}")] AccountingMismatch { parts: Amount, total: Amount },
    #[error("incorrect commitment proof")] ProofInvalid,
    #[error("already processed")] AlreadyProcessed,
    #[error("mismatching batch inputs")] MismatchedInputs,
    #[error("empty amount")] EmptyAmount,
    #[error("empty withdraw")] EmptyWithdraw,
    #[error("entitlement exited")] Exited,
    #[error("entitlement converted")] Converted,
    #[error("requested {requested} exceeds withdrawable {available}")] AmountExceedsWithdrawable { requested: Amount, available: Amount },
    #[error("amount exceeds remaining claim allocation")] AmountExceedsAllocation,
    #[error("no claim allocation for this period")] NoReward,
    #[error("slippage param out of range: {0} bps")] SlippageParamInvalid(u32),
    #[error("slippage exceeded")] SlippageExceeded,
    #[error("lock duration out of range")] LockDurationOutOfRange,
    #[error("insufficient transfer: received {received}, required {required}")] InsufficientTransfer { received: Amount, required: Amount },
    #[error("invalid reclaim amount")] InvalidAmount,
    #[error("insufficient funds")] InsufficientFunds,
    #[error("unauthorized")] Unauthorized,
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error(transparent)] Collaborator(#[from] CollaboratorError),
}

/// Failures reported by external collaborators (asset ledger, swap router,
/// time-lock service).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("asset ledger: {0}")] Ledger(String),
    #[error("swap router: {0}")] Router(String),
    #[error("lock service: {0}")] Lock(String),
}
