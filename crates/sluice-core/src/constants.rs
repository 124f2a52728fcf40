//! Protocol constants. All monetary values are fixed-point integers at
//! `UNIT` scale (1 whole token = 10^18 units); all rates are basis points
//! out of [`BPS`].

use crate::types::{Amount, Timestamp};

/// Fixed-point scale: 1 whole token = 10^18 units.
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// Basis-point precision: 100% = 10,000 bps.
pub const BPS: u32 = 10_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Lowest accepted slippage parameter for conversions (90%).
///
/// A conversion's minimum swap output is `amount * slippage_bps / BPS`, so
/// parameters below this floor would tolerate more than 10% price movement.
pub const SLIPPAGE_FLOOR_BPS: u32 = 9_000;

/// Shortest accepted remaining lock duration when depositing into the
/// external time-lock (30 days).
pub const MIN_LOCK_DURATION: u64 = 30 * SECONDS_PER_DAY;

/// Longest accepted lock duration (4 years).
pub const MAX_LOCK_DURATION: u64 = 4 * 365 * SECONDS_PER_DAY;

/// Sentinel `lock_until` value meaning "keep the existing lock's unlock time".
pub const KEEP_CURRENT_LOCK: Timestamp = 0;

/// Default claim window after an immediate period's campaign end.
pub const DEFAULT_RECLAIM_DURATION: u64 = 90 * SECONDS_PER_DAY;

/// Default delay after a vested period's expiry before the never-credited
/// remainder may be recovered.
pub const DEFAULT_RECLAIM_WINDOW: u64 = 30 * SECONDS_PER_DAY;
