//! Shared harness for engine integration tests: mock collaborators wired
//! into a [`DistributionEngine`] with a controllable clock.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use sluice_core::commitment::CommitmentTree;
use sluice_core::constants::{
    BPS, DEFAULT_RECLAIM_DURATION, DEFAULT_RECLAIM_WINDOW, SECONDS_PER_DAY, UNIT,
};
use sluice_core::error::CollaboratorError;
use sluice_core::traits::{AssetLedger, Clock, LockService, RoleOracle, SwapRouter};
use sluice_core::types::{
    AccountId, Amount, AssetId, Hash256, ImmediateSpec, LockState, PeriodId, Timestamp, VestedSpec,
};
use sluice_engine::{DistributionEngine, EngineConfig};

pub const DAY: u64 = SECONDS_PER_DAY;
pub const T0: Timestamp = 1_000_000;

pub const TREASURY: AccountId = AccountId([0xEE; 32]);
pub const OPERATOR: AccountId = AccountId([0x0A; 32]);
pub const PROVIDER: AccountId = AccountId([0x0B; 32]);

/// Asset being distributed.
pub const REWARD: AssetId = AssetId([0xA0; 32]);
/// Asset recipients pay with when converting.
pub const PAIR: AssetId = AssetId([0xB0; 32]);

pub fn acct(byte: u8) -> AccountId {
    AccountId([byte; 32])
}

pub fn asset_id(byte: u8) -> AssetId {
    AssetId([byte; 32])
}

// ----------------------------------------------------------------------
// Mock: AssetLedger with optional fee-on-transfer per asset
// ----------------------------------------------------------------------

pub struct MockLedger {
    balances: Mutex<HashMap<(AssetId, AccountId), Amount>>,
    fee_bps: Mutex<HashMap<AssetId, u32>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            fee_bps: Mutex::new(HashMap::new()),
        }
    }

    pub fn mint(&self, asset: AssetId, to: AccountId, amount: Amount) {
        *self.balances.lock().unwrap().entry((asset, to)).or_default() += amount;
    }

    /// Make `asset` deduct `bps` from every transfer's credited side.
    pub fn set_fee(&self, asset: AssetId, bps: u32) {
        self.fee_bps.lock().unwrap().insert(asset, bps);
    }

    pub fn balance(&self, asset: AssetId, holder: AccountId) -> Amount {
        *self
            .balances
            .lock()
            .unwrap()
            .get(&(asset, holder))
            .unwrap_or(&0)
    }

    fn credited(&self, asset: AssetId, nominal: Amount) -> Amount {
        let fee = *self.fee_bps.lock().unwrap().get(&asset).unwrap_or(&0);
        nominal - nominal * fee as Amount / BPS as Amount
    }
}

impl AssetLedger for MockLedger {
    fn transfer_in(
        &self,
        asset: AssetId,
        from: AccountId,
        nominal: Amount,
    ) -> Result<Amount, CollaboratorError> {
        let credited = self.credited(asset, nominal);
        let mut balances = self.balances.lock().unwrap();
        let src = balances.entry((asset, from)).or_default();
        if *src < nominal {
            return Err(CollaboratorError::Ledger("insufficient balance".into()));
        }
        *src -= nominal;
        *balances.entry((asset, TREASURY)).or_default() += credited;
        Ok(nominal)
    }

    fn transfer_out(
        &self,
        asset: AssetId,
        to: AccountId,
        nominal: Amount,
    ) -> Result<Amount, CollaboratorError> {
        let credited = self.credited(asset, nominal);
        let mut balances = self.balances.lock().unwrap();
        let src = balances.entry((asset, TREASURY)).or_default();
        if *src < nominal {
            return Err(CollaboratorError::Ledger("insufficient balance".into()));
        }
        *src -= nominal;
        *balances.entry((asset, to)).or_default() += credited;
        Ok(nominal)
    }

    fn balance_of(&self, asset: AssetId, holder: AccountId) -> Result<Amount, CollaboratorError> {
        Ok(self.balance(asset, holder))
    }
}

// ----------------------------------------------------------------------
// Mock: SwapRouter with a configurable rate
// ----------------------------------------------------------------------

pub struct MockRouter {
    /// Output per unit of input, in basis points (10_000 = 1:1).
    rate_bps: Mutex<u32>,
}

impl MockRouter {
    pub fn new() -> Self {
        Self {
            rate_bps: Mutex::new(BPS),
        }
    }

    pub fn set_rate(&self, bps: u32) {
        *self.rate_bps.lock().unwrap() = bps;
    }
}

impl SwapRouter for MockRouter {
    fn swap(
        &self,
        _input_asset: AssetId,
        amount_in: Amount,
        _output_asset: AssetId,
        min_out: Amount,
    ) -> Result<Amount, CollaboratorError> {
        let rate = *self.rate_bps.lock().unwrap();
        let out = amount_in * rate as Amount / BPS as Amount;
        if out < min_out {
            return Err(CollaboratorError::Router("insufficient output".into()));
        }
        Ok(out)
    }
}

// ----------------------------------------------------------------------
// Mock: LockService
// ----------------------------------------------------------------------

pub struct MockLock {
    locks: Mutex<HashMap<AccountId, LockState>>,
}

impl MockLock {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn lock_of(&self, owner: AccountId) -> Option<LockState> {
        self.locks.lock().unwrap().get(&owner).copied()
    }

    /// Seed a pre-existing lock, as if created directly with the service.
    pub fn seed_lock(&self, owner: AccountId, amount: Amount, unlock_time: Timestamp) {
        self.locks
            .lock()
            .unwrap()
            .insert(owner, LockState { amount, unlock_time });
    }
}

impl LockService for MockLock {
    fn create_lock(
        &self,
        owner: AccountId,
        amount: Amount,
        unlock_time: Timestamp,
    ) -> Result<(), CollaboratorError> {
        let mut locks = self.locks.lock().unwrap();
        if locks.contains_key(&owner) {
            return Err(CollaboratorError::Lock("lock already exists".into()));
        }
        locks.insert(owner, LockState { amount, unlock_time });
        Ok(())
    }

    fn increase_lock(
        &self,
        owner: AccountId,
        extra: Amount,
        new_unlock_time: Option<Timestamp>,
    ) -> Result<(), CollaboratorError> {
        let mut locks = self.locks.lock().unwrap();
        let lock = locks
            .get_mut(&owner)
            .ok_or_else(|| CollaboratorError::Lock("no existing lock".into()))?;
        lock.amount += extra;
        if let Some(unlock_time) = new_unlock_time {
            lock.unlock_time = unlock_time;
        }
        Ok(())
    }

    fn lock_state_of(&self, owner: AccountId) -> Result<Option<LockState>, CollaboratorError> {
        Ok(self.lock_of(owner))
    }
}

// ----------------------------------------------------------------------
// Mock: RoleOracle and Clock
// ----------------------------------------------------------------------

pub struct MockRoles {
    operator: AccountId,
}

impl RoleOracle for MockRoles {
    fn is_operator(&self, caller: AccountId) -> bool {
        caller == self.operator
    }
}

pub struct MockClock {
    now: AtomicU64,
}

impl MockClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

// ----------------------------------------------------------------------
// Harness
// ----------------------------------------------------------------------

pub struct Harness {
    pub engine: DistributionEngine,
    pub ledger: Arc<MockLedger>,
    pub router: Arc<MockRouter>,
    pub locker: Arc<MockLock>,
    pub clock: Arc<MockClock>,
}

pub fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();

    let ledger = Arc::new(MockLedger::new());
    let router = Arc::new(MockRouter::new());
    let locker = Arc::new(MockLock::new());
    let clock = Arc::new(MockClock::new(T0));
    let engine = DistributionEngine::new(
        ledger.clone(),
        router.clone(),
        locker.clone(),
        Arc::new(MockRoles { operator: OPERATOR }),
        clock.clone(),
        TREASURY,
        EngineConfig::new(PAIR),
    )
    .expect("valid default config");

    Harness {
        engine,
        ledger,
        router,
        locker,
        clock,
    }
}

/// The three-recipient entitlement set used across tests:
/// (A, 10), (B, 10), (C, 20), total 40.
pub fn sample_set() -> Vec<(AccountId, Amount)> {
    vec![
        (acct(1), 10 * UNIT),
        (acct(2), 10 * UNIT),
        (acct(3), 20 * UNIT),
    ]
}

pub fn sample_tree() -> CommitmentTree {
    CommitmentTree::from_entitlements(&sample_set())
}

/// Open a vested period funded by the operator with the standard terms:
/// 90-day vest, 20% + 60% decaying penalty, 30-day reclaim window.
pub fn open_vested(
    h: &Harness,
    root: Hash256,
    total: Amount,
    start: Timestamp,
    expire: Timestamp,
) -> PeriodId {
    h.ledger.mint(REWARD, OPERATOR, total);
    h.engine
        .open_vested_period(
            OPERATOR,
            VestedSpec {
                asset: REWARD,
                commitment_root: root,
                total,
                start_time: start,
                expire_time: expire,
                vest_duration: 90 * DAY,
                penalty_base_bps: 2_000,
                penalty_add_bps: 6_000,
                reclaim_window: DEFAULT_RECLAIM_WINDOW,
            },
        )
        .expect("open vested period")
}

/// Open an immediate period funded by the provider: campaign runs
/// `[now + 1 day, now + 2 days]` with a 90-day claim window after it.
pub fn open_immediate(h: &Harness, asset: AssetId, total: Amount) -> PeriodId {
    let now = h.clock.now();
    h.ledger.mint(asset, PROVIDER, total);
    h.engine
        .open_immediate_period(
            PROVIDER,
            ImmediateSpec {
                asset,
                total,
                start_time: now + DAY,
                expire_time: now + 2 * DAY,
                reclaim_duration: DEFAULT_RECLAIM_DURATION,
            },
        )
        .expect("open immediate period")
}
