//! Ledger implementation over the per-model `users.json` document.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use zkserve_core::{ModelId, StorageError, UserId};
use zkserve_store::ArtifactStore;

/// Quota granted to an account on first touch.
pub const DEFAULT_QUOTA: u64 = 10;

/// Per-(user, model) credit counters.
///
/// Serialized with the field names the ledger document has always used
/// (`onChainReq` / `offChainReq` / `totalReq`), which are also the names the
/// API exposes on `/userbalance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccount {
    /// Proof verifications performed on chain.
    #[serde(rename = "onChainReq")]
    pub on_chain_requests: u64,
    /// Off-chain proof generations debited so far.
    #[serde(rename = "offChainReq")]
    pub off_chain_requests: u64,
    /// Quota ceiling for off-chain proof generations.
    #[serde(rename = "totalReq")]
    pub total_requests: u64,
}

impl CreditAccount {
    /// A fresh account with the given quota and no recorded requests.
    fn with_quota(total: u64) -> Self {
        Self {
            on_chain_requests: 0,
            off_chain_requests: 0,
            total_requests: total,
        }
    }

    /// The zero account reported for users the ledger has never seen.
    pub fn zero() -> Self {
        Self::with_quota(0)
    }

    /// Remaining off-chain proof generations.
    pub fn remaining(&self) -> u64 {
        self.total_requests.saturating_sub(self.off_chain_requests)
    }
}

/// Ledger operation failure.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The account has no remaining quota. No mutation was applied.
    #[error("user {user} has no remaining credits for model {model} ({used}/{total} used)")]
    QuotaExceeded {
        /// The debiting user.
        user: UserId,
        /// The model being proved against.
        model: ModelId,
        /// Off-chain requests already debited.
        used: u64,
        /// The account's quota ceiling.
        total: u64,
    },

    /// The ledger document could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The on-disk shape of `users.json`: user id → account.
type LedgerDoc = HashMap<String, CreditAccount>;

/// Concurrency-safe credit ledger over per-model documents.
///
/// Cloneable; clones share the same lock table, so every handle in the
/// process participates in the same linearization order.
#[derive(Debug, Clone)]
pub struct CreditLedger {
    store: ArtifactStore,
    /// One mutex per model document. `Mutex<HashMap>` only guards the table;
    /// the inner `Arc<Mutex<()>>` serializes document operations.
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    default_quota: u64,
}

impl CreditLedger {
    /// Create a ledger over the given artifact store with the standard
    /// first-touch quota.
    pub fn new(store: ArtifactStore) -> Self {
        Self::with_default_quota(store, DEFAULT_QUOTA)
    }

    /// Create a ledger with a custom first-touch quota.
    pub fn with_default_quota(store: ArtifactStore, default_quota: u64) -> Self {
        Self {
            store,
            locks: Arc::new(Mutex::new(HashMap::new())),
            default_quota,
        }
    }

    /// The quota granted to accounts on first touch.
    pub fn default_quota(&self) -> u64 {
        self.default_quota
    }

    /// Atomically check quota and debit one off-chain request.
    ///
    /// First-touch creation and first debit are one atomic step: an unknown
    /// user gets the default quota and leaves with `offChainReq == 1`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::QuotaExceeded`] if `offChainReq == totalReq`; the
    /// document is left untouched and the caller must not invoke the prover.
    pub fn check_and_debit(
        &self,
        user: &UserId,
        model: &ModelId,
    ) -> Result<CreditAccount, LedgerError> {
        self.with_doc(model, |doc| {
            let account = doc
                .entry(user.as_str().to_string())
                .or_insert_with(|| CreditAccount::with_quota(self.default_quota));
            if account.off_chain_requests >= account.total_requests {
                return Err(LedgerError::QuotaExceeded {
                    user: user.clone(),
                    model: model.clone(),
                    used: account.off_chain_requests,
                    total: account.total_requests,
                });
            }
            account.off_chain_requests += 1;
            tracing::debug!(
                user = %user,
                model = %model,
                used = account.off_chain_requests,
                total = account.total_requests,
                "debited off-chain request"
            );
            Ok(*account)
        })
    }

    /// Atomically raise a user's quota ceiling by `amount`.
    ///
    /// Unknown users are first created with the default quota, then
    /// credited, so the call always has its documented effect.
    pub fn credit(
        &self,
        user: &UserId,
        model: &ModelId,
        amount: u64,
    ) -> Result<CreditAccount, LedgerError> {
        self.with_doc(model, |doc| {
            let account = doc
                .entry(user.as_str().to_string())
                .or_insert_with(|| CreditAccount::with_quota(self.default_quota));
            account.total_requests = account.total_requests.saturating_add(amount);
            tracing::info!(user = %user, model = %model, total = account.total_requests, "credited quota");
            Ok(*account)
        })
    }

    /// Return a user's account, or the zero account if the ledger has never
    /// seen them for this model.
    pub fn balance(&self, user: &UserId, model: &ModelId) -> Result<CreditAccount, LedgerError> {
        let lock = self.model_lock(model);
        let _guard = lock.lock();
        let doc = self.load(model)?;
        Ok(doc
            .get(user.as_str())
            .copied()
            .unwrap_or_else(CreditAccount::zero))
    }

    /// Return a granted debit whose proof attempt never reached the engine.
    ///
    /// Saturates at zero; refunding a user the ledger has never seen is a
    /// no-op.
    pub fn refund(&self, user: &UserId, model: &ModelId) -> Result<(), LedgerError> {
        self.with_doc(model, |doc| {
            if let Some(account) = doc.get_mut(user.as_str()) {
                account.off_chain_requests = account.off_chain_requests.saturating_sub(1);
                tracing::debug!(user = %user, model = %model, "refunded off-chain request");
            }
            Ok(())
        })
    }

    /// Seed an empty ledger document for a newly registered model.
    pub fn init_model(&self, model: &ModelId) -> Result<(), LedgerError> {
        let lock = self.model_lock(model);
        let _guard = lock.lock();
        match self.store.read_ledger(model) {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => self.persist(model, &LedgerDoc::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Run `f` against the model's document under its mutex, persisting the
    /// document afterwards only if `f` succeeded.
    fn with_doc<T>(
        &self,
        model: &ModelId,
        f: impl FnOnce(&mut LedgerDoc) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let lock = self.model_lock(model);
        let _guard = lock.lock();
        let mut doc = self.load(model)?;
        let out = f(&mut doc)?;
        self.persist(model, &doc)?;
        Ok(out)
    }

    /// Fetch (or create) the mutex guarding one model's document.
    fn model_lock(&self, model: &ModelId) -> Arc<Mutex<()>> {
        let mut table = self.locks.lock();
        table
            .entry(model.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn load(&self, model: &ModelId) -> Result<LedgerDoc, LedgerError> {
        match self.store.read_ledger(model) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| {
                    LedgerError::Storage(StorageError::Corrupt {
                        path: self.store.ledger_path(model),
                        reason: e.to_string(),
                    })
                })
            }
            Err(e) if e.is_not_found() => Ok(LedgerDoc::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, model: &ModelId, doc: &LedgerDoc) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec_pretty(doc).map_err(|e| {
            LedgerError::Storage(StorageError::Corrupt {
                path: self.store.ledger_path(model),
                reason: e.to_string(),
            })
        })?;
        self.store.write_ledger(model, &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ledger_with_quota(quota: u64) -> (TempDir, CreditLedger, ModelId, UserId) {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let model = ModelId::new("m1").unwrap();
        store.ensure_layout(&model).unwrap();
        let ledger = CreditLedger::with_default_quota(store, quota);
        let user = UserId::new("0xABC").unwrap();
        (dir, ledger, model, user)
    }

    #[test]
    fn first_debit_creates_account_at_one() {
        let (_dir, ledger, model, user) = ledger_with_quota(10);
        let account = ledger.check_and_debit(&user, &model).unwrap();
        assert_eq!(account.off_chain_requests, 1);
        assert_eq!(account.total_requests, 10);
        assert_eq!(account.on_chain_requests, 0);
    }

    #[test]
    fn quota_exhaustion_rejects_without_mutation() {
        let (_dir, ledger, model, user) = ledger_with_quota(3);
        for _ in 0..3 {
            ledger.check_and_debit(&user, &model).unwrap();
        }

        let err = ledger.check_and_debit(&user, &model).unwrap_err();
        assert!(matches!(err, LedgerError::QuotaExceeded { used: 3, total: 3, .. }));

        // The rejected debit must not have been recorded.
        let account = ledger.balance(&user, &model).unwrap();
        assert_eq!(account.off_chain_requests, 3);
    }

    #[test]
    fn exactly_quota_many_debits_succeed() {
        let (_dir, ledger, model, user) = ledger_with_quota(5);
        for i in 1..=5 {
            let account = ledger.check_and_debit(&user, &model).unwrap();
            assert_eq!(account.off_chain_requests, i);
        }
        assert!(ledger.check_and_debit(&user, &model).is_err());
    }

    #[test]
    fn concurrent_debits_grant_exactly_quota() {
        let (_dir, ledger, model, user) = ledger_with_quota(3);
        let threads = 8;

        let granted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let ledger = ledger.clone();
                    let model = model.clone();
                    let user = user.clone();
                    scope.spawn(move || ledger.check_and_debit(&user, &model).is_ok() as usize)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(granted, 3, "exactly quota-many debits may be granted");
        let account = ledger.balance(&user, &model).unwrap();
        assert_eq!(account.off_chain_requests, 3);
    }

    #[test]
    fn credit_raises_ceiling() {
        let (_dir, ledger, model, user) = ledger_with_quota(1);
        ledger.check_and_debit(&user, &model).unwrap();
        assert!(ledger.check_and_debit(&user, &model).is_err());

        let account = ledger.credit(&user, &model, 2).unwrap();
        assert_eq!(account.total_requests, 3);
        assert!(ledger.check_and_debit(&user, &model).is_ok());
    }

    #[test]
    fn credit_unknown_user_starts_from_default_quota() {
        let (_dir, ledger, model, _) = ledger_with_quota(10);
        let user = UserId::new("0xNEW").unwrap();
        let account = ledger.credit(&user, &model, 5).unwrap();
        assert_eq!(account.total_requests, 15);
        assert_eq!(account.off_chain_requests, 0);
    }

    #[test]
    fn balance_unknown_user_is_zero_defaults() {
        let (_dir, ledger, model, _) = ledger_with_quota(10);
        let user = UserId::new("0xNOBODY").unwrap();
        let account = ledger.balance(&user, &model).unwrap();
        assert_eq!(account, CreditAccount::zero());
    }

    #[test]
    fn refund_returns_one_debit() {
        let (_dir, ledger, model, user) = ledger_with_quota(2);
        ledger.check_and_debit(&user, &model).unwrap();
        ledger.refund(&user, &model).unwrap();
        let account = ledger.balance(&user, &model).unwrap();
        assert_eq!(account.off_chain_requests, 0);
    }

    #[test]
    fn refund_unknown_user_is_noop() {
        let (_dir, ledger, model, _) = ledger_with_quota(2);
        let user = UserId::new("0xGHOST").unwrap();
        ledger.refund(&user, &model).unwrap();
        assert_eq!(ledger.balance(&user, &model).unwrap(), CreditAccount::zero());
    }

    #[test]
    fn accounts_are_scoped_per_model() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let m1 = ModelId::new("m1").unwrap();
        let m2 = ModelId::new("m2").unwrap();
        store.ensure_layout(&m1).unwrap();
        store.ensure_layout(&m2).unwrap();
        let ledger = CreditLedger::with_default_quota(store, 1);
        let user = UserId::new("0xABC").unwrap();

        ledger.check_and_debit(&user, &m1).unwrap();
        // Exhausted on m1 does not affect m2.
        assert!(ledger.check_and_debit(&user, &m1).is_err());
        assert!(ledger.check_and_debit(&user, &m2).is_ok());
    }

    #[test]
    fn state_survives_reopening_the_ledger() {
        let dir = TempDir::new().unwrap();
        let model = ModelId::new("m1").unwrap();
        let user = UserId::new("0xABC").unwrap();
        {
            let store = ArtifactStore::new(dir.path()).unwrap();
            store.ensure_layout(&model).unwrap();
            let ledger = CreditLedger::with_default_quota(store, 4);
            ledger.check_and_debit(&user, &model).unwrap();
            ledger.check_and_debit(&user, &model).unwrap();
        }
        let store = ArtifactStore::new(dir.path()).unwrap();
        let ledger = CreditLedger::with_default_quota(store, 4);
        let account = ledger.balance(&user, &model).unwrap();
        assert_eq!(account.off_chain_requests, 2);
        assert_eq!(account.total_requests, 4);
    }

    #[test]
    fn document_uses_original_field_names() {
        let (_dir, ledger, model, user) = ledger_with_quota(10);
        ledger.check_and_debit(&user, &model).unwrap();

        let json = serde_json::to_value(ledger.balance(&user, &model).unwrap()).unwrap();
        assert_eq!(json["offChainReq"], 1);
        assert_eq!(json["totalReq"], 10);
        assert_eq!(json["onChainReq"], 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// However debits and credits interleave, a granted debit never
            /// pushes usage past the ceiling.
            #[test]
            fn usage_never_exceeds_ceiling(ops in proptest::collection::vec(0u8..3, 1..40)) {
                let (_dir, ledger, model, user) = ledger_with_quota(2);
                for op in ops {
                    match op {
                        0 => { let _ = ledger.check_and_debit(&user, &model); }
                        1 => { let _ = ledger.credit(&user, &model, 1); }
                        _ => { let _ = ledger.refund(&user, &model); }
                    }
                    let account = ledger.balance(&user, &model).unwrap();
                    prop_assert!(account.off_chain_requests <= account.total_requests);
                }
            }
        }
    }
}
