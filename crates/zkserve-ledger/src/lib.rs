#![deny(missing_docs)]

//! # zkserve-ledger — Credit Ledger
//!
//! Per-(user, model) quota counters gating off-chain proof generation.
//!
//! ## Linearizability Invariant
//!
//! Every operation on a model's ledger document runs under that model's
//! mutex: load, validate, mutate, persist, release. Two concurrent debits
//! for the same `(user, model)` can never both observe room under quota —
//! the second waits for the first's persisted state.
//!
//! ## Billing Invariant
//!
//! A debit is only granted after the incremented counter has been durably
//! persisted; a rejected debit mutates nothing. The pipeline refunds a
//! granted debit whose proof attempt never reached the engine, so no proof
//! is billed without being attempted and none is attempted past quota.

mod ledger;

pub use ledger::{CreditAccount, CreditLedger, LedgerError};
