//! The ledger seam used by the reconciler.
//!
//! A [`LedgerStore`] owns the three pieces of state a settlement touches:
//! the transaction row, the owner's balance and the deposit record. All of
//! them change together in [`LedgerStore::commit_transition`] or not at all.

mod memory;
mod postgres;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

use crate::entities::TransactionStatus;
use crate::entities::deposit_record::DepositRecordInsert;
use crate::entities::payment_transaction::PaymentTransaction;
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Everything a settlement writes, decided before the write starts.
#[derive(Debug, Clone)]
pub struct TransitionPlan {
    pub transaction_id: Uuid,
    pub external_id: String,
    pub user_id: Uuid,
    pub target: TransactionStatus,
    /// Signed change to the owner's balance. `None` leaves it untouched.
    pub balance_delta: Option<Decimal>,
    /// When set, the balance delta is applied only if this record did not
    /// exist yet.
    pub deposit_record: Option<DepositRecordInsert>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied {
        balance_before: Option<Decimal>,
        balance_after: Option<Decimal>,
        deposit_recorded: bool,
    },
    /// Someone else settled the transaction first. Nothing was written.
    AlreadyTerminal(TransactionStatus),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("transaction {0} disappeared during settlement")]
    TransactionVanished(String),
    #[error("user {0} has no profile")]
    UserNotFound(Uuid),
    #[error("balance of user {user_id} is {balance}, {required} required")]
    InsufficientBalance {
        user_id: Uuid,
        balance: Decimal,
        required: Decimal,
    },
    #[error("transaction {0} changed status concurrently")]
    ConcurrentUpdate(String),
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_transaction(
        &self,
        external_id: &str,
    ) -> Result<Option<PaymentTransaction>, StoreError>;

    /// Apply `plan` atomically if the transaction is still pending.
    ///
    /// The pending check and the writes happen under the same lock, so two
    /// concurrent commits for one transaction can never both apply.
    async fn commit_transition(&self, plan: TransitionPlan) -> Result<CommitOutcome, StoreError>;
}
