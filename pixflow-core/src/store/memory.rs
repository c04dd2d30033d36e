use super::{CommitOutcome, LedgerStore, StoreError, TransitionPlan};
use crate::entities::deposit_record::DepositRecord;
use crate::entities::payment_transaction::PaymentTransaction;
use crate::entities::{Direction, TransactionStatus};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Ledger {
    transactions: HashMap<String, PaymentTransaction>,
    balances: HashMap<Uuid, Decimal>,
    deposit_records: Vec<DepositRecord>,
}

/// In-memory [`LedgerStore`].
///
/// One mutex guards the whole ledger, which gives commits the same
/// all-or-nothing behaviour as the Postgres store.
#[derive(Default)]
pub struct MemoryLedgerStore {
    ledger: Mutex<Ledger>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_transaction(&self, transaction: PaymentTransaction) {
        self.ledger
            .lock()
            .await
            .transactions
            .insert(transaction.external_id.clone(), transaction);
    }

    /// Register a pending transaction and return its internal id.
    pub async fn insert_pending(
        &self,
        external_id: &str,
        direction: Direction,
        amount: Decimal,
        user_id: Uuid,
    ) -> Uuid {
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();
        self.insert_transaction(PaymentTransaction {
            id,
            external_id: external_id.to_owned(),
            correlation_id: format!("corr-{external_id}"),
            direction,
            status: TransactionStatus::Pending,
            amount,
            amount_display: amount,
            user_id,
            person_name: None,
            person_cpf: None,
            gateway_payload: None,
            created_at: now,
            updated_at: now,
            settled_at: None,
        })
        .await;
        id
    }

    pub async fn set_balance(&self, user_id: Uuid, balance: Decimal) {
        self.ledger.lock().await.balances.insert(user_id, balance);
    }

    pub async fn balance(&self, user_id: Uuid) -> Option<Decimal> {
        self.ledger.lock().await.balances.get(&user_id).copied()
    }

    pub async fn transaction(&self, external_id: &str) -> Option<PaymentTransaction> {
        self.ledger.lock().await.transactions.get(external_id).cloned()
    }

    pub async fn deposit_records(&self) -> Vec<DepositRecord> {
        self.ledger.lock().await.deposit_records.clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn find_transaction(
        &self,
        external_id: &str,
    ) -> Result<Option<PaymentTransaction>, StoreError> {
        Ok(self.transaction(external_id).await)
    }

    async fn commit_transition(&self, plan: TransitionPlan) -> Result<CommitOutcome, StoreError> {
        let mut ledger = self.ledger.lock().await;
        let ledger = &mut *ledger;

        let status = ledger
            .transactions
            .get(&plan.external_id)
            .map(|t| t.status)
            .ok_or_else(|| StoreError::TransactionVanished(plan.external_id.clone()))?;
        if status.is_terminal() {
            return Ok(CommitOutcome::AlreadyTerminal(status));
        }

        // Validate everything before the first write.
        let record_exists = plan.deposit_record.as_ref().is_some_and(|r| {
            ledger
                .deposit_records
                .iter()
                .any(|d| d.external_id == r.external_id)
        });
        let deposit_recorded = plan.deposit_record.is_some() && !record_exists;
        let apply_delta = plan.deposit_record.is_none() || deposit_recorded;

        let balances = match plan.balance_delta {
            Some(delta) if apply_delta => {
                let before = *ledger
                    .balances
                    .get(&plan.user_id)
                    .ok_or(StoreError::UserNotFound(plan.user_id))?;
                let after = before + delta;
                if after < Decimal::ZERO {
                    return Err(StoreError::InsufficientBalance {
                        user_id: plan.user_id,
                        balance: before,
                        required: -delta,
                    });
                }
                Some((before, after))
            }
            _ => None,
        };

        let now = OffsetDateTime::now_utc();
        if let Some(record) = plan.deposit_record.filter(|_| deposit_recorded) {
            let id = ledger.deposit_records.len() as i64 + 1;
            ledger.deposit_records.push(DepositRecord {
                id,
                external_id: record.external_id,
                transaction_id: record.transaction_id,
                user_id: record.user_id,
                amount: record.amount,
                method: record.method,
                created_at: now,
            });
        }
        if let Some((_, after)) = balances {
            ledger.balances.insert(plan.user_id, after);
        }
        if let Some(transaction) = ledger.transactions.get_mut(&plan.external_id) {
            transaction.status = plan.target;
            transaction.updated_at = now;
            transaction.settled_at = Some(now);
        }

        Ok(CommitOutcome::Applied {
            balance_before: balances.map(|(before, _)| before),
            balance_after: balances.map(|(_, after)| after),
            deposit_recorded,
        })
    }
}
