use super::{CommitOutcome, LedgerStore, StoreError, TransitionPlan};
use crate::entities::deposit_record::DepositRecord;
use crate::entities::payment_transaction::{GetTransactionByExternalId, PaymentTransaction};
use crate::entities::user_balance::UserBalance;
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use tracing::{debug, info};

/// [`LedgerStore`] backed by Postgres.
///
/// A commit runs in one database transaction: the transaction row is locked
/// with `FOR UPDATE`, re-checked, and every write is rolled back together if
/// any of them fails.
#[derive(Clone)]
pub struct PgLedgerStore {
    db: DatabaseProcessor,
}

impl PgLedgerStore {
    pub fn new(db: DatabaseProcessor) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_transaction(
        &self,
        external_id: &str,
    ) -> Result<Option<PaymentTransaction>, StoreError> {
        Ok(self
            .db
            .process(GetTransactionByExternalId {
                external_id: external_id.to_owned(),
            })
            .await?)
    }

    #[tracing::instrument(skip_all, err, fields(external_id = %plan.external_id, target = %plan.target))]
    async fn commit_transition(&self, plan: TransitionPlan) -> Result<CommitOutcome, StoreError> {
        let mut tx = self.db.pool.begin().await?;

        let Some(current) = PaymentTransaction::lock_by_external_id_tx(&mut tx, &plan.external_id).await?
        else {
            return Err(StoreError::TransactionVanished(plan.external_id));
        };
        if current.status.is_terminal() {
            debug!(status = %current.status, "Transaction already settled, nothing to commit");
            tx.rollback().await?;
            return Ok(CommitOutcome::AlreadyTerminal(current.status));
        }

        let deposit_recorded = match &plan.deposit_record {
            Some(record) => DepositRecord::insert_if_absent_tx(&mut tx, record).await?,
            None => false,
        };
        let apply_delta = plan.deposit_record.is_none() || deposit_recorded;

        let (balance_before, balance_after) = match plan.balance_delta {
            Some(delta) if apply_delta => {
                let before = UserBalance::lock_tx(&mut tx, plan.user_id)
                    .await?
                    .ok_or(StoreError::UserNotFound(plan.user_id))?;
                let after = before + delta;
                if after < Decimal::ZERO {
                    return Err(StoreError::InsufficientBalance {
                        user_id: plan.user_id,
                        balance: before,
                        required: -delta,
                    });
                }
                UserBalance::write_tx(&mut tx, plan.user_id, after).await?;
                (Some(before), Some(after))
            }
            _ => (None, None),
        };

        if !PaymentTransaction::settle_tx(&mut tx, plan.transaction_id, plan.target).await? {
            return Err(StoreError::ConcurrentUpdate(plan.external_id));
        }

        tx.commit().await?;
        info!(
            balance_before = ?balance_before,
            balance_after = ?balance_after,
            deposit_recorded,
            "Settlement committed"
        );
        Ok(CommitOutcome::Applied {
            balance_before,
            balance_after,
            deposit_recorded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_log::{DebugLogger, MemoryDebugLogSink};
    use crate::entities::deposit_record::{DepositRecordInsert, PIX_METHOD};
    use crate::entities::payment_transaction::{NewPaymentTransaction, RegisterTransaction};
    use crate::entities::{Direction, TransactionStatus};
    use crate::gateway::GatewayStatus;
    use crate::processors::{ReconcileOutcome, Reconciler};
    use sqlx::PgPool;
    use std::str::FromStr;
    use std::sync::Arc;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn seed(
        db: &DatabaseProcessor,
        external_id: &str,
        direction: Direction,
        amount: &str,
        balance: &str,
    ) -> PaymentTransaction {
        let user = Uuid::new_v4();
        sqlx::query("INSERT INTO profiles (id, balance) VALUES ($1, $2)")
            .bind(user)
            .bind(dec(balance))
            .execute(&db.pool)
            .await
            .unwrap();
        db.process(RegisterTransaction {
            insert: NewPaymentTransaction {
                external_id: external_id.to_owned(),
                correlation_id: format!("corr-{external_id}"),
                direction,
                amount: dec(amount),
                amount_display: dec(amount),
                user_id: user,
                person_name: None,
                person_cpf: None,
                gateway_payload: None,
            },
        })
        .await
        .unwrap()
        .unwrap()
    }

    async fn balance_of(db: &DatabaseProcessor, user: Uuid) -> Decimal {
        sqlx::query_scalar("SELECT balance FROM profiles WHERE id = $1")
            .bind(user)
            .fetch_one(&db.pool)
            .await
            .unwrap()
    }

    async fn deposit_records_for(db: &DatabaseProcessor, external_id: &str) -> i64 {
        sqlx::query_scalar("SELECT count(*) FROM deposit_records WHERE external_id = $1")
            .bind(external_id)
            .fetch_one(&db.pool)
            .await
            .unwrap()
    }

    async fn status_of(db: &DatabaseProcessor, external_id: &str) -> PaymentTransaction {
        db.process(GetTransactionByExternalId {
            external_id: external_id.to_owned(),
        })
        .await
        .unwrap()
        .unwrap()
    }

    fn deposit_plan(tx: &PaymentTransaction) -> TransitionPlan {
        TransitionPlan {
            transaction_id: tx.id,
            external_id: tx.external_id.clone(),
            user_id: tx.user_id,
            target: TransactionStatus::Completed,
            balance_delta: Some(tx.amount),
            deposit_record: Some(DepositRecordInsert {
                external_id: tx.external_id.clone(),
                transaction_id: tx.id,
                user_id: tx.user_id,
                amount: tx.amount,
                method: PIX_METHOD.to_owned(),
            }),
        }
    }

    fn reconciler_for(db: &DatabaseProcessor) -> Reconciler {
        let (logger, _rx) = DebugLogger::new(Arc::new(MemoryDebugLogSink::new()));
        Reconciler::new(Arc::new(PgLedgerStore::new(db.clone())), logger)
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn paid_deposit_settles_once(pool: PgPool) {
        let db = DatabaseProcessor { pool };
        let tx = seed(&db, "dep_123", Direction::Deposit, "5.85", "10.00").await;
        let reconciler = reconciler_for(&db);

        let outcome = reconciler
            .reconcile("dep_123", &GatewayStatus::new("paid"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Settled {
                status: TransactionStatus::Completed,
                balance_after: Some(dec("15.85")),
                deposit_recorded: true,
            }
        );

        let replay = reconciler
            .reconcile("dep_123", &GatewayStatus::new("paid"))
            .await
            .unwrap();
        assert_eq!(replay, ReconcileOutcome::AlreadyTerminal(TransactionStatus::Completed));

        assert_eq!(balance_of(&db, tx.user_id).await, dec("15.85"));
        assert_eq!(deposit_records_for(&db, "dep_123").await, 1);
        let stored = status_of(&db, "dep_123").await;
        assert_eq!(stored.status, TransactionStatus::Completed);
        assert!(stored.settled_at.is_some());
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn expired_deposit_fails_without_credit(pool: PgPool) {
        let db = DatabaseProcessor { pool };
        let tx = seed(&db, "dep_123", Direction::Deposit, "5.85", "10.00").await;

        let outcome = reconciler_for(&db)
            .reconcile("dep_123", &GatewayStatus::new("expired"))
            .await
            .unwrap();
        assert_eq!(outcome.status(), TransactionStatus::Failed);

        assert_eq!(balance_of(&db, tx.user_id).await, dec("10.00"));
        assert_eq!(deposit_records_for(&db, "dep_123").await, 0);
        assert_eq!(status_of(&db, "dep_123").await.status, TransactionStatus::Failed);
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn concurrent_commits_credit_once(pool: PgPool) {
        let db = DatabaseProcessor { pool };
        let tx = seed(&db, "dep_123", Direction::Deposit, "5.85", "0.00").await;
        let store = Arc::new(PgLedgerStore::new(db.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let plan = deposit_plan(&tx);
                tokio::spawn(async move { store.commit_transition(plan).await })
            })
            .collect();

        let mut applied = 0;
        let mut terminal = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                CommitOutcome::Applied { .. } => applied += 1,
                CommitOutcome::AlreadyTerminal(TransactionStatus::Completed) => terminal += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(terminal, 7);
        assert_eq!(balance_of(&db, tx.user_id).await, dec("5.85"));
        assert_eq!(deposit_records_for(&db, "dep_123").await, 1);
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn existing_deposit_record_suppresses_credit(pool: PgPool) {
        let db = DatabaseProcessor { pool };
        let tx = seed(&db, "dep_123", Direction::Deposit, "5.85", "10.00").await;
        let plan = deposit_plan(&tx);

        let mut conn = db.pool.begin().await.unwrap();
        let inserted = DepositRecord::insert_if_absent_tx(
            &mut conn,
            plan.deposit_record.as_ref().unwrap(),
        )
        .await
        .unwrap();
        assert!(inserted);
        conn.commit().await.unwrap();

        let outcome = PgLedgerStore::new(db.clone())
            .commit_transition(plan)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CommitOutcome::Applied {
                balance_before: None,
                balance_after: None,
                deposit_recorded: false,
            }
        );
        assert_eq!(balance_of(&db, tx.user_id).await, dec("10.00"));
        assert_eq!(deposit_records_for(&db, "dep_123").await, 1);
        assert_eq!(status_of(&db, "dep_123").await.status, TransactionStatus::Completed);
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn overdraft_rolls_back_everything(pool: PgPool) {
        let db = DatabaseProcessor { pool };
        let tx = seed(&db, "wd_1", Direction::Withdrawal, "50.00", "1.00").await;
        let plan = TransitionPlan {
            transaction_id: tx.id,
            external_id: tx.external_id.clone(),
            user_id: tx.user_id,
            target: TransactionStatus::Completed,
            balance_delta: Some(-tx.amount),
            deposit_record: None,
        };

        let err = PgLedgerStore::new(db.clone())
            .commit_transition(plan)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InsufficientBalance { .. }));
        assert_eq!(balance_of(&db, tx.user_id).await, dec("1.00"));
        let stored = status_of(&db, "wd_1").await;
        assert_eq!(stored.status, TransactionStatus::Pending);
        assert!(stored.settled_at.is_none());
    }
}
