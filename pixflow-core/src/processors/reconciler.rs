//! The settlement state machine.
//!
//! A transaction starts `pending` and moves exactly once, to `completed` or
//! `failed`. Completing a deposit credits the owner and writes a deposit
//! record; completing a withdrawal debits the owner. Replaying an event for
//! a settled transaction is a successful no-op.

use crate::debug_log::DebugLogger;
use crate::entities::deposit_record::{DepositRecordInsert, PIX_METHOD};
use crate::entities::payment_transaction::PaymentTransaction;
use crate::entities::{Direction, TransactionStatus};
use crate::events::DebugLogEntry;
use crate::gateway::{GatewayError, GatewayStatus, StatusPoller};
use crate::store::{CommitOutcome, LedgerStore, StoreError, TransitionPlan};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// How a gateway status string maps onto the local state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMapping {
    Complete,
    Fail,
    /// Known, non-terminal. The transaction stays pending.
    InFlight,
    /// Not in any table. Left pending for an operator to look at.
    Unrecognized,
}

const COMPLETE_STATUSES: &[&str] = &[
    "paid",
    "completed",
    "complete",
    "approved",
    "realizado",
    "pago",
    "concluido",
    "concluído",
];

const FAIL_STATUSES: &[&str] = &[
    "failed",
    "failure",
    "error",
    "cancelled",
    "canceled",
    "expired",
    "rejected",
    "denied",
    "cancelado",
    "expirado",
    "falha",
    "erro",
    "rejeitado",
];

const IN_FLIGHT_STATUSES: &[&str] = &[
    "pending",
    "processing",
    "created",
    "waiting",
    "pendente",
    "em processamento",
    "aguardando",
];

/// Classify a gateway status string. Case and surrounding whitespace are
/// ignored.
pub fn map_gateway_status(status: &str) -> StatusMapping {
    let status = status.trim().to_lowercase();
    let status = status.as_str();
    if COMPLETE_STATUSES.contains(&status) {
        StatusMapping::Complete
    } else if FAIL_STATUSES.contains(&status) {
        StatusMapping::Fail
    } else if IN_FLIGHT_STATUSES.contains(&status) {
        StatusMapping::InFlight
    } else {
        StatusMapping::Unrecognized
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// This call moved the transaction to a terminal state.
    Settled {
        status: TransactionStatus,
        balance_after: Option<Decimal>,
        deposit_recorded: bool,
    },
    /// The transaction was already settled. Nothing changed.
    AlreadyTerminal(TransactionStatus),
    /// The gateway status does not settle the transaction.
    LeftPending {
        reported_status: String,
        recognized: bool,
    },
}

impl ReconcileOutcome {
    /// Short tag for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Settled { .. } => "settled",
            ReconcileOutcome::AlreadyTerminal(_) => "already_terminal",
            ReconcileOutcome::LeftPending {
                recognized: true, ..
            } => "in_flight",
            ReconcileOutcome::LeftPending {
                recognized: false,
                ..
            } => "unrecognized_status",
        }
    }

    /// Status of the transaction after this call.
    pub fn status(&self) -> TransactionStatus {
        match self {
            ReconcileOutcome::Settled { status, .. } => *status,
            ReconcileOutcome::AlreadyTerminal(status) => *status,
            ReconcileOutcome::LeftPending { .. } => TransactionStatus::Pending,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("insufficient balance for user {user_id}: has {balance}, needs {required}")]
    InsufficientBalance {
        user_id: Uuid,
        balance: Decimal,
        required: Decimal,
    },

    #[error("ledger store error: {0}")]
    Store(#[from] StoreError),
}

impl ReconcileError {
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::TransactionNotFound(_) => "transaction_not_found",
            ReconcileError::InsufficientBalance { .. } => "insufficient_balance",
            ReconcileError::Store(_) => "store_failure",
        }
    }
}

#[derive(Debug, Error)]
pub enum ReprocessError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// The single entry point that settles transactions and moves balances.
pub struct Reconciler {
    store: Arc<dyn LedgerStore>,
    debug_log: DebugLogger,
}

impl Reconciler {
    pub fn new(store: Arc<dyn LedgerStore>, debug_log: DebugLogger) -> Self {
        Self { store, debug_log }
    }

    /// Apply a gateway-reported status to the transaction `external_id`.
    ///
    /// Every error is written to the debug log before it is returned.
    #[tracing::instrument(skip(self, reported), fields(status = %reported.status))]
    pub async fn reconcile(
        &self,
        external_id: &str,
        reported: &GatewayStatus,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let result = self.reconcile_inner(external_id, reported).await;
        if let Err(e) = &result {
            warn!(error = %e, "Reconciliation failed");
            self.log(
                external_id,
                "reconcile_failed",
                json!({
                    "kind": e.kind(),
                    "error": e.to_string(),
                    "reported_status": reported.status,
                }),
            );
        }
        result
    }

    async fn reconcile_inner(
        &self,
        external_id: &str,
        reported: &GatewayStatus,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let transaction = self
            .store
            .find_transaction(external_id)
            .await?
            .ok_or_else(|| ReconcileError::TransactionNotFound(external_id.to_owned()))?;

        if transaction.status.is_terminal() {
            return Ok(self.replayed(external_id, transaction.status, reported));
        }

        let target = match map_gateway_status(&reported.status) {
            StatusMapping::Complete => TransactionStatus::Completed,
            StatusMapping::Fail => TransactionStatus::Failed,
            StatusMapping::InFlight => {
                self.log(
                    external_id,
                    "status_in_flight",
                    json!({ "reported_status": reported.status }),
                );
                return Ok(ReconcileOutcome::LeftPending {
                    reported_status: reported.status.clone(),
                    recognized: true,
                });
            }
            StatusMapping::Unrecognized => {
                warn!("Unrecognized gateway status, leaving transaction pending");
                self.log(
                    external_id,
                    "unrecognized_status",
                    json!({
                        "reported_status": reported.status,
                        "payload": reported.raw,
                    }),
                );
                return Ok(ReconcileOutcome::LeftPending {
                    reported_status: reported.status.clone(),
                    recognized: false,
                });
            }
        };

        if let Some(observed) = reported.value.filter(|v| *v != transaction.amount) {
            warn!(%observed, stored = %transaction.amount, "Gateway amount differs from stored amount");
            self.log(
                external_id,
                "amount_mismatch",
                json!({ "observed": observed, "stored": transaction.amount }),
            );
        }

        let plan = plan_transition(&transaction, target);
        match self.store.commit_transition(plan).await {
            Ok(CommitOutcome::Applied {
                balance_before,
                balance_after,
                deposit_recorded,
            }) => {
                info!(
                    status = %target,
                    direction = transaction.direction.as_str(),
                    amount = %transaction.amount,
                    ?balance_after,
                    "Transaction settled"
                );
                self.log(
                    external_id,
                    "transaction_settled",
                    json!({
                        "status": target.as_str(),
                        "direction": transaction.direction.as_str(),
                        "amount": transaction.amount,
                        "balance_before": balance_before,
                        "balance_after": balance_after,
                        "deposit_recorded": deposit_recorded,
                        "reported_status": reported.status,
                    }),
                );
                Ok(ReconcileOutcome::Settled {
                    status: target,
                    balance_after,
                    deposit_recorded,
                })
            }
            Ok(CommitOutcome::AlreadyTerminal(status)) => {
                Ok(self.replayed(external_id, status, reported))
            }
            Err(StoreError::InsufficientBalance {
                user_id,
                balance,
                required,
            }) => Err(ReconcileError::InsufficientBalance {
                user_id,
                balance,
                required,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Manual fallback: ask the gateway for the current status, then
    /// reconcile with it.
    pub async fn reprocess(
        &self,
        external_id: &str,
        poller: &StatusPoller,
    ) -> Result<ReconcileOutcome, ReprocessError> {
        let status = poller.get_status(external_id).await?;
        Ok(self.reconcile(external_id, &status).await?)
    }

    fn replayed(
        &self,
        external_id: &str,
        status: TransactionStatus,
        reported: &GatewayStatus,
    ) -> ReconcileOutcome {
        info!(%status, "Transaction already settled, ignoring replay");
        self.log(
            external_id,
            "reconcile_replayed",
            json!({ "status": status.as_str(), "reported_status": reported.status }),
        );
        ReconcileOutcome::AlreadyTerminal(status)
    }

    fn log(&self, external_id: &str, category: &str, payload: serde_json::Value) {
        self.debug_log
            .log(DebugLogEntry::new(category, payload).for_transaction(external_id));
    }
}

fn plan_transition(transaction: &PaymentTransaction, target: TransactionStatus) -> TransitionPlan {
    let (balance_delta, deposit_record) = match (target, transaction.direction) {
        (TransactionStatus::Completed, Direction::Deposit) => (
            Some(transaction.amount),
            Some(DepositRecordInsert {
                external_id: transaction.external_id.clone(),
                transaction_id: transaction.id,
                user_id: transaction.user_id,
                amount: transaction.amount,
                method: PIX_METHOD.to_owned(),
            }),
        ),
        (TransactionStatus::Completed, Direction::Withdrawal) => (Some(-transaction.amount), None),
        _ => (None, None),
    };
    TransitionPlan {
        transaction_id: transaction.id,
        external_id: transaction.external_id.clone(),
        user_id: transaction.user_id,
        target,
        balance_delta,
        deposit_record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_log::MemoryDebugLogSink;
    use crate::events::DebugLogReceiver;
    use crate::gateway::{AccessToken, PaymentGateway};
    use crate::store::MemoryLedgerStore;
    use async_trait::async_trait;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    struct Fixture {
        store: Arc<MemoryLedgerStore>,
        reconciler: Arc<Reconciler>,
        logger: DebugLogger,
        rx: DebugLogReceiver,
        user: Uuid,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = Arc::new(MemoryLedgerStore::new());
            let (logger, rx) = DebugLogger::new(Arc::new(MemoryDebugLogSink::new()));
            let user = Uuid::new_v4();
            store.set_balance(user, dec("100.00")).await;
            Self {
                reconciler: Arc::new(Reconciler::new(store.clone(), logger.clone())),
                store,
                logger,
                rx,
                user,
            }
        }

        fn categories(&mut self) -> Vec<String> {
            let mut out = Vec::new();
            while let Ok(entry) = self.rx.try_recv() {
                out.push(entry.category);
            }
            out
        }
    }

    #[test]
    fn status_mapping_table() {
        for s in ["paid", "PAID", " completed ", "Realizado", "pago", "concluído"] {
            assert_eq!(map_gateway_status(s), StatusMapping::Complete, "{s}");
        }
        for s in ["failed", "expired", "Cancelado", "CANCELED", "rejected", "erro"] {
            assert_eq!(map_gateway_status(s), StatusMapping::Fail, "{s}");
        }
        for s in ["pending", "Em processamento", "aguardando"] {
            assert_eq!(map_gateway_status(s), StatusMapping::InFlight, "{s}");
        }
        for s in ["", "refunded", "chargeback", "???"] {
            assert_eq!(map_gateway_status(s), StatusMapping::Unrecognized, "{s}");
        }
    }

    #[tokio::test]
    async fn paid_deposit_credits_once() {
        let mut fx = Fixture::new().await;
        fx.store
            .insert_pending("dep_123", Direction::Deposit, dec("5.85"), fx.user)
            .await;

        let outcome = fx
            .reconciler
            .reconcile("dep_123", &GatewayStatus::new("paid"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Settled {
                status: TransactionStatus::Completed,
                balance_after: Some(dec("105.85")),
                deposit_recorded: true,
            }
        );
        assert_eq!(fx.store.balance(fx.user).await, Some(dec("105.85")));
        let records = fx.store.deposit_records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_id, "dep_123");
        assert_eq!(records[0].amount, dec("5.85"));

        // Replay of the same webhook.
        let replay = fx
            .reconciler
            .reconcile("dep_123", &GatewayStatus::new("paid"))
            .await
            .unwrap();
        assert_eq!(replay, ReconcileOutcome::AlreadyTerminal(TransactionStatus::Completed));
        assert_eq!(fx.store.balance(fx.user).await, Some(dec("105.85")));
        assert_eq!(fx.store.deposit_records().await.len(), 1);

        assert_eq!(
            fx.categories(),
            vec!["transaction_settled", "reconcile_replayed"]
        );
    }

    #[tokio::test]
    async fn unknown_transaction_is_reported() {
        let mut fx = Fixture::new().await;
        let err = fx
            .reconciler
            .reconcile("dep_999", &GatewayStatus::new("paid"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::TransactionNotFound(ref id) if id == "dep_999"));
        assert_eq!(fx.store.balance(fx.user).await, Some(dec("100.00")));
        assert!(fx.store.deposit_records().await.is_empty());
        assert_eq!(fx.categories(), vec!["reconcile_failed"]);
    }

    #[tokio::test]
    async fn expired_deposit_fails_without_credit() {
        let fx = Fixture::new().await;
        fx.store
            .insert_pending("dep_123", Direction::Deposit, dec("5.85"), fx.user)
            .await;

        let outcome = fx
            .reconciler
            .reconcile("dep_123", &GatewayStatus::new("expired"))
            .await
            .unwrap();
        assert_eq!(outcome.status(), TransactionStatus::Failed);
        assert_eq!(
            fx.store.transaction("dep_123").await.unwrap().status,
            TransactionStatus::Failed
        );
        assert_eq!(fx.store.balance(fx.user).await, Some(dec("100.00")));
        assert!(fx.store.deposit_records().await.is_empty());

        // A late "paid" cannot reverse a failure.
        let late = fx
            .reconciler
            .reconcile("dep_123", &GatewayStatus::new("paid"))
            .await
            .unwrap();
        assert_eq!(late, ReconcileOutcome::AlreadyTerminal(TransactionStatus::Failed));
        assert_eq!(fx.store.balance(fx.user).await, Some(dec("100.00")));
    }

    #[tokio::test]
    async fn unknown_status_leaves_pending_and_is_logged() {
        let mut fx = Fixture::new().await;
        fx.store
            .insert_pending("dep_123", Direction::Deposit, dec("5.85"), fx.user)
            .await;

        let outcome = fx
            .reconciler
            .reconcile("dep_123", &GatewayStatus::new("chargeback"))
            .await
            .unwrap();
        assert_eq!(outcome.as_str(), "unrecognized_status");
        assert_eq!(
            fx.store.transaction("dep_123").await.unwrap().status,
            TransactionStatus::Pending
        );

        let in_flight = fx
            .reconciler
            .reconcile("dep_123", &GatewayStatus::new("processing"))
            .await
            .unwrap();
        assert_eq!(in_flight.as_str(), "in_flight");
        assert_eq!(
            fx.categories(),
            vec!["unrecognized_status", "status_in_flight"]
        );
    }

    #[tokio::test]
    async fn balance_arithmetic_is_exact() {
        let fx = Fixture::new().await;
        fx.store.set_balance(fx.user, dec("0.10")).await;
        for (i, amount) in ["0.20", "0.10", "1234567.89"].into_iter().enumerate() {
            let id = format!("dep_{i}");
            fx.store
                .insert_pending(&id, Direction::Deposit, dec(amount), fx.user)
                .await;
            fx.reconciler
                .reconcile(&id, &GatewayStatus::new("paid"))
                .await
                .unwrap();
        }
        assert_eq!(fx.store.balance(fx.user).await, Some(dec("1234568.29")));
    }

    #[tokio::test]
    async fn amount_mismatch_uses_stored_amount() {
        let mut fx = Fixture::new().await;
        fx.store
            .insert_pending("dep_123", Direction::Deposit, dec("5.85"), fx.user)
            .await;

        fx.reconciler
            .reconcile(
                "dep_123",
                &GatewayStatus::new("paid").with_value(Some(dec("50.00"))),
            )
            .await
            .unwrap();
        assert_eq!(fx.store.balance(fx.user).await, Some(dec("105.85")));
        assert_eq!(
            fx.categories(),
            vec!["amount_mismatch", "transaction_settled"]
        );
    }

    #[tokio::test]
    async fn completed_withdrawal_debits() {
        let fx = Fixture::new().await;
        fx.store
            .insert_pending("wd_1", Direction::Withdrawal, dec("40.00"), fx.user)
            .await;

        let outcome = fx
            .reconciler
            .reconcile("wd_1", &GatewayStatus::new("completed"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Settled {
                status: TransactionStatus::Completed,
                balance_after: Some(dec("60.00")),
                deposit_recorded: false,
            }
        );
        assert!(fx.store.deposit_records().await.is_empty());
    }

    #[tokio::test]
    async fn overdrawing_withdrawal_stays_pending() {
        let mut fx = Fixture::new().await;
        fx.store
            .insert_pending("wd_1", Direction::Withdrawal, dec("150.00"), fx.user)
            .await;

        let err = fx
            .reconciler
            .reconcile("wd_1", &GatewayStatus::new("completed"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InsufficientBalance { .. }));
        assert_eq!(fx.store.balance(fx.user).await, Some(dec("100.00")));
        assert_eq!(
            fx.store.transaction("wd_1").await.unwrap().status,
            TransactionStatus::Pending
        );
        assert_eq!(fx.categories(), vec!["reconcile_failed"]);
    }

    #[tokio::test]
    async fn commit_after_stale_read_is_a_noop() {
        let fx = Fixture::new().await;
        fx.store
            .insert_pending("dep_123", Direction::Deposit, dec("5.85"), fx.user)
            .await;

        // Both racers read the row while it is still pending.
        let first = fx.store.find_transaction("dep_123").await.unwrap().unwrap();
        let second = fx.store.find_transaction("dep_123").await.unwrap().unwrap();

        let a = fx
            .store
            .commit_transition(plan_transition(&first, TransactionStatus::Completed))
            .await
            .unwrap();
        let b = fx
            .store
            .commit_transition(plan_transition(&second, TransactionStatus::Completed))
            .await
            .unwrap();

        assert!(matches!(a, CommitOutcome::Applied { .. }));
        assert_eq!(b, CommitOutcome::AlreadyTerminal(TransactionStatus::Completed));
        assert_eq!(fx.store.balance(fx.user).await, Some(dec("105.85")));
        assert_eq!(fx.store.deposit_records().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reconciles_credit_once() {
        let fx = Fixture::new().await;
        fx.store
            .insert_pending("dep_123", Direction::Deposit, dec("5.85"), fx.user)
            .await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let reconciler = fx.reconciler.clone();
                tokio::spawn(async move {
                    reconciler
                        .reconcile("dep_123", &GatewayStatus::new("paid"))
                        .await
                })
            })
            .collect();

        let mut settled = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                ReconcileOutcome::Settled { .. } => settled += 1,
                ReconcileOutcome::AlreadyTerminal(TransactionStatus::Completed) => {}
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(settled, 1);
        assert_eq!(fx.store.balance(fx.user).await, Some(dec("105.85")));
        assert_eq!(fx.store.deposit_records().await.len(), 1);
    }

    struct RejectingGateway;

    #[async_trait]
    impl PaymentGateway for RejectingGateway {
        async fn authenticate(&self) -> Result<AccessToken, GatewayError> {
            Err(GatewayError::Authentication {
                status: 401,
                body: r#"{"message":"invalid credentials"}"#.into(),
            })
        }

        async fn transaction_status(
            &self,
            _token: &AccessToken,
            _transaction_id: &str,
        ) -> Result<GatewayStatus, GatewayError> {
            unreachable!("status lookup without a token")
        }
    }

    #[tokio::test]
    async fn reprocess_with_failed_authentication_changes_nothing() {
        let mut fx = Fixture::new().await;
        fx.store
            .insert_pending("dep_123", Direction::Deposit, dec("5.85"), fx.user)
            .await;
        let poller = StatusPoller::new(Arc::new(RejectingGateway), fx.logger.clone());

        let err = fx.reconciler.reprocess("dep_123", &poller).await.unwrap_err();
        assert!(matches!(
            err,
            ReprocessError::Gateway(GatewayError::Authentication { .. })
        ));
        assert_eq!(
            fx.store.transaction("dep_123").await.unwrap().status,
            TransactionStatus::Pending
        );
        assert_eq!(fx.store.balance(fx.user).await, Some(dec("100.00")));
        assert_eq!(fx.categories(), vec!["status_poll_failed"]);
    }
}
