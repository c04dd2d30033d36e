use crate::entities::{Direction, TransactionStatus};
use crate::framework::{DatabaseProcessor, PgTransaction};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

/// One gateway payment attempt.
///
/// `external_id` is the gateway-assigned id and is unique. Rows are never
/// deleted; `status` only ever moves from `pending` to a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub external_id: String,
    pub correlation_id: String,
    pub direction: Direction,
    pub status: TransactionStatus,
    /// Settlement currency (BRL).
    pub amount: Decimal,
    /// Secondary display currency (USD), derived at registration.
    pub amount_display: Decimal,
    pub user_id: Uuid,
    pub person_name: Option<String>,
    pub person_cpf: Option<String>,
    pub gateway_payload: Option<serde_json::Value>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub settled_at: Option<OffsetDateTime>,
}

/// Data for registering a new pending transaction.
#[derive(Debug, Clone)]
pub struct NewPaymentTransaction {
    pub external_id: String,
    pub correlation_id: String,
    pub direction: Direction,
    pub amount: Decimal,
    pub amount_display: Decimal,
    pub user_id: Uuid,
    pub person_name: Option<String>,
    pub person_cpf: Option<String>,
    pub gateway_payload: Option<serde_json::Value>,
}

const SELECT_COLUMNS: &str = r#"
    id, external_id, correlation_id, direction, status, amount, amount_display,
    user_id, person_name, person_cpf, gateway_payload, created_at, updated_at, settled_at
"#;

#[derive(Debug, Clone)]
/// Insert a pending transaction.
///
/// Returns `None` when a transaction with the same external id already exists.
pub struct RegisterTransaction {
    pub insert: NewPaymentTransaction,
}

impl Processor<RegisterTransaction> for DatabaseProcessor {
    type Output = Option<PaymentTransaction>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:RegisterTransaction")]
    async fn process(
        &self,
        query: RegisterTransaction,
    ) -> Result<Option<PaymentTransaction>, sqlx::Error> {
        let insert = query.insert;
        let sql = format!(
            r#"
            INSERT INTO payment_transactions
                (external_id, correlation_id, direction, status, amount, amount_display,
                 user_id, person_name, person_cpf, gateway_payload)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $9)
            ON CONFLICT (external_id) DO NOTHING
            RETURNING {SELECT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, PaymentTransaction>(&sql)
            .bind(insert.external_id)
            .bind(insert.correlation_id)
            .bind(insert.direction)
            .bind(insert.amount)
            .bind(insert.amount_display)
            .bind(insert.user_id)
            .bind(insert.person_name)
            .bind(insert.person_cpf)
            .bind(insert.gateway_payload)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetTransactionByExternalId {
    pub external_id: String,
}

impl Processor<GetTransactionByExternalId> for DatabaseProcessor {
    type Output = Option<PaymentTransaction>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetTransactionByExternalId")]
    async fn process(
        &self,
        query: GetTransactionByExternalId,
    ) -> Result<Option<PaymentTransaction>, sqlx::Error> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM payment_transactions WHERE external_id = $1"
        );
        sqlx::query_as::<_, PaymentTransaction>(&sql)
            .bind(query.external_id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// List transactions, newest first, with optional filters.
pub struct ListTransactions {
    pub limit: i64,
    pub offset: i64,
    pub status: Option<TransactionStatus>,
    pub direction: Option<Direction>,
    pub user_id: Option<Uuid>,
}

impl Processor<ListTransactions> for DatabaseProcessor {
    type Output = Vec<PaymentTransaction>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListTransactions")]
    async fn process(&self, query: ListTransactions) -> Result<Vec<PaymentTransaction>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM payment_transactions
            WHERE ($1::transaction_status IS NULL OR status = $1)
              AND ($2::payment_direction IS NULL OR direction = $2)
              AND ($3::uuid IS NULL OR user_id = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        );
        sqlx::query_as::<_, PaymentTransaction>(&sql)
            .bind(query.status)
            .bind(query.direction)
            .bind(query.user_id)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await
    }
}

impl PaymentTransaction {
    /// Load a transaction and hold its row lock until the transaction ends.
    pub async fn lock_by_external_id_tx(
        tx: &mut PgTransaction<'_>,
        external_id: &str,
    ) -> Result<Option<PaymentTransaction>, sqlx::Error> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM payment_transactions WHERE external_id = $1 FOR UPDATE"
        );
        sqlx::query_as::<_, PaymentTransaction>(&sql)
            .bind(external_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Move a pending transaction to `status`.
    ///
    /// Returns `false` if the row was no longer pending.
    pub async fn settle_tx(
        tx: &mut PgTransaction<'_>,
        id: Uuid,
        status: TransactionStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET status = $2, settled_at = now(), updated_at = now()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
