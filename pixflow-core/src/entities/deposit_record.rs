use crate::framework::{DatabaseProcessor, PgTransaction};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

/// Append-only ledger entry for a completed deposit. At most one per
/// external id.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DepositRecord {
    pub id: i64,
    pub external_id: String,
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRecordInsert {
    pub external_id: String,
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub method: String,
}

/// Payment method recorded for DigitoPay deposits.
pub const PIX_METHOD: &str = "pix";

impl DepositRecord {
    /// Insert unless a record for the same external id exists.
    ///
    /// Returns `true` if a row was written.
    pub async fn insert_if_absent_tx(
        tx: &mut PgTransaction<'_>,
        insert: &DepositRecordInsert,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO deposit_records (external_id, transaction_id, user_id, amount, method)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (external_id) DO NOTHING
            "#,
        )
        .bind(&insert.external_id)
        .bind(insert.transaction_id)
        .bind(insert.user_id)
        .bind(insert.amount)
        .bind(&insert.method)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone)]
pub struct GetDepositRecordByExternalId {
    pub external_id: String,
}

impl Processor<GetDepositRecordByExternalId> for DatabaseProcessor {
    type Output = Option<DepositRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetDepositRecordByExternalId")]
    async fn process(
        &self,
        query: GetDepositRecordByExternalId,
    ) -> Result<Option<DepositRecord>, sqlx::Error> {
        sqlx::query_as::<_, DepositRecord>(
            r#"
            SELECT id, external_id, transaction_id, user_id, amount, method, created_at
            FROM deposit_records
            WHERE external_id = $1
            "#,
        )
        .bind(query.external_id)
        .fetch_optional(&self.pool)
        .await
    }
}
