use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DebugLogRecord {
    pub id: i64,
    pub category: String,
    pub transaction_ref: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct InsertDebugLog {
    pub category: String,
    pub transaction_ref: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: OffsetDateTime,
}

impl Processor<InsertDebugLog> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertDebugLog")]
    async fn process(&self, insert: InsertDebugLog) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO debug_logs (category, transaction_ref, payload, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(insert.category)
        .bind(insert.transaction_ref)
        .bind(insert.payload)
        .bind(insert.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Diagnostic trail of one transaction, oldest first.
pub struct ListDebugLogsForTransaction {
    pub transaction_ref: String,
    pub limit: i64,
}

impl Processor<ListDebugLogsForTransaction> for DatabaseProcessor {
    type Output = Vec<DebugLogRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListDebugLogsForTransaction")]
    async fn process(
        &self,
        query: ListDebugLogsForTransaction,
    ) -> Result<Vec<DebugLogRecord>, sqlx::Error> {
        sqlx::query_as::<_, DebugLogRecord>(
            r#"
            SELECT id, category, transaction_ref, payload, created_at
            FROM debug_logs
            WHERE transaction_ref = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2
            "#,
        )
        .bind(query.transaction_ref)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
    }
}
