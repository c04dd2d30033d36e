//! The balance column of the user profile table.
//!
//! Profiles belong to the auth/profile subsystem; this service only reads
//! and writes `balance`, and only from inside a reconciliation transaction.

use crate::framework::PgTransaction;
use rust_decimal::Decimal;
use uuid::Uuid;

pub struct UserBalance;

impl UserBalance {
    /// Read a balance and lock the profile row.
    pub async fn lock_tx(
        tx: &mut PgTransaction<'_>,
        user_id: Uuid,
    ) -> Result<Option<Decimal>, sqlx::Error> {
        sqlx::query_scalar::<_, Decimal>("SELECT balance FROM profiles WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn write_tx(
        tx: &mut PgTransaction<'_>,
        user_id: Uuid,
        balance: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE profiles SET balance = $2 WHERE id = $1")
            .bind(user_id)
            .bind(balance)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
