use sqlx::PgPool;

/// Query runner for the `Processor` impls in [`crate::entities`].
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

/// A Postgres transaction handle, as used by the `*_tx` entity helpers.
pub type PgTransaction<'a> = sqlx::Transaction<'a, sqlx::Postgres>;
