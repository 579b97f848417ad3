//! Cluster-wide mutual exclusion via PostgreSQL advisory locks.

use sqlx::{PgPool, Postgres, Transaction};

/// Advisory lock key for the hourly recurrence scan.
pub const RECURRENCE_SCAN_LOCK: i64 = 0x6a72_0001;

/// Advisory lock key for the directory sync pass.
pub const ASSIGNMENT_SYNC_LOCK: i64 = 0x6a72_0002;

pub struct RunLockRepo;

impl RunLockRepo {
    /// Try to take the transaction-scoped advisory lock `key`.
    ///
    /// On success the returned transaction holds the lock until it is
    /// committed, rolled back or dropped. Returns `None` when another
    /// session already holds it.
    pub async fn try_lock(
        pool: &PgPool,
        key: i64,
    ) -> Result<Option<Transaction<'static, Postgres>>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
            .bind(key)
            .fetch_one(&mut *tx)
            .await?;
        if acquired {
            Ok(Some(tx))
        } else {
            tx.rollback().await?;
            Ok(None)
        }
    }
}
