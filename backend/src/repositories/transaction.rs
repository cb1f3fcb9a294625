//! Transaction helpers for the PostgreSQL store.

use sqlx::postgres::PgTransaction;
use sqlx::PgPool;

use crate::repositories::store::StoreError;

/// Begin a new database transaction.
///
/// Dropping the handle without [`commit_transaction`] rolls everything back.
pub async fn begin_transaction(db: &PgPool) -> Result<PgTransaction<'_>, StoreError> {
    db.begin().await.map_err(StoreError::from)
}

pub async fn commit_transaction(tx: PgTransaction<'_>) -> Result<(), StoreError> {
    tx.commit().await.map_err(StoreError::from)
}

pub async fn rollback_transaction(tx: PgTransaction<'_>) -> Result<(), StoreError> {
    tx.rollback().await.map_err(StoreError::from)
}
