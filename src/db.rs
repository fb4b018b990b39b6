use crate::db::error::DbError;
use deadpool_postgres::Pool;

// keep public API surface by re-exporting submodules
mod migrations;
mod pool;

pub mod error;
pub mod repo;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Clone, Debug)]
pub struct Db {
    pub(crate) pool: Pool,
}

impl Db {
    pub async fn get_client(&self) -> DbResult<deadpool_postgres::Client> {
        Ok(self.pool.get().await?)
    }
}

/// Ledger columns are BIGINT, the game speaks u32.
pub(crate) fn column_u32(row: &tokio_postgres::Row, idx: usize, ctx: &str) -> DbResult<u32> {
    let raw: i64 = row.try_get(idx)?;
    u32::try_from(raw).map_err(|_| {
        tracing::error!(column = idx, value = raw, context = %ctx, "row value out of range");
        DbError::Decode(format!("{ctx}: column {idx} value {raw} out of range"))
    })
}
