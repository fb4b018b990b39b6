use crate::db::error::DbError;
use crate::db::repo::ledger::LedgerRepo;
use crate::db::{Db, DbResult, column_u32};
use crate::models::types::{AccountId, ItemEntry};
use std::collections::HashMap;
use std::sync::Arc;

pub struct LedgerRepository {
    db: Arc<Db>,
}

impl LedgerRepository {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl LedgerRepo for LedgerRepository {
    async fn load_account(&self, account_id: AccountId) -> DbResult<HashMap<ItemEntry, u32>> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("SELECT item_entry, count FROM abyssal_storage WHERE account_id = $1")
            .await?;
        let rows = client.query(&stmt, &[&i64::from(account_id.get())]).await?;

        let ctx = format!("LedgerRepo::load_account account_id={account_id}");
        let mut items = HashMap::with_capacity(rows.len());
        for row in &rows {
            let entry = column_u32(row, 0, &ctx)?;
            let count = column_u32(row, 1, &ctx)?;
            if count > 0 {
                items.insert(ItemEntry(entry), count);
            }
        }

        Ok(items)
    }

    async fn add_count(&self, account_id: AccountId, entry: ItemEntry, delta: u32) -> DbResult<()> {
        if delta == 0 {
            return Err(DbError::Validation("additive upsert with zero delta".into()));
        }
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached(
                r#"
                INSERT INTO abyssal_storage (account_id, item_entry, count)
                VALUES ($1, $2, $3)
                ON CONFLICT (account_id, item_entry)
                DO UPDATE SET count = abyssal_storage.count + EXCLUDED.count
                WHERE abyssal_storage.count + EXCLUDED.count <= $4
                "#,
            )
            .await?;
        let affected = client
            .execute(
                &stmt,
                &[
                    &i64::from(account_id.get()),
                    &i64::from(entry.get()),
                    &i64::from(delta),
                    &i64::from(u32::MAX),
                ],
            )
            .await?;

        // The conflict branch skips the update instead of overflowing the count
        if affected == 0 {
            return Err(DbError::Validation(format!(
                "count of {entry} for account {account_id} would exceed u32"
            )));
        }
        Ok(())
    }

    async fn set_count(&self, account_id: AccountId, entry: ItemEntry, count: u32) -> DbResult<()> {
        if count == 0 {
            return Err(DbError::Validation("zero count rows are deleted, not stored".into()));
        }
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("UPDATE abyssal_storage SET count = $3 WHERE account_id = $1 AND item_entry = $2")
            .await?;
        client
            .execute(
                &stmt,
                &[&i64::from(account_id.get()), &i64::from(entry.get()), &i64::from(count)],
            )
            .await?;

        Ok(())
    }

    async fn delete_row(&self, account_id: AccountId, entry: ItemEntry) -> DbResult<()> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("DELETE FROM abyssal_storage WHERE account_id = $1 AND item_entry = $2")
            .await?;
        client
            .execute(&stmt, &[&i64::from(account_id.get()), &i64::from(entry.get())])
            .await?;

        Ok(())
    }

    async fn list_accounts(&self) -> DbResult<Vec<AccountId>> {
        let client = self.db.get_client().await?;

        let rows = client
            .query(
                "SELECT DISTINCT account_id FROM abyssal_storage ORDER BY account_id",
                &[],
            )
            .await?;

        rows.iter()
            .map(|row| column_u32(row, 0, "LedgerRepo::list_accounts").map(AccountId))
            .collect()
    }
}
