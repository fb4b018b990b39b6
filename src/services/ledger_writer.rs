use crate::db::DbResult;
use crate::db::repo::LedgerRepo;
use crate::error::InfraError;
use crate::models::types::{AccountId, ItemEntry};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};

/// Work for the ledger writer. Jobs are applied strictly in the order they were issued.
#[derive(Debug)]
pub enum LedgerJob {
    Add {
        account_id: AccountId,
        entry: ItemEntry,
        delta: u32,
    },
    Set {
        account_id: AccountId,
        entry: ItemEntry,
        count: u32,
    },
    Delete {
        account_id: AccountId,
        entry: ItemEntry,
    },
    Load {
        account_id: AccountId,
        reply: oneshot::Sender<DbResult<HashMap<ItemEntry, u32>>>,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
}

/// Cheap, cloneable handle used by the vault cache to issue writes.
#[derive(Clone)]
pub struct LedgerHandle {
    tx: mpsc::UnboundedSender<LedgerJob>,
    failed_writes: Arc<AtomicU64>,
}

/// Start the writer task on the current tokio runtime. It runs until every handle is dropped.
pub fn start_ledger_writer(repo: Arc<dyn LedgerRepo>) -> LedgerHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<LedgerJob>();
    let failed_writes = Arc::new(AtomicU64::new(0));
    let failed = failed_writes.clone();

    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            match job {
                LedgerJob::Add { account_id, entry, delta } => {
                    if let Err(e) = repo.add_count(account_id, entry, delta).await {
                        failed.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(error = %e, account = %account_id, entry = %entry, delta, "ledger deposit write failed");
                    }
                }
                LedgerJob::Set { account_id, entry, count } => {
                    if let Err(e) = repo.set_count(account_id, entry, count).await {
                        failed.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(error = %e, account = %account_id, entry = %entry, count, "ledger update write failed");
                    }
                }
                LedgerJob::Delete { account_id, entry } => {
                    if let Err(e) = repo.delete_row(account_id, entry).await {
                        failed.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(error = %e, account = %account_id, entry = %entry, "ledger delete write failed");
                    }
                }
                LedgerJob::Load { account_id, reply } => {
                    let _ = reply.send(repo.load_account(account_id).await);
                }
                LedgerJob::Flush { reply } => {
                    let _ = reply.send(());
                }
            }
        }
        tracing::debug!("ledger writer stopped");
    });

    LedgerHandle { tx, failed_writes }
}

impl LedgerHandle {
    /// Queue a write. Never blocks; issuance order is apply order.
    pub fn issue(&self, job: LedgerJob) {
        if let Err(e) = self.tx.send(job) {
            self.failed_writes.fetch_add(1, Ordering::Relaxed);
            tracing::error!(job = ?e.0, "ledger writer is gone, write dropped");
        }
    }

    /// Read an account's rows after every previously issued write has been applied.
    pub async fn load(&self, account_id: AccountId) -> Result<HashMap<ItemEntry, u32>, InfraError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LedgerJob::Load { account_id, reply })
            .map_err(|_| InfraError::WriterClosed)?;
        let items = rx.await.map_err(|_| InfraError::WriterClosed)??;
        Ok(items)
    }

    /// Resolves once every write issued before this call has been applied (or has failed).
    pub async fn flush(&self) -> Result<(), InfraError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LedgerJob::Flush { reply })
            .map_err(|_| InfraError::WriterClosed)?;
        rx.await.map_err(|_| InfraError::WriterClosed)
    }

    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }
}
