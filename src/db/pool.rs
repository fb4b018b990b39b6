use super::{Db, DbResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::str::FromStr;
use tokio_postgres::NoTls;

/// All ledger traffic of a process goes through the single ledger writer, which holds one
/// connection at a time. The second one serves migrations and the admin CLI.
const POOL_SIZE: usize = 2;
const APPLICATION_NAME: &str = "abyssal-vault";

impl Db {
    /// Build the pool. No connection is opened until the first `get_client`.
    pub fn new(url: &str) -> DbResult<Self> {
        let mut cfg = tokio_postgres::Config::from_str(url)?;
        if cfg.get_application_name().is_none() {
            cfg.application_name(APPLICATION_NAME);
        }

        let mgr = Manager::from_config(
            cfg,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(mgr).max_size(POOL_SIZE).runtime(Runtime::Tokio1).build()?;
        tracing::debug!(max_size = POOL_SIZE, "ledger pool ready");

        Ok(Self { pool })
    }
}
