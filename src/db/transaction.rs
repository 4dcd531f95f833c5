//! Serialized write units.
//!
//! Every mutating operation takes the process-wide [`WriteGate`] before it
//! opens its transaction, so "read the highest order number, then insert"
//! never interleaves between two requests in the same process.

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct WriteGate {
    lock: Arc<Mutex<()>>,
}

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the gate, then opens a transaction on `db`.
    pub async fn begin(&self, db: &DatabaseConnection) -> Result<WriteUnit, DbErr> {
        let guard = self.lock.clone().lock_owned().await;
        let txn = db.begin().await?;
        debug!("Write unit opened");
        Ok(WriteUnit { txn, _guard: guard })
    }
}

/// An open transaction holding the write gate.
///
/// Dropping it without [`WriteUnit::commit`] rolls the transaction back and
/// releases the gate.
pub struct WriteUnit {
    // declared first so it is dropped (rolled back) before the gate opens
    txn: DatabaseTransaction,
    _guard: OwnedMutexGuard<()>,
}

impl WriteUnit {
    pub fn txn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    pub async fn commit(self) -> Result<(), DbErr> {
        let WriteUnit { txn, _guard } = self;
        txn.commit().await?;
        debug!("Write unit committed");
        Ok(())
    }
}
