use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod order_number;
pub mod order_repository;

pub use order_number::{OrderNumberSequence, ORDER_NUMBER_BASELINE, ORDER_NUMBER_PREFIX};
pub use order_repository::{NewOrder, OrderChanges, OrderRepository, OrderRepositoryConfig};

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
