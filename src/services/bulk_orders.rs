use chrono::Utc;
use metrics::counter;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveEnum, ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::IdSet;
use crate::entities::order::{Column, Entity as Order, OrderStatus};
use crate::errors::ServiceError;
use crate::repositories::order_repository::insert_order;
use crate::repositories::{NewOrder, OrderNumberSequence, OrderRepository, Repository};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub id: Uuid,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkStatusOutcome {
    pub updated_count: u64,
    pub orders: Vec<StatusChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicatedOrder {
    pub id: Uuid,
    pub order_number: String,
    pub original_order_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkDeleteOutcome {
    pub deleted_count: u64,
    /// The ids exactly as requested, whether or not they existed.
    pub deleted_ids: Vec<String>,
}

/// Status change, duplication and deletion over a caller-supplied id list.
///
/// Each call is one transaction under the repository's write gate, so a
/// failure part way through leaves no rows touched. Ids that do not exist
/// (or are not UUIDs) are skipped silently.
#[derive(Debug, Clone)]
pub struct BulkOrderService {
    orders: Arc<OrderRepository>,
}

impl BulkOrderService {
    pub fn new(orders: Arc<OrderRepository>) -> Self {
        Self { orders }
    }

    fn require_ids(ids: &IdSet) -> Result<(), ServiceError> {
        if ids.is_empty() {
            Err(ServiceError::ValidationError("order_ids required".into()))
        } else {
            Ok(())
        }
    }

    #[instrument(skip(self, ids), fields(requested = ids.requested().len(), status = %status))]
    pub async fn bulk_update_status(
        &self,
        ids: IdSet,
        status: OrderStatus,
    ) -> Result<BulkStatusOutcome, ServiceError> {
        Self::require_ids(&ids)?;

        let unit = self.orders.gate().begin(self.orders.get_db()).await?;
        let existing: Vec<Uuid> = Order::find()
            .select_only()
            .column(Column::Id)
            .filter(ids.condition(Column::Id))
            .into_tuple()
            .all(unit.txn())
            .await?;

        if existing.is_empty() {
            return Ok(BulkStatusOutcome {
                updated_count: 0,
                orders: Vec::new(),
            });
        }

        let result = Order::update_many()
            .col_expr(Column::Status, Expr::value(status.to_value()))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.is_in(existing.iter().copied()))
            .exec(unit.txn())
            .await?;
        unit.commit().await?;

        let orders = ids
            .ids()
            .iter()
            .filter(|id| existing.contains(*id))
            .map(|id| StatusChange { id: *id, status })
            .collect();

        counter!("order_desk.bulk.status_updated", result.rows_affected);
        info!(updated = result.rows_affected, "Bulk status update applied");

        Ok(BulkStatusOutcome {
            updated_count: result.rows_affected,
            orders,
        })
    }

    /// Copies every existing order, each with a new id and the next order
    /// number. Copies are numbered in the order the ids were requested;
    /// a repeated id is copied once, at its first position.
    #[instrument(skip(self, ids), fields(requested = ids.requested().len()))]
    pub async fn bulk_duplicate(&self, ids: IdSet) -> Result<Vec<DuplicatedOrder>, ServiceError> {
        Self::require_ids(&ids)?;
        if ids.ids().is_empty() {
            return Ok(Vec::new());
        }

        let (repo, ids) = (self.orders.as_ref(), &ids);
        let duplicated = self
            .orders
            .retry_on_number_conflict("bulk_duplicate", move || async move {
                let unit = repo.gate().begin(repo.get_db()).await?;
                let originals: HashMap<Uuid, _> = Order::find()
                    .filter(ids.condition(Column::Id))
                    .all(unit.txn())
                    .await?
                    .into_iter()
                    .map(|order| (order.id, order))
                    .collect();

                let mut numbers = OrderNumberSequence::load(unit.txn()).await?;
                let mut created = Vec::with_capacity(originals.len());
                for id in ids.ids() {
                    let Some(original) = originals.get(id) else {
                        continue;
                    };
                    let copy = insert_order(unit.txn(), &NewOrder::copy_of(original), numbers.next()?)
                        .await?;
                    created.push(DuplicatedOrder {
                        id: copy.id,
                        order_number: copy.order_number,
                        original_order_id: original.id,
                    });
                }

                unit.commit().await?;
                Ok::<_, ServiceError>(created)
            })
            .await?;

        counter!("order_desk.bulk.duplicated", duplicated.len() as u64);
        info!(duplicated = duplicated.len(), "Bulk duplicate applied");
        Ok(duplicated)
    }

    #[instrument(skip(self, ids), fields(requested = ids.requested().len()))]
    pub async fn bulk_delete(&self, ids: IdSet) -> Result<BulkDeleteOutcome, ServiceError> {
        Self::require_ids(&ids)?;

        let deleted_count = if ids.ids().is_empty() {
            0
        } else {
            let unit = self.orders.gate().begin(self.orders.get_db()).await?;
            let result = Order::delete_many()
                .filter(ids.condition(Column::Id))
                .exec(unit.txn())
                .await?;
            unit.commit().await?;
            result.rows_affected
        };

        counter!("order_desk.bulk.deleted", deleted_count);
        info!(deleted = deleted_count, "Bulk delete applied");

        Ok(BulkDeleteOutcome {
            deleted_count,
            deleted_ids: ids.into_requested(),
        })
    }
}
