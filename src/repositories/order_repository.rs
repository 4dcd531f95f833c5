use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::db::{Page, QueryBuilder, WriteGate};
use crate::entities::order::{
    ActiveModel as OrderActiveModel, Column, Customer, Entity as Order, Model as OrderModel,
    OrderStatus, PaymentStatus, StatusFilter,
};
use crate::errors::ServiceError;
use crate::repositories::order_number::OrderNumberSequence;
use crate::repositories::Repository;

use super::BaseRepository;

/// Tuning knobs for [`OrderRepository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRepositoryConfig {
    /// Upper bound applied to a requested page size.
    pub max_page_size: u64,
    /// How many times a write that lost an order-number race is retried.
    pub number_retry_attempts: u32,
}

impl Default for OrderRepositoryConfig {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            number_retry_attempts: 3,
        }
    }
}

impl From<&AppConfig> for OrderRepositoryConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            max_page_size: cfg.max_page_size,
            number_retry_attempts: cfg.order_number_retry_attempts,
        }
    }
}

/// Fields of an order about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub customer: Customer,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub order_date: Option<NaiveDate>,
}

impl NewOrder {
    /// Copies the business fields of an existing order.
    pub fn copy_of(order: &OrderModel) -> Self {
        Self {
            customer: order.customer(),
            total_amount: order.total_amount,
            status: order.status,
            payment_status: order.payment_status,
            order_date: order.order_date,
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        self.customer.validate()?;
        validate_amount(self.total_amount)
    }
}

/// A partial update. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderChanges {
    pub customer: Option<Customer>,
    pub total_amount: Option<Decimal>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub order_date: Option<NaiveDate>,
}

impl OrderChanges {
    pub fn is_empty(&self) -> bool {
        self.customer.is_none()
            && self.total_amount.is_none()
            && self.status.is_none()
            && self.payment_status.is_none()
            && self.order_date.is_none()
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.is_empty() {
            return Err(ServiceError::InvalidInput("No fields to update".into()));
        }
        if let Some(customer) = &self.customer {
            customer.validate()?;
        }
        if let Some(amount) = self.total_amount {
            validate_amount(amount)?;
        }
        Ok(())
    }

    fn apply(self, active: &mut OrderActiveModel) {
        if let Some(customer) = self.customer {
            active.customer_name = Set(customer.name);
            active.customer_email = Set(customer.email);
            active.customer_avatar = Set(customer.avatar);
        }
        if let Some(total_amount) = self.total_amount {
            active.total_amount = Set(total_amount);
        }
        if let Some(status) = self.status {
            active.status = Set(status);
        }
        if let Some(payment_status) = self.payment_status {
            active.payment_status = Set(payment_status);
        }
        if let Some(order_date) = self.order_date {
            active.order_date = Set(Some(order_date));
        }
    }
}

fn validate_amount(amount: Decimal) -> Result<(), ServiceError> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(
            "total_amount must be greater than 0".into(),
        ))
    }
}

/// Parses a path id. A malformed id cannot name a stored order.
pub fn parse_order_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::order_not_found(raw))
}

/// Inserts one row with a fresh id and timestamps.
pub(crate) async fn insert_order<C: ConnectionTrait>(
    conn: &C,
    order: &NewOrder,
    order_number: String,
) -> Result<OrderModel, DbErr> {
    let now = Utc::now();
    OrderActiveModel {
        id: Set(Uuid::new_v4()),
        order_number: Set(order_number),
        customer_name: Set(order.customer.name.clone()),
        customer_email: Set(order.customer.email.clone()),
        customer_avatar: Set(order.customer.avatar.clone()),
        order_date: Set(order.order_date),
        status: Set(order.status),
        total_amount: Set(order.total_amount),
        payment_status: Set(order.payment_status),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
}

/// Repository for order operations
#[derive(Debug, Clone)]
pub struct OrderRepository {
    base: BaseRepository,
    gate: WriteGate,
    config: OrderRepositoryConfig,
}

impl OrderRepository {
    pub fn new(db: Arc<DatabaseConnection>, config: OrderRepositoryConfig) -> Self {
        Self {
            base: BaseRepository::new(db),
            gate: WriteGate::new(),
            config,
        }
    }

    pub fn config(&self) -> OrderRepositoryConfig {
        self.config
    }

    /// The gate every mutating unit of work on `orders` must hold.
    pub(crate) fn gate(&self) -> &WriteGate {
        &self.gate
    }

    /// Filtered listing, newest first.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: StatusFilter,
        page: i64,
        limit: i64,
    ) -> Result<Page<OrderModel>, ServiceError> {
        if page < 1 {
            return Err(ServiceError::ValidationError("page must be at least 1".into()));
        }
        if limit < 1 {
            return Err(ServiceError::ValidationError("limit must be at least 1".into()));
        }

        // OFFSET is bound as a signed 64-bit value
        let effective_limit = (limit as u64).min(self.config.max_page_size.max(1));
        let in_range = ((page - 1) as u64)
            .checked_mul(effective_limit)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !in_range {
            return Err(ServiceError::ValidationError("page is out of range".into()));
        }

        let mut query = QueryBuilder::<Order>::new()
            .paginate(page as u64, limit as u64, self.config.max_page_size)
            .order_by(Column::CreatedAt, true);
        if let StatusFilter::Only(status) = filter {
            query = query.filter(sea_orm::Condition::all().add(Column::Status.eq(status)));
        }

        query.execute(self.get_db()).await.map_err(ServiceError::db_error)
    }

    /// Find an order by ID
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<OrderModel, ServiceError> {
        let uuid = parse_order_id(id)?;
        Order::find_by_id(uuid)
            .one(self.get_db())
            .await?
            .ok_or_else(|| ServiceError::order_not_found(id))
    }

    pub async fn find_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderModel>, ServiceError> {
        Order::find()
            .filter(Column::OrderNumber.eq(order_number))
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Create a new order with the next order number
    #[instrument(skip(self, order), fields(customer_email = %order.customer.email))]
    pub async fn create(&self, order: NewOrder) -> Result<OrderModel, ServiceError> {
        order.validate()?;

        let (repo, order) = (self, &order);
        let created = self
            .retry_on_number_conflict("create", move || async move {
                let unit = repo.gate.begin(repo.get_db()).await?;
                let mut numbers = OrderNumberSequence::load(unit.txn()).await?;
                let model = insert_order(unit.txn(), order, numbers.next()?).await?;
                unit.commit().await?;
                Ok::<_, ServiceError>(model)
            })
            .await?;

        counter!("order_desk.orders.created", 1);
        info!(order_id = %created.id, order_number = %created.order_number, "Order created");
        Ok(created)
    }

    /// Apply a partial update
    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: &str, changes: OrderChanges) -> Result<OrderModel, ServiceError> {
        changes.validate()?;
        let uuid = parse_order_id(id)?;

        let unit = self.gate.begin(self.get_db()).await?;
        let existing = Order::find_by_id(uuid)
            .one(unit.txn())
            .await?
            .ok_or_else(|| ServiceError::order_not_found(id))?;

        let mut active: OrderActiveModel = existing.into();
        changes.apply(&mut active);
        active.updated_at = Set(Utc::now());

        let updated = active.update(unit.txn()).await?;
        unit.commit().await?;

        info!(order_id = %updated.id, "Order updated");
        Ok(updated)
    }

    /// Delete an order
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let uuid = parse_order_id(id)?;

        let unit = self.gate.begin(self.get_db()).await?;
        let result = Order::delete_by_id(uuid).exec(unit.txn()).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::order_not_found(id));
        }
        unit.commit().await?;

        info!(order_id = %uuid, "Order deleted");
        Ok(())
    }

    /// Runs `op` again when it fails on the order-number UNIQUE index, up to
    /// the configured number of attempts, then reports a conflict.
    pub(crate) async fn retry_on_number_conflict<T, F, Fut>(
        &self,
        operation: &'static str,
        mut op: F,
    ) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let attempts = self.config.number_retry_attempts.max(1);
        for attempt in 1..=attempts {
            match op().await {
                Err(e) if e.is_unique_violation() => {
                    counter!("order_desk.order_number.retries", 1, "operation" => operation);
                    warn!(operation, attempt, attempts, "Order number collision, retrying");
                }
                other => return other,
            }
        }

        Err(ServiceError::Conflict(format!(
            "Could not assign a unique order number after {attempts} attempts"
        )))
    }
}

impl Repository for OrderRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
