use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{IdSet, Page};
use crate::entities::order::{
    Customer, Model as OrderModel, OrderStatus, PaymentStatus, StatusFilter,
};
use crate::errors::ServiceError;
use crate::repositories::{NewOrder, OrderChanges};
use crate::services::bulk_orders::{BulkDeleteOutcome, BulkStatusOutcome, DuplicatedOrder};
use crate::AppState;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;

fn parse_order_date(raw: Option<String>) -> Result<Option<NaiveDate>, ServiceError> {
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|_| ServiceError::InvalidInput(format!("Invalid order_date: {s}")))
    })
    .transpose()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer: Customer,
    pub order_date: Option<NaiveDate>,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderModel> for OrderResponse {
    fn from(order: OrderModel) -> Self {
        Self {
            customer: order.customer(),
            id: order.id,
            order_number: order.order_number,
            order_date: order.order_date,
            status: order.status,
            total_amount: order.total_amount,
            payment_status: order.payment_status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Listing envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl From<Page<OrderModel>> for OrderPage {
    fn from(page: Page<OrderModel>) -> Self {
        let page = page.map(OrderResponse::from);
        Self {
            orders: page.items,
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer: Customer,
    pub total_amount: Decimal,
    pub status: String,
    pub payment_status: String,
    pub order_date: Option<String>,
}

impl CreateOrderRequest {
    pub fn into_new_order(self) -> Result<NewOrder, ServiceError> {
        Ok(NewOrder {
            status: OrderStatus::parse(&self.status)?,
            payment_status: PaymentStatus::parse(&self.payment_status)?,
            order_date: parse_order_date(self.order_date)?,
            customer: self.customer,
            total_amount: self.total_amount,
        })
    }
}

/// Every field optional; `null` counts as absent.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    pub customer: Option<Customer>,
    pub total_amount: Option<Decimal>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub order_date: Option<String>,
}

impl UpdateOrderRequest {
    pub fn into_changes(self) -> Result<OrderChanges, ServiceError> {
        Ok(OrderChanges {
            status: self.status.as_deref().map(OrderStatus::parse).transpose()?,
            payment_status: self
                .payment_status
                .as_deref()
                .map(PaymentStatus::parse)
                .transpose()?,
            order_date: parse_order_date(self.order_date)?,
            customer: self.customer,
            total_amount: self.total_amount,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkStatusRequest {
    #[serde(default)]
    pub order_ids: Vec<String>,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkIdsRequest {
    #[serde(default)]
    pub order_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkDuplicateResponse {
    pub duplicated_count: usize,
    pub new_orders: Vec<DuplicatedOrder>,
}

/// GET /orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderPage>, ServiceError> {
    let filter = StatusFilter::parse(query.status.as_deref().unwrap_or("all"))?;
    let page = state
        .orders
        .list(
            filter,
            query.page.unwrap_or(DEFAULT_PAGE),
            query.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await?;

    Ok(Json(page.into()))
}

/// GET /orders/:id
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let order = state.orders.get(&id).await?;
    Ok(Json(order.into()))
}

/// POST /orders
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ServiceError> {
    let order = state.orders.create(request.into_new_order()?).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// PUT /orders/:id
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let order = state.orders.update(&id, request.into_changes()?).await?;
    Ok(Json(order.into()))
}

/// DELETE /orders/:id
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    state.orders.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /orders/bulk/status
pub async fn bulk_update_status(
    State(state): State<AppState>,
    Json(request): Json<BulkStatusRequest>,
) -> Result<Json<BulkStatusOutcome>, ServiceError> {
    let status = OrderStatus::parse(&request.status)?;
    let outcome = state
        .bulk
        .bulk_update_status(IdSet::parse(request.order_ids), status)
        .await?;
    Ok(Json(outcome))
}

/// POST /orders/bulk/duplicate
pub async fn bulk_duplicate(
    State(state): State<AppState>,
    Json(request): Json<BulkIdsRequest>,
) -> Result<(StatusCode, Json<BulkDuplicateResponse>), ServiceError> {
    let new_orders = state
        .bulk
        .bulk_duplicate(IdSet::parse(request.order_ids))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(BulkDuplicateResponse {
            duplicated_count: new_orders.len(),
            new_orders,
        }),
    ))
}

/// DELETE /orders/bulk
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(request): Json<BulkIdsRequest>,
) -> Result<Json<BulkDeleteOutcome>, ServiceError> {
    let outcome = state
        .bulk
        .bulk_delete(IdSet::parse(request.order_ids))
        .await?;
    Ok(Json(outcome))
}
