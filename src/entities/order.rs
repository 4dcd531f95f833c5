use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;

/// Lifecycle state of an order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

impl OrderStatus {
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        raw.parse()
            .map_err(|_| ServiceError::InvalidStatus(format!("Unknown order status: {raw}")))
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        raw.parse()
            .map_err(|_| ServiceError::InvalidStatus(format!("Unknown payment status: {raw}")))
    }
}

/// Status filter accepted by the listing endpoint: `all` or one status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        if raw == "all" {
            return Ok(Self::All);
        }
        raw.parse()
            .map(Self::Only)
            .map_err(|_| ServiceError::InvalidStatus(format!("Invalid status filter: {raw}")))
    }
}

/// Customer details embedded in an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Customer {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Customer email is required"))]
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// The `orders` table. Customer fields are stored flattened.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_avatar: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn customer(&self) -> Customer {
        Customer {
            name: self.customer_name.clone(),
            email: self.customer_email.clone(),
            avatar: self.customer_avatar.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("pending", OrderStatus::Pending)]
    #[test_case("completed", OrderStatus::Completed)]
    #[test_case("refunded", OrderStatus::Refunded)]
    fn parses_known_statuses(raw: &str, expected: OrderStatus) {
        assert_eq!(OrderStatus::parse(raw).unwrap(), expected);
        assert_eq!(expected.to_string(), raw);
    }

    #[test_case("shipped")]
    #[test_case("Pending")]
    #[test_case("")]
    fn rejects_unknown_statuses(raw: &str) {
        assert!(matches!(
            OrderStatus::parse(raw),
            Err(ServiceError::InvalidStatus(_))
        ));
    }

    #[test]
    fn payment_status_round_trips_through_text() {
        assert_eq!(PaymentStatus::parse("paid").unwrap(), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::Unpaid.to_string(), "unpaid");
        assert!(PaymentStatus::parse("refunded").is_err());
    }

    #[test]
    fn status_filter_accepts_all() {
        assert_eq!(StatusFilter::parse("all").unwrap(), StatusFilter::All);
        assert_eq!(
            StatusFilter::parse("completed").unwrap(),
            StatusFilter::Only(OrderStatus::Completed)
        );
        assert!(StatusFilter::parse("everything").is_err());
    }

    #[test]
    fn customer_requires_name_and_email() {
        let customer = Customer {
            name: String::new(),
            email: "a@example.com".into(),
            avatar: None,
        };
        assert!(customer.validate().is_err());
    }
}
