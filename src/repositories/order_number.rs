//! Human-readable order numbers: `#ORD` followed by a decimal counter.

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, QuerySelect};

use crate::entities::order::{Column, Entity as Order};
use crate::errors::ServiceError;

pub const ORDER_NUMBER_PREFIX: &str = "#ORD";

/// Counter value assumed when no parseable order number exists yet.
pub const ORDER_NUMBER_BASELINE: u64 = 1000;

/// Extracts the counter from `#ORD<N>`; anything else yields `None`.
pub fn parse_order_number(raw: &str) -> Option<u64> {
    raw.strip_prefix(ORDER_NUMBER_PREFIX)?.parse().ok()
}

pub fn format_order_number(n: u64) -> String {
    format!("{ORDER_NUMBER_PREFIX}{n}")
}

/// The next free order numbers, derived from the highest one in storage.
///
/// Load it inside the unit of work that performs the inserts; a batch loads
/// once and calls [`OrderNumberSequence::next`] per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderNumberSequence {
    last: u64,
}

impl OrderNumberSequence {
    pub fn starting_after(last: u64) -> Self {
        Self { last }
    }

    /// Highest parseable counter among `existing`, or the baseline.
    pub fn from_existing<'a, I>(existing: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let last = existing
            .into_iter()
            .filter_map(parse_order_number)
            .max()
            .unwrap_or(ORDER_NUMBER_BASELINE);
        Self { last }
    }

    pub async fn load<C: ConnectionTrait>(conn: &C) -> Result<Self, DbErr> {
        let numbers: Vec<String> = Order::find()
            .select_only()
            .column(Column::OrderNumber)
            .into_tuple()
            .all(conn)
            .await?;

        Ok(Self::from_existing(numbers.iter().map(String::as_str)))
    }

    pub fn next(&mut self) -> Result<String, ServiceError> {
        self.last = self
            .last
            .checked_add(1)
            .ok_or_else(|| ServiceError::InternalError("Order number space exhausted".into()))?;
        Ok(format_order_number(self.last))
    }
}
