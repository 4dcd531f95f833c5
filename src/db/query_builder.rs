use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, Select,
};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}

/// `ceil(total / limit)`, with a zero limit counted as a single page.
pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        1
    } else {
        total.div_ceil(limit)
    }
}

/// Helper struct for building paginated queries
pub struct QueryBuilder<E: EntityTrait> {
    query: Select<E>,
    page: u64,
    limit: u64,
}

impl<E: EntityTrait> Default for QueryBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> QueryBuilder<E> {
    /// Create a new query builder
    pub fn new() -> Self {
        Self {
            query: E::find(),
            page: 1,
            limit: 20,
        }
    }

    /// Add pagination; `limit` is capped at `max_limit`
    pub fn paginate(mut self, page: u64, limit: u64, max_limit: u64) -> Self {
        self.page = page.max(1);
        self.limit = limit.clamp(1, max_limit.max(1));
        self
    }

    /// Add a filter condition
    pub fn filter(mut self, condition: Condition) -> Self {
        self.query = self.query.filter(condition);
        self
    }

    /// Add ordering
    pub fn order_by<C>(mut self, column: C, desc: bool) -> Self
    where
        C: ColumnTrait,
    {
        self.query = if desc {
            self.query.order_by_desc(column)
        } else {
            self.query.order_by_asc(column)
        };
        self
    }

    /// Execute the query; the total counts the filtered rows, not the table
    pub async fn execute<C>(self, db: &C) -> Result<Page<E::Model>, DbErr>
    where
        C: ConnectionTrait,
        E::Model: FromQueryResult + Sized + Send + Sync,
    {
        let paginator = self.query.paginate(db, self.limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(self.page - 1).await?;

        Ok(Page {
            items,
            total,
            page: self.page,
            limit: self.limit,
            total_pages: total_pages(total, self.limit),
        })
    }
}

/// Ids supplied to a bulk operation.
///
/// Keeps the raw request for echoing back, plus the distinct parseable
/// UUIDs in first-seen order. Anything that is not a UUID cannot match a row
/// and is dropped from the lookup set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSet {
    requested: Vec<String>,
    ids: Vec<Uuid>,
}

impl IdSet {
    pub fn parse<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requested: Vec<String> = raw.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        let ids = requested
            .iter()
            .filter_map(|s| Uuid::parse_str(s).ok())
            .filter(|id| seen.insert(*id))
            .collect();

        Self { requested, ids }
    }

    /// True when the caller sent no ids at all.
    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }

    pub fn requested(&self) -> &[String] {
        &self.requested
    }

    pub fn into_requested(self) -> Vec<String> {
        self.requested
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    /// `column IN (...)` over the parsed ids, bound as parameters.
    pub fn condition<C: ColumnTrait>(&self, column: C) -> Condition {
        Condition::all().add(column.is_in(self.ids.iter().copied()))
    }
}
