use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QueryOrder};
use sea_orm_migration::prelude::*;
use sea_orm_migration::seaql_migrations;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20241215_000002_create_orders_table::Migration)]
    }
}

/// A row of the migration ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// Direction of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationAction {
    /// Apply every pending migration.
    Upgrade,
    /// Roll back the most recently applied migration.
    Downgrade,
}

impl fmt::Display for MigrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upgrade => f.write_str("upgrade"),
            Self::Downgrade => f.write_str("downgrade"),
        }
    }
}

impl FromStr for MigrationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upgrade" | "up" => Ok(Self::Upgrade),
            "downgrade" | "down" => Ok(Self::Downgrade),
            other => Err(format!("unknown migration action: {other}")),
        }
    }
}

impl MigrationAction {
    pub async fn apply(self, db: &DatabaseConnection) -> Result<(), DbErr> {
        counter!("order_desk.migrations.runs", 1, "action" => self.to_string());
        match self {
            Self::Upgrade => Migrator::up(db, None).await,
            Self::Downgrade => Migrator::down(db, Some(1)).await,
        }
    }
}

/// Lists the ledger, oldest first. Creates the ledger table if it is missing.
pub async fn applied_migrations(db: &DatabaseConnection) -> Result<Vec<MigrationRecord>, DbErr> {
    Migrator::install(db).await?;

    let rows = seaql_migrations::Entity::find()
        .order_by_asc(seaql_migrations::Column::Version)
        .all(db)
        .await?;

    let records = rows
        .into_iter()
        .map(|row| MigrationRecord {
            applied_at: DateTime::<Utc>::from_timestamp(row.applied_at, 0).unwrap_or_default(),
            name: row.version,
        })
        .collect::<Vec<_>>();

    info!(applied = records.len(), "Read migration ledger");
    Ok(records)
}

mod m20241215_000002_create_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241215_000002_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Aligned with entities::order Model; customer is stored flattened
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerEmail).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerAvatar).string().null())
                        .col(ColumnDef::new(Orders::OrderDate).date().null())
                        .col(ColumnDef::new(Orders::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::TotalAmount).decimal().not_null())
                        .col(
                            ColumnDef::new(Orders::PaymentStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("idx_orders_order_number")
                        .table(Orders::Table)
                        .col(Orders::OrderNumber)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_payment_status")
                        .table(Orders::Table)
                        .col(Orders::PaymentStatus)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_order_date")
                        .table(Orders::Table)
                        .col(Orders::OrderDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).if_exists().to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        OrderNumber,
        CustomerName,
        CustomerEmail,
        CustomerAvatar,
        OrderDate,
        Status,
        TotalAmount,
        PaymentStatus,
        CreatedAt,
        UpdatedAt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectOptions, Database};

    async fn memory_db() -> DatabaseConnection {
        let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        Database::connect(opt).await.expect("in-memory sqlite")
    }

    async fn has_orders_table(db: &DatabaseConnection) -> bool {
        SchemaManager::new(db)
            .has_table("orders")
            .await
            .expect("inspect schema")
    }

    #[test]
    fn migrations_are_registered() {
        let names: Vec<String> = Migrator::migrations()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, vec!["m20241215_000002_create_orders_table"]);
    }

    #[test]
    fn parses_actions() {
        assert_eq!("upgrade".parse(), Ok(MigrationAction::Upgrade));
        assert_eq!("down".parse(), Ok(MigrationAction::Downgrade));
        assert!("sideways".parse::<MigrationAction>().is_err());
    }

    #[tokio::test]
    async fn upgrade_is_idempotent() {
        let db = memory_db().await;

        MigrationAction::Upgrade.apply(&db).await.unwrap();
        MigrationAction::Upgrade.apply(&db).await.unwrap();

        assert!(has_orders_table(&db).await);
        let ledger = applied_migrations(&db).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].name, "m20241215_000002_create_orders_table");
    }

    #[tokio::test]
    async fn downgrade_drops_table_and_ledger_record() {
        let db = memory_db().await;

        MigrationAction::Upgrade.apply(&db).await.unwrap();
        MigrationAction::Downgrade.apply(&db).await.unwrap();

        assert!(!has_orders_table(&db).await);
        assert!(applied_migrations(&db).await.unwrap().is_empty());

        // upgrade after downgrade re-creates everything
        MigrationAction::Upgrade.apply(&db).await.unwrap();
        assert!(has_orders_table(&db).await);
        assert_eq!(applied_migrations(&db).await.unwrap().len(), 1);
    }
}
