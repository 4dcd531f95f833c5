use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use order_desk::config::{init_tracing, load_config, AppConfig};
use order_desk::db::establish_connection_from_app_config;
use order_desk::migrator::{applied_migrations, MigrationAction};

#[derive(Parser)]
#[command(name = "migration", about = "Apply, roll back or inspect schema migrations", version)]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply every pending migration
    Upgrade,
    /// Roll back the most recent migration
    Downgrade,
    /// List applied migrations
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg: AppConfig = load_config().context("failed to load configuration")?;
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }
    init_tracing(cfg.log_level(), cfg.log_json);

    let db = establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;

    let action = match cli.command {
        Command::Upgrade => MigrationAction::Upgrade,
        Command::Downgrade => MigrationAction::Downgrade,
        Command::Status => {
            let records = applied_migrations(&db).await?;
            if records.is_empty() {
                println!("no migrations applied");
            }
            for record in records {
                println!("{}\t{}", record.name, record.applied_at.to_rfc3339());
            }
            return Ok(());
        }
    };

    action
        .apply(&db)
        .await
        .with_context(|| format!("{action} failed"))?;
    info!(%action, "Migration finished");
    Ok(())
}
