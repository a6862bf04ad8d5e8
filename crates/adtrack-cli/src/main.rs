mod offers;
mod scrape;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::offers::OffersCommands;

#[derive(Debug, Parser)]
#[command(name = "adtrack-cli")]
#[command(about = "Active-ad tracker command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Scrape every enabled offer once and record today's counts
    Scrape {
        /// Only scrape this offer
        #[arg(long)]
        offer: Option<Uuid>,
        /// Print observed counts without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// History ledger maintenance
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Inspect tracked offers
    Offers {
        #[command(subcommand)]
        command: OffersCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Fill the history of every offer with sample counts
    SeedSample,
}

#[derive(Debug, Subcommand)]
enum HistoryCommands {
    /// Copy each offer's current count into today's ledger row
    Snapshot,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("adtrack-cli ready; run with --help to list commands");
        return Ok(());
    };

    let config = adtrack_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = adtrack_db::PoolConfig::from_app_config(&config);
    let pool = adtrack_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => run_db(&pool, command).await?,
        Commands::Scrape { offer, dry_run } => {
            scrape::run_scrape(&pool, &config, offer, dry_run).await?;
        }
        Commands::History {
            command: HistoryCommands::Snapshot,
        } => scrape::run_history_snapshot(&pool).await?,
        Commands::Offers { command } => offers::run_offers(&pool, command).await?,
    }

    Ok(())
}

async fn run_db(pool: &sqlx::PgPool, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            adtrack_db::ping(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = adtrack_db::run_migrations(pool).await?;
            tracing::info!(applied, "migrations applied");
            println!("applied {applied} migration(s)");
        }
        DbCommands::SeedSample => {
            adtrack_db::run_migrations(pool).await?;
            let today = chrono::Utc::now().date_naive();
            let summary = adtrack_db::seed_sample_history(pool, today).await?;
            tracing::info!(
                offers = summary.offers,
                days = summary.days_inserted,
                "sample history seeded"
            );
            println!(
                "seeded {} history day(s) across {} offer(s)",
                summary.days_inserted, summary.offers
            );
        }
    }
    Ok(())
}
