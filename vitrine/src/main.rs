use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use vitrine::{AppConfig, Backend, TracingNotifier, Vitrine, VitrineBuilder};
use vitrine_core::repositories::RepositoryProvider;

/// Command line interface for Vitrine
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string, overrides DATABASE_URL
    #[arg(long)]
    db_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Run the reminder scheduler until interrupted
    Reminders,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("Vitrine v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = AppConfig::from_env_with_url(cli.db_url)?;

    let builder = VitrineBuilder::from_config(&config);
    match config.backend()? {
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            let vitrine = builder.with_sqlite(&config.database_url).await?.build().await?;
            run(vitrine, cli.command).await
        }
        #[cfg(feature = "postgres")]
        Backend::Postgres => {
            let vitrine = builder
                .with_postgres(&config.database_url)
                .await?
                .build()
                .await?;
            run(vitrine, cli.command).await
        }
        #[allow(unreachable_patterns)]
        backend => Err(format!("{backend:?} support is not compiled in").into()),
    }
}

async fn run<R: RepositoryProvider>(
    vitrine: Vitrine<R>,
    command: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Migrate => {
            tracing::info!(tenant = %vitrine.tenant(), "Running migrations");
            vitrine.migrate().await?;
            tracing::info!("Migrations complete");
        }
        Commands::Reminders => {
            vitrine.migrate().await?;

            let scheduler = vitrine.reminder_scheduler(Arc::new(TracingNotifier));
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let handle = scheduler.start(shutdown_rx);

            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutdown requested");
            shutdown_tx.send_replace(true);
            handle.await?;
        }
        Commands::Version => {}
    }
    Ok(())
}
