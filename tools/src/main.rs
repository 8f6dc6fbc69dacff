use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use eyre::{WrapErr, eyre};
use tracing_subscriber::EnvFilter;

use tools::{
    comment::{
        import::{import_comments, read_legacy_comments},
        normalize::normalize_threads,
        verify::verify_store,
    },
    config::{Env, ToolConfig},
    store::PgStore,
};

/// Administrative migrations for the legacy forum comments.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Overrides `DATABASE_URL`
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert the comments of a legacy forum JSON export
    ImportComments {
        /// Path to the exported comments
        file: PathBuf,
    },

    /// Rebuild thread, parent, order and level of the imported comments
    NormalizeThreads {
        /// Compute and report, but write nothing
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Check that every comment sits in a well-formed thread
    Verify,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    let cli = Cli::parse();
    let config = ToolConfig::new_from_env(cli.database_url.clone());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(matches!(config.as_ref().map(|c| c.env), Ok(Env::Dev)))
        .init();

    let config = config.wrap_err("invalid configuration")?;
    tracing::info!(env = ?config.env, "Starting {:?}", cli.command);

    let mut store = PgStore::connect(&config).wrap_err("could not set up the database pool")?;

    match cli.command {
        Command::ImportComments { file } => {
            let legacy = read_legacy_comments(&file)
                .wrap_err_with(|| format!("could not load {}", file.display()))?;
            tracing::info!("Read {} legacy comments from {}", legacy.len(), file.display());

            import_comments(&mut store, &legacy)
                .await
                .wrap_err("import aborted, nothing was written")?;
        }
        Command::NormalizeThreads { dry_run } => {
            let summary = normalize_threads(&mut store, dry_run)
                .await
                .wrap_err("normalization aborted, nothing was written")?;

            tracing::info!(
                threads = summary.threads,
                replies = summary.replies,
                nested_replies = summary.nested_replies,
                "Normalized {} comments",
                summary.comments
            );
        }
        Command::Verify => {
            let violations = verify_store(&mut store).await?;

            for v in &violations {
                tracing::error!("{v}");
            }

            if !violations.is_empty() {
                return Err(eyre!("{} thread invariant violations", violations.len()));
            }
            tracing::info!("All threads are well-formed");
        }
    }

    Ok(())
}
