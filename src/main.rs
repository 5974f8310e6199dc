//! Telco churn - entry point

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use telco_churn::cli::{cmd_predict, cmd_serve, cmd_train, Cli, Commands};
use telco_churn::config::constants::TIMESTAMP_FORMAT;

const LOG_DIR: &str = "Logs";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_file = format!(
        "running_logs_{}.log",
        chrono::Local::now().format(TIMESTAMP_FORMAT)
    );
    let (file_writer, _guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(LOG_DIR, log_file));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "telco_churn=info".into()))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { local_storage, csv } => {
            cmd_train(local_storage.as_deref(), csv.as_deref()).await?;
        }
        Commands::Serve {
            host,
            port,
            local_storage,
            csv,
        } => {
            cmd_serve(&host, port, local_storage.as_deref(), csv.as_deref()).await?;
        }
        Commands::Predict {
            record,
            local_storage,
        } => {
            cmd_predict(&record, local_storage.as_deref()).await?;
        }
    }

    Ok(())
}
