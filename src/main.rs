use clap::Parser;
use inventory_etl::args::{Args, Command};
use inventory_etl::logging::{env_filter, Component, Logging};
use inventory_etl::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();
    let data_dir = match args.command() {
        Command::Ingest(ingest_args) | Command::Run(ingest_args) => ingest_args.data_dir(),
        Command::Summarize | Command::Tables => None,
    };
    let config = Config::load(home, data_dir).await?;
    let logging = Logging::new(config.logs_dir(), args.common().log_level());
    debug!("Writing component logs to {}", logging.dir().display());

    // Each component logs to its own file; the dispatch is scoped to the component's future.
    match args.command() {
        Command::Ingest(_) => {
            commands::run_logged(&logging, Component::IngestionDb, commands::ingest(config))
                .await?
        }

        Command::Summarize => {
            commands::run_logged(
                &logging,
                Component::VendorSummary,
                commands::summarize(config),
            )
            .await?
        }

        Command::Run(_) => {
            commands::run_logged(
                &logging,
                Component::IngestionDb,
                commands::ingest(config.clone()),
            )
            .await?;
            commands::run_logged(
                &logging,
                Component::VendorSummary,
                commands::summarize(config),
            )
            .await?
        }

        Command::Tables => commands::tables(config).await?.print(),
    }
    Ok(())
}

/// Initializes the stderr subscriber used outside of component runs.
pub fn init_logger(level: LevelFilter) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .init();
}
