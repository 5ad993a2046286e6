use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reup::app::AppContext;
use reup::cli::{commands, Cli, Commands};
use reup::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    if let Commands::Config = cli.command {
        commands::show_config(&config, cli.config.as_deref())?;
        return Ok(());
    }

    let ctx = AppContext::with_workers(config, cli.workers)?;

    match cli.command {
        Commands::Resolve { urls } => {
            commands::resolve_urls(&ctx, &urls)?;
        }
        Commands::Check { urls } => {
            commands::check_urls(&ctx, &urls).await?;
        }
        Commands::Watch {
            urls,
            interval,
            task,
            output,
        } => {
            commands::watch_urls(&ctx, &urls, interval.as_deref(), task.as_deref(), &output)
                .await?;
        }
        Commands::Profile { path, output } => {
            commands::watch_profile(&ctx, &path, &output).await?;
        }
        Commands::Config => {}
    }

    Ok(())
}
