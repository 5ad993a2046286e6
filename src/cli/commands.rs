use std::path::Path;

use crate::app::{AppContext, ReupError, Result};
use crate::cli::OutputArgs;
use crate::config::Config;
use crate::daemon::{Daemon, DaemonConfig};
use crate::domain::{Profile, TargetRef};
use crate::monitor::{Engine, MonitorLabel};

pub fn resolve_urls(ctx: &AppContext, urls: &[String]) -> Result<()> {
    let mut failed = 0;
    for url in urls {
        match ctx.locator.resolve(url) {
            Ok(id) => println!("{}\t{}", id, url),
            Err(e) => {
                failed += 1;
                eprintln!("{}", e);
            }
        }
    }

    if failed > 0 {
        return Err(ReupError::Validation(format!(
            "{} of {} URLs could not be resolved",
            failed,
            urls.len()
        )));
    }
    Ok(())
}

pub async fn check_urls(ctx: &AppContext, urls: &[String]) -> Result<()> {
    let targets = resolve_targets(ctx, urls)?;
    println!("Checking {} products...", targets.len());

    let results = ctx.parallel_checker.check_all(targets).await;

    let mut in_stock = 0;
    let mut errors = 0;
    for (target, result) in results {
        match result {
            Ok(check) => {
                if check.record.in_stock {
                    in_stock += 1;
                }
                println!("  [{}] {}", target, check.record);
            }
            Err(e) => {
                errors += 1;
                println!("  [{}] Error: {}", target, e);
            }
        }
    }

    println!("Check complete: {} in stock, {} errors", in_stock, errors);
    Ok(())
}

pub async fn watch_urls(
    ctx: &AppContext,
    urls: &[String],
    interval: Option<&str>,
    task: Option<&str>,
    output: &OutputArgs,
) -> Result<()> {
    let targets = resolve_targets(ctx, urls)?;
    let engine = ctx.engine();
    let label = task.map_or(MonitorLabel::Product, |name| MonitorLabel::Task(name.to_string()));
    start_targets(&engine, &targets, interval, &label)?;
    run_daemon(engine, output).await
}

pub async fn watch_profile(ctx: &AppContext, path: &Path, output: &OutputArgs) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let profile = Profile::from_json(&content)?;

    let engine = ctx.engine();
    let results = engine.load_profile(&profile)?;
    let started = results.iter().filter(|(_, r)| r.is_ok()).count();
    for (url, result) in &results {
        if let Err(e) = result {
            eprintln!("Skipping {}: {}", url, e);
        }
    }

    if started == 0 {
        return Err(ReupError::Validation(format!(
            "Profile {} has no products that can be monitored",
            profile.name
        )));
    }
    println!("Loaded profile {} ({} products)", profile.name, started);

    run_daemon(engine, output).await
}

pub fn show_config(config: &Config, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => println!("# {}", path.display()),
        None => match Config::default_config_path() {
            Ok(path) => println!("# {}", path.display()),
            Err(e) => println!("# {}", e),
        },
    }

    let rendered = toml::to_string_pretty(config)
        .map_err(|e| ReupError::Other(format!("Failed to render config: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

fn resolve_targets(ctx: &AppContext, urls: &[String]) -> Result<Vec<TargetRef>> {
    let mut targets: Vec<TargetRef> = Vec::new();
    for url in urls {
        let target = ctx.locator.target(url)?;
        if targets
            .iter()
            .any(|t| t.canonical_id() == target.canonical_id())
        {
            println!("Skipping duplicate product {}", target);
            continue;
        }
        targets.push(target);
    }
    Ok(targets)
}

fn start_targets(
    engine: &Engine,
    targets: &[TargetRef],
    interval: Option<&str>,
    label: &MonitorLabel,
) -> Result<()> {
    for target in targets {
        engine.start_labeled(target, interval, label.clone())?;
    }
    Ok(())
}

async fn run_daemon(engine: Engine, output: &OutputArgs) -> Result<()> {
    let config = DaemonConfig {
        log_file: output.log.clone(),
        verbose: output.verbose,
    };
    Daemon::new(engine, config).run().await
}
