//! tq - run a plan of keyed timed operations through a schedule

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use timequeue::cli::{Cli, Command, OutputFormat};
use timequeue::config::Config;
use timequeue::plan::Plan;
use timequeue::runner::{self, Driver, Firing};
use timequeue::{BackoffConfig, MockClock};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install subscriber: {}", e))?;

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    info!("tq starting");

    match cli.command {
        Command::Run { plan, simulate, format } => {
            debug!(?plan, simulate, %format, "main: matched Run command");
            let plan = Plan::load(&plan)?;
            cmd_run(&plan, &config.backoff, simulate, format).await
        }
        Command::Check { plan } => {
            debug!(?plan, "main: matched Check command");
            let plan = Plan::load(&plan)?;
            cmd_check(&plan, &config.backoff)
        }
    }
}

async fn cmd_run(plan: &Plan, backoff: &BackoffConfig, simulate: bool, format: OutputFormat) -> Result<()> {
    let driver = if simulate {
        Driver::Simulated(MockClock::new())
    } else {
        Driver::System
    };

    let mut print_error = None;
    let report = runner::run(plan, backoff, driver, |firing| {
        // Keep the first failure; the run itself carries on
        if let Err(e) = print_firing(firing, format) {
            print_error = print_error.take().or(Some(e));
        }
    })
    .await?;
    if let Some(e) = print_error {
        return Err(e);
    }

    if format == OutputFormat::Text {
        for key in &report.cancelled {
            println!("{} cancelled {}", "✗".yellow(), key.cyan());
        }
        for key in &report.not_found {
            println!("{} nothing to cancel for {}", "?".dimmed(), key);
        }
        println!("{} {} firings", "✓".green(), report.fired.len());
    }
    Ok(())
}

fn print_firing(firing: &Firing, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(firing).context("Failed to encode firing")?);
        }
        OutputFormat::Text => {
            let retry = if firing.rescheduled { " (retrying)".dimmed().to_string() } else { String::new() };
            println!(
                "{:>8}ms {} attempt {}{}",
                firing.elapsed_ms,
                firing.key.cyan(),
                firing.attempt,
                retry
            );
        }
    }
    Ok(())
}

fn cmd_check(plan: &Plan, backoff: &BackoffConfig) -> Result<()> {
    let deadlines = runner::first_deadlines(plan, backoff)?;
    for (key, after) in deadlines {
        println!("{:>8}ms {}", after.as_millis(), key.cyan());
    }
    if !plan.cancel.is_empty() {
        println!("cancel: {}", plan.cancel.join(", "));
    }
    println!("{} plan ok", "✓".green());
    Ok(())
}
