//! `tap-shopify-partner` command-line entry point.
//!
//! Singer messages go to stdout, logs go to stderr.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tap_shopify_partner::singer::{Catalog, MessageWriter, TapState};
use tap_shopify_partner::{Tap, TapConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments, following the Singer tap conventions.
#[derive(Parser, Debug, Clone)]
#[command(name = "tap-shopify-partner")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Singer tap for the Shopify Partner GraphQL API")]
struct Args {
    /// Config file path, repeatable; later files win. `ENV` reads
    /// TAP_SHOPIFY_PARTNER_* environment variables
    #[arg(long = "config", value_name = "PATH|ENV")]
    config: Vec<String>,

    /// Print the catalog of available streams and exit
    #[arg(long)]
    discover: bool,

    /// Print tap metadata and accepted settings and exit
    #[arg(long)]
    about: bool,

    /// Catalog file selecting streams and properties
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// State file with bookmarks from a previous run
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TAP_SHOPIFY_PARTNER_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    if args.about {
        let about = serde_json::to_string_pretty(&Tap::about())?;
        writeln!(std::io::stdout(), "{about}")?;
        return Ok(());
    }

    if args.config.is_empty() {
        anyhow::bail!("At least one --config is required");
    }
    let config = TapConfig::load(&args.config).context("Invalid configuration")?;
    let tap = Tap::new(config).context("Failed to initialize tap")?;

    if args.discover {
        let catalog = serde_json::to_string_pretty(&tap.discover())?;
        writeln!(std::io::stdout(), "{catalog}")?;
        return Ok(());
    }

    let catalog = match &args.catalog {
        Some(path) => Catalog::from_path(path).context("Failed to load catalog")?,
        None => tap.discover(),
    };
    let mut state = match &args.state {
        Some(path) => TapState::from_path(path).context("Failed to load state")?,
        None => TapState::default(),
    };

    let stdout = std::io::stdout();
    let mut writer = MessageWriter::new(stdout.lock());
    let total = tap.sync(&catalog, &mut state, &mut writer).await?;
    info!("Sync completed: {} record(s)", total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_repeatable() {
        let args = Args::parse_from([
            "tap-shopify-partner",
            "--config",
            "base.json",
            "--config",
            "ENV",
            "--state",
            "state.json",
        ]);
        assert_eq!(args.config, ["base.json", "ENV"]);
        assert_eq!(args.state, Some(PathBuf::from("state.json")));
        assert!(!args.discover);
    }

    #[test]
    fn test_flags_parse() {
        let args = Args::parse_from(["tap-shopify-partner", "--about", "--discover"]);
        assert!(args.about);
        assert!(args.discover);
        assert!(args.config.is_empty());
    }
}
