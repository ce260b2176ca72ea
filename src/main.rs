//! Intersphinx Ultra command line interface.
//!
//! ```bash
//! # Print the contents of an inventory
//! intersphinx-ultra inspect https://docs.python.org/3/objects.inv
//!
//! # Fetch every configured inventory into a persistent cache
//! intersphinx-ultra fetch --config conf.toml --cache _build/intersphinx.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use intersphinx_ultra::inventory::format_inventory;
use intersphinx_ultra::{load_mappings, BuildEnvironment, InventoryFetcher, IntersphinxConfig};

#[derive(Parser)]
#[command(name = "intersphinx-ultra")]
#[command(version)]
#[command(about = "Fetch, inspect and cache Sphinx object inventories")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print out an inventory file
    Inspect {
        /// Local path or URL of an inventory file
        location: String,

        /// HTTP timeout in seconds
        #[arg(long)]
        timeout: Option<f64>,
    },

    /// Fetch the configured inventories and update the cache
    Fetch {
        /// Configuration file (TOML, YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Directory local inventory paths are relative to
        #[arg(long, default_value = ".")]
        srcdir: PathBuf,

        /// Cache file to load before and save after fetching
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Inspect { location, timeout } => inspect(&location, timeout),
        Commands::Fetch {
            config,
            srcdir,
            cache,
        } => fetch(&config, srcdir, cache),
    }
}

fn inspect(location: &str, timeout: Option<f64>) -> Result<()> {
    let config = IntersphinxConfig {
        timeout,
        tls_verify: false,
        ..Default::default()
    };
    let fetcher = InventoryFetcher::new(&config, Path::new("."))?;
    let inventory = fetcher.fetch_inventory("", location)?;
    print!("{}", format_inventory(&inventory));
    Ok(())
}

fn fetch(config_path: &Path, srcdir: PathBuf, cache: Option<PathBuf>) -> Result<()> {
    let config = IntersphinxConfig::from_file(config_path)
        .with_context(|| format!("Failed to load configuration: {}", config_path.display()))?;
    let mut env = BuildEnvironment::new(srcdir, &config);

    if let Some(cache) = &cache {
        env.load_inventory_cache(cache)
            .with_context(|| format!("Failed to read cache: {}", cache.display()))?;
    }

    let updated = load_mappings(&mut env, &config)?;
    info!(
        "{} intersphinx inventories registered{}",
        env.intersphinx().names().len(),
        if updated { "" } else { " (cache up to date)" }
    );

    if let Some(cache) = &cache {
        env.save_inventory_cache(cache)
            .with_context(|| format!("Failed to write cache: {}", cache.display()))?;
    }

    env.finish()?;
    Ok(())
}
