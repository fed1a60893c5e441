use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pwk_catalog::Catalog;
use pwk_config::{EntitlementConfig, LoadedConfig, UnusedKeyPolicy};
use pwk_entitlement::{EntitlementStore, JsonFileKv};
use tracing::{info, warn};

/// Comma-separated config paths used when no `--config` is given.
const ENV_CONFIG_PATHS: &str = "PWK_CONFIG";

#[derive(Parser)]
#[command(name = "pwk")]
#[command(about = "Paywall kit entitlement CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env -> local)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the persisted entitlement
    Status,

    /// Forget the persisted entitlement (back to free)
    Reset,

    /// List the configured plans with per-day cost and best value
    Plans {
        /// Emit JSON instead of key=value lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Fail when the merged config has keys nothing reads
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let paths = resolve_config_paths(cli.config_paths);

    match cli.cmd {
        Commands::Status => {
            let settings = load_settings(&paths)?;
            let store = open_store(&settings);
            println!("premium={}", store.current());
            println!("tier={}", store.tier());
            println!("key={}", store.key());
            println!("path={}", settings.storage.path);
        }

        Commands::Reset => {
            let settings = load_settings(&paths)?;
            let store = open_store(&settings);
            let changed = store.reset();
            println!("reset=true changed={changed}");
        }

        Commands::Plans { json } => {
            let settings = load_settings(&paths)?;
            let catalog = settings.catalog()?;
            if catalog.is_empty() {
                bail!("CONFIG_NO_CATALOG: no catalog entries configured");
            }
            if json {
                println!("{}", plans_json(&catalog)?);
            } else {
                print_plans(&catalog);
            }
        }

        Commands::ConfigHash { strict } => {
            if paths.is_empty() {
                bail!("no config paths: pass --config or set {ENV_CONFIG_PATHS}");
            }
            let loaded = load(&paths)?;
            let policy = if strict {
                UnusedKeyPolicy::Fail
            } else {
                UnusedKeyPolicy::Warn
            };
            pwk_config::report_unused_keys(&loaded.config_json, policy)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `--config` wins; otherwise `PWK_CONFIG` (comma separated); otherwise none.
fn resolve_config_paths(from_args: Vec<String>) -> Vec<String> {
    if !from_args.is_empty() {
        return from_args;
    }
    std::env::var(ENV_CONFIG_PATHS)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn load(paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    pwk_config::load_layered_yaml(&path_refs)
}

/// Typed settings; built-in defaults when no config is given.
fn load_settings(paths: &[String]) -> Result<EntitlementConfig> {
    if paths.is_empty() {
        return Ok(EntitlementConfig::default());
    }
    let loaded = load(paths)?;
    let report = pwk_config::report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "config has keys nothing reads");
    }
    info!(config_hash = %loaded.config_hash, "config loaded");
    let settings = loaded.settings()?;
    settings.validate()?;
    Ok(settings)
}

fn open_store(settings: &EntitlementConfig) -> EntitlementStore {
    let kv = JsonFileKv::new(Path::new(&settings.storage.path));
    EntitlementStore::open(Arc::new(kv), settings.storage.key.clone())
}

fn print_plans(catalog: &Catalog) {
    for p in catalog.sorted_by_price() {
        println!(
            "plan id={} name={:?} price={:?} billed={} per_day={:.4} free_trial={}",
            p.id,
            p.display_name,
            p.price_per_period(),
            p.period.adjective(),
            p.cost_per_day(),
            p.intro_offer_is_free
        );
    }
    if let Some(best) = catalog.best_value() {
        match best.savings_percent {
            Some(pct) => println!("best_value={} savings_percent={pct}", best.product.id),
            None => println!("best_value={}", best.product.id),
        }
    }
}

fn plans_json(catalog: &Catalog) -> Result<String> {
    let best = catalog.best_value();
    let doc = serde_json::json!({
        "plans": catalog.sorted_by_price(),
        "best_value": best.as_ref().map(|b| b.product.id.as_str()),
        "savings_percent": best.as_ref().and_then(|b| b.savings_percent),
    });
    serde_json::to_string_pretty(&doc).context("plans json serialize failed")
}
