//! partner-price - Partner purchase price calculator

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use partner_price_core::models::{PriceTable, Product, TableShape};
use partner_price_core::{
    export_price_table_to_csv, export_price_table_to_json, quote, LoadReport, PriceStore,
    SourceConfig, UsageKey,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "partner-price",
    version,
    about = "Partner purchase price calculator",
    long_about = "Estimates partner purchase cost for Moments, Conversations and Answers plans\n\
                  from the published CSV price sheets.\n\
                  \n\
                  Moments and Answers are priced by capacity threshold plus overage usage,\n\
                  Conversations by agent count (base price only).\n\
                  \n\
                  Examples:\n\
                    partner-price plans moments\n\
                    partner-price thresholds answers --plan Grow\n\
                    partner-price quote answers --plan Grow --threshold 1000 --usage 20\n\
                    partner-price quote conversations --plan Grow --agents 12\n\
                    partner-price export moments --output moments_long.csv\n\
                  \n\
                  Environment Variables:\n\
                    PARTNER_PRICE_CONFIG             # Config file path\n\
                    PARTNER_PRICE_BASE_URL           # Override price sheet location\n\
                    PARTNER_PRICE_NO_COLOR           # Disable ANSI colors\n\
                    RUST_LOG                         # Log filter (default: warn)"
)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Config file (default: <config dir>/partner-price/config.toml)
    #[arg(long, env = "PARTNER_PRICE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Base URL or directory of the price sheets
    #[arg(long, env = "PARTNER_PRICE_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Use cached sheets only, never the network
    #[arg(long, global = true)]
    offline: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, env = "PARTNER_PRICE_NO_COLOR", global = true)]
    no_color: bool,

    /// More logging (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Mode {
    /// Quote a plan selection
    Quote {
        /// moments, conversations or answers
        product: Product,
        /// Plan name (Start, Grow, Scale)
        #[arg(long)]
        plan: String,
        /// Capacity threshold (Moments, Answers)
        #[arg(long)]
        threshold: Option<f64>,
        /// Expected usage beyond the threshold (Moments, Answers)
        #[arg(long, default_value = "0")]
        usage: u64,
        /// Expected number of agents (Conversations)
        #[arg(long)]
        agents: Option<u32>,
    },
    /// List plans of a product
    Plans {
        product: Product,
    },
    /// List selectable thresholds of a plan
    Thresholds {
        product: Product,
        #[arg(long)]
        plan: String,
    },
    /// List agent brackets of a Conversations plan
    Brackets {
        #[arg(long)]
        plan: String,
    },
    /// Print a product's normalized price table
    Show {
        product: Product,
    },
    /// Write a product's normalized price table to a file
    Export {
        product: Product,
        /// Destination file (parent directories are created)
        #[arg(long, short)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },
    /// Re-fetch every price sheet and print the load report
    Refresh,
    /// Remove cached price sheets
    ClearCache,
    /// Print the effective configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

#[derive(Clone, Copy)]
struct Output {
    json: bool,
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.no_color);

    let mut config = SourceConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
        config.validate().context("Invalid --base-url")?;
    }
    tracing::debug!(base_url = %config.base_url, offline = cli.offline, "Effective configuration");

    let out = Output {
        json: cli.json,
        no_color: cli.no_color,
    };

    let store = PriceStore::new(config).with_offline(cli.offline);
    run(&store, cli.mode, out).await
}

async fn run(store: &PriceStore, mode: Mode, out: Output) -> Result<()> {
    match mode {
        Mode::Quote {
            product,
            plan,
            threshold,
            usage,
            agents,
        } => run_quote(store, product, &plan, threshold, usage, agents, out).await,
        Mode::Plans { product } => {
            let table = load_table(store, product, out).await?;
            println!("{}", cli::format_plans(product, &table.plans(), out.json));
            Ok(())
        }
        Mode::Thresholds { product, plan } => run_thresholds(store, product, &plan, out).await,
        Mode::Brackets { plan } => run_brackets(store, &plan, out).await,
        Mode::Show { product } => {
            let table = load_table(store, product, out).await?;
            println!(
                "{}",
                cli::format_price_table(product, &table, out.json, out.no_color)
            );
            Ok(())
        }
        Mode::Export {
            product,
            output,
            format,
        } => run_export(store, product, output, format, out).await,
        Mode::Refresh => run_refresh(store, out).await,
        Mode::ClearCache => run_clear_cache(store),
        Mode::Config => run_config(store.config(), out),
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

async fn run_quote(
    store: &PriceStore,
    product: Product,
    plan: &str,
    threshold: Option<f64>,
    usage: u64,
    agents: Option<u32>,
    out: Output,
) -> Result<()> {
    let key = match product.shape() {
        TableShape::ThresholdKeyed => {
            if agents.is_some() {
                bail!("--agents applies to Conversations only; {} takes --threshold and --usage", product);
            }
            let threshold = threshold.with_context(|| {
                format!(
                    "--threshold is required for {} (list them with `partner-price thresholds {} --plan {}`)",
                    product,
                    product.key(),
                    plan
                )
            })?;
            UsageKey::Threshold {
                threshold,
                quantity: usage,
            }
        }
        TableShape::BracketKeyed => {
            if threshold.is_some() || usage > 0 {
                bail!("{} is priced by agent count only; use --agents", product);
            }
            let agents = agents
                .with_context(|| format!("--agents is required for {}", product))?;
            UsageKey::Agents(agents)
        }
    };

    let table = load_table(store, product, out).await?;

    match quote(&table, plan, &key) {
        Ok(quote) => {
            println!("{}", cli::format_quote(product, &quote, out.json, out.no_color));
            Ok(())
        }
        Err(e) if e.is_recoverable() => {
            eprintln!("Warning: {}", e);
            eprintln!("{}", cli::format_choices(&table, plan));
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_thresholds(store: &PriceStore, product: Product, plan: &str, out: Output) -> Result<()> {
    let table = load_table(store, product, out).await?;
    let PriceTable::ThresholdKeyed(t) = table.as_ref() else {
        bail!(
            "{} is priced by agent count; use `partner-price brackets --plan {}`",
            product,
            plan
        );
    };

    let thresholds = t.thresholds_for(plan);
    println!("{}", cli::format_thresholds(plan, &thresholds, out.json));
    if thresholds.is_empty() && !out.json {
        eprintln!("{}", cli::format_choices(&table, plan));
    }
    Ok(())
}

async fn run_brackets(store: &PriceStore, plan: &str, out: Output) -> Result<()> {
    let table = load_table(store, Product::Conversations, out).await?;
    let PriceTable::BracketKeyed(t) = table.as_ref() else {
        bail!("Conversations sheet is not keyed by agent brackets");
    };

    let brackets = t.brackets_for(plan);
    println!(
        "{}",
        cli::format_brackets(plan, t.currencies(), &brackets, out.json, out.no_color)
    );
    if brackets.is_empty() && !out.json {
        eprintln!("{}", cli::format_choices(&table, plan));
    }
    Ok(())
}

async fn run_export(
    store: &PriceStore,
    product: Product,
    output: PathBuf,
    format: ExportFormat,
    out: Output,
) -> Result<()> {
    let table = load_table(store, product, out).await?;

    match format {
        ExportFormat::Csv => export_price_table_to_csv(product, &table, &output)?,
        ExportFormat::Json => export_price_table_to_json(product, &table, &output)?,
    }

    eprintln!(
        "✓ Exported {} rows of {} to {}",
        table.len(),
        product,
        output.display()
    );
    Ok(())
}

async fn run_refresh(store: &PriceStore, out: Output) -> Result<()> {
    if store.is_offline() {
        bail!("Cannot refresh in offline mode");
    }

    let spinner = spinner(out, "Fetching price sheets...");
    store.invalidate_all();
    let (book, report) = store.load_all(true).await;
    spinner.finish_and_clear();

    println!("{}", cli::format_report(&report, &book, out.json));

    if report.has_fatal_errors() {
        bail!("No price sheet could be loaded from {}", store.config().base_url);
    }
    Ok(())
}

fn run_clear_cache(store: &PriceStore) -> Result<()> {
    store.invalidate_all();
    let removed = store.clear_disk_cache()?;

    match store.disk_cache() {
        Some(cache) if removed > 0 => {
            println!("✓ Removed {} cached sheets", removed);
            println!("  Location: {}", cache.dir().display());
        }
        Some(cache) => println!("Nothing to clear in {}", cache.dir().display()),
        None => println!("No cache directory configured."),
    }
    Ok(())
}

fn run_config(config: &SourceConfig, out: Output) -> Result<()> {
    if out.json {
        println!(
            "{}",
            serde_json::to_string_pretty(config).context("Failed to serialize config")?
        );
        return Ok(());
    }

    if let Some(path) = SourceConfig::default_path() {
        println!("# default config path: {}", path.display());
    }
    if let Some(dir) = config.cache_dir() {
        println!("# cache directory: {}", dir.display());
    }
    for product in Product::ALL {
        println!("# {}: {}", product.key(), config.url_for(product));
    }
    println!();
    print!("{}", config.to_toml_string()?);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Load one product's table, printing load problems to stderr
async fn load_table(store: &PriceStore, product: Product, out: Output) -> Result<Arc<PriceTable>> {
    let spinner = spinner(out, format!("Loading {} prices...", product));
    let mut report = LoadReport::new();
    let result = store.load_checked(product, false, &mut report).await;
    spinner.finish_and_clear();

    for line in cli::format_problems(&report) {
        eprintln!("{}", line);
    }

    result.with_context(|| {
        format!(
            "Failed to load {} prices from {}",
            product,
            store.config().url_for(product)
        )
    })
}

fn spinner(out: Output, message: impl Into<std::borrow::Cow<'static, str>>) -> ProgressBar {
    if out.json {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
