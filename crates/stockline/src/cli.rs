//! Clap derive structures for the `stockline` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// stockline -- inventory service client with offline fallback
#[derive(Debug, Parser)]
#[command(
    name = "stockline",
    version,
    about = "Query and manage a stockline inventory service from the command line",
    long_about = "A CLI for the stockline inventory service.\n\n\
        Direct commands talk to the service. `watch` and `sync` keep working\n\
        on the bundled catalog when the service is unconfigured or unreachable.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalOpts {
    /// Service profile to use
    #[arg(long, short = 'p', env = "STOCKLINE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Service base URL (overrides profile)
    #[arg(long, env = "STOCKLINE_API_URL", global = true)]
    pub api_url: Option<String>,

    /// API key
    #[arg(long, env = "STOCKLINE_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "STOCKLINE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "STOCKLINE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "STOCKLINE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Print the request history after the command
    #[arg(long, global = true)]
    pub show_requests: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the product catalog
    #[command(alias = "p")]
    Products(ProductsArgs),

    /// List and record stock movements
    #[command(alias = "mv")]
    Movements(MovementsArgs),

    /// Show open stock alerts
    Alerts(AlertsArgs),

    /// Show inventory statistics
    Stats,

    /// Inventory analytics reports
    Analytics(AnalyticsArgs),

    /// Resolve a data source with local fallback and print each update
    Watch(WatchArgs),

    /// Run the background sync loop
    Sync(SyncArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PRODUCTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ProductsArgs {
    #[command(subcommand)]
    pub command: ProductsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProductsCommand {
    /// List products
    #[command(alias = "ls")]
    List(ProductListArgs),

    /// Get product details
    Get {
        /// Product ID
        id: String,
    },

    /// Create a product
    Create(NewProductArgs),

    /// Update fields of a product
    Update {
        /// Product ID
        id: String,

        #[command(flatten)]
        fields: ProductUpdateArgs,
    },

    /// Delete a product
    #[command(alias = "rm")]
    Delete {
        /// Product ID
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct PageArgs {
    /// Page number (1-based)
    #[arg(long)]
    pub page: Option<u32>,

    /// Max results per page
    #[arg(long, short = 'l')]
    pub limit: Option<u32>,
}

#[derive(Debug, Args)]
pub struct ProductListArgs {
    #[command(flatten)]
    pub paging: PageArgs,

    /// Filter by category
    #[arg(long)]
    pub category: Option<String>,

    /// Filter by stock status
    #[arg(long, value_enum)]
    pub status: Option<StockStatusArg>,

    /// Free-text search on name and SKU
    #[arg(long, short = 's')]
    pub search: Option<String>,
}

#[derive(Debug, Args)]
pub struct NewProductArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub category: String,

    #[arg(long)]
    pub sku: String,

    /// Unit price
    #[arg(long)]
    pub price: f64,

    /// Units on hand
    #[arg(long, default_value = "0")]
    pub stock: u32,

    /// Reorder threshold
    #[arg(long, default_value = "0")]
    pub min_stock: u32,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub supplier: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProductUpdateArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub price: Option<f64>,

    #[arg(long)]
    pub stock: Option<u32>,

    #[arg(long)]
    pub min_stock: Option<u32>,

    #[arg(long, value_enum)]
    pub status: Option<StockStatusArg>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub supplier: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StockStatusArg {
    InStock,
    LowStock,
    OutOfStock,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MOVEMENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct MovementsArgs {
    #[command(subcommand)]
    pub command: MovementsCommand,
}

#[derive(Debug, Subcommand)]
pub enum MovementsCommand {
    /// List stock movements
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        paging: PageArgs,

        /// Only movements of this product
        #[arg(long)]
        product: Option<String>,

        /// Only movements of this type
        #[arg(long = "type", value_enum)]
        movement_type: Option<MovementTypeArg>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        until: Option<NaiveDate>,
    },

    /// Record a stock movement
    Record {
        /// Product ID
        #[arg(long)]
        product: String,

        /// Movement type
        #[arg(long = "type", value_enum)]
        movement_type: MovementTypeArg,

        /// Quantity (negative for outbound adjustments)
        #[arg(long, allow_negative_numbers = true)]
        quantity: i64,

        #[arg(long)]
        reason: String,

        /// Warehouse location
        #[arg(long)]
        location: String,

        /// Purchase order, installation order or transfer reference
        #[arg(long)]
        reference: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MovementTypeArg {
    In,
    Out,
    Adjustment,
    Transfer,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ALERTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AlertsArgs {
    /// Only critical alerts
    #[arg(long)]
    pub critical: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ANALYTICS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AnalyticsArgs {
    #[command(subcommand)]
    pub command: AnalyticsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AnalyticsCommand {
    /// Stock velocity per product
    Velocity {
        /// Averaging period
        #[arg(long, value_enum)]
        period: Option<VelocityPeriodArg>,

        /// Restrict to these products (comma-separated)
        #[arg(long, value_delimiter = ',')]
        products: Vec<String>,
    },

    /// Cost and margin per product
    Costs {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        until: Option<NaiveDate>,

        /// Restrict to these products (comma-separated)
        #[arg(long, value_delimiter = ',')]
        products: Vec<String>,
    },

    /// Supplier delivery performance
    Suppliers,

    /// Time series for a metric
    Trends {
        #[arg(long, value_enum, default_value = "sales")]
        metric: TrendMetricArg,

        #[arg(long, value_enum, default_value = "daily")]
        period: TrendPeriodArg,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        until: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VelocityPeriodArg {
    Week,
    Month,
    Quarter,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TrendMetricArg {
    Sales,
    Stock,
    Velocity,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TrendPeriodArg {
    Daily,
    Weekly,
    Monthly,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH / SYNC
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Data source to resolve
    #[arg(value_enum)]
    pub source: WatchSource,

    /// Exit after the first settled state
    #[arg(long)]
    pub once: bool,

    /// Stop watching after this long (e.g. "5m", "90s")
    #[arg(long = "for", value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WatchSource {
    Products,
    Movements,
    Stats,
    Alerts,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Stop the loop after this long (e.g. "10m")
    #[arg(long = "for", value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets redacted)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an API key in the system keyring
    SetKey {
        /// Profile name (defaults to the active profile)
        name: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
