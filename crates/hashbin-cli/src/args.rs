use clap::{Parser, Subcommand};

/// Upper bound for `--*-expiry-days` (about a century).
pub const MAX_EXPIRY_DAYS: i64 = 36_500;

#[derive(Parser, Debug, Clone)]
#[command(name = "hashbin", version, about = "Hash bin delegation metadata tool")]
pub struct Cli {
    /// Emit JSON output on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines on stderr (filter with RUST_LOG).
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate the delegating key and the shared bin key.
    Keygen {
        /// Directory to write `bins.key` and `bin-n.key` into.
        #[arg(long, default_value = "./keys")]
        out: String,
        /// Overwrite existing key files.
        #[arg(long)]
        force: bool,
    },

    /// List bins and the hash prefixes each one serves.
    Bins {
        /// Number of bins (power of two).
        #[arg(long, default_value_t = 32)]
        count: u32,
    },

    /// Print the bin responsible for each target path.
    Assign {
        #[arg(long, default_value_t = 32)]
        count: u32,
        /// Target paths as they will appear in metadata.
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Build, sign and write delegation metadata for a directory of targets.
    Build {
        #[arg(long, default_value_t = 32)]
        count: u32,
        /// Directory whose files become targets (paths relative to it).
        #[arg(long)]
        targets: String,
        /// Output directory for `<role>.json` files.
        #[arg(long, default_value = "./metadata")]
        out: String,
        /// Key directory from `hashbin keygen`; fresh keys are generated if omitted.
        #[arg(long)]
        keys: Option<String>,
        /// Lifetime of the delegating document, in days.
        #[arg(long, default_value_t = 365, value_parser = clap::value_parser!(i64).range(1..=MAX_EXPIRY_DAYS))]
        parent_expiry_days: i64,
        /// Lifetime of each bin document, in days.
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(i64).range(1..=MAX_EXPIRY_DAYS))]
        bin_expiry_days: i64,
        /// Store attempts per document before giving up.
        #[arg(long, default_value_t = 3)]
        attempts: u32,
    },
}
