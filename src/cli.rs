use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::logging::LogFormat;
use crate::types::{DEFAULT_PARAMETER_FILE, DEFAULT_SOURCE_FILE, DEFAULT_TEMPLATE_DELIMITER};

/// Validate and clean a CSV data table against a parameter table
#[derive(Parser, Debug)]
#[command(name = "datatidy")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Cleaning arguments used when no subcommand is given
    #[command(flatten)]
    pub clean: CleanArgs,

    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormatArg::Pretty, global = true)]
    pub log_format: LogFormatArg,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a source table and split it into clean and outlier files
    Clean(CleanArgs),

    /// Convert timestamps into fuzzed offsets from the earliest one
    Offsets {
        /// File with one timestamp per line
        input: PathBuf,

        /// Output CSV file path
        #[arg(short, long)]
        out: PathBuf,

        /// strftime layout of the timestamps
        #[arg(long, default_value = crate::types::DEFAULT_TIMESTAMP_FORMAT)]
        format: String,

        /// Largest random fuzz added to each offset, in seconds
        #[arg(long, default_value_t = 0.0)]
        max_fuzz: f64,

        /// Seed for reproducible fuzz
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Rearrange a data table's columns to match a header template
    Reorder {
        /// Data file
        data: PathBuf,

        /// File whose first row is the target header
        header: PathBuf,

        /// Output CSV file path
        #[arg(short, long)]
        out: PathBuf,

        /// Delimiter of the data and header files
        #[arg(short, long, default_value_t = DEFAULT_TEMPLATE_DELIMITER)]
        delimiter: char,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    /// Source data table (CSV)
    #[arg(default_value = DEFAULT_SOURCE_FILE)]
    pub source: PathBuf,

    /// Parameter table (CSV, TSV or Excel)
    #[arg(default_value = DEFAULT_PARAMETER_FILE)]
    pub parameters: PathBuf,

    /// Directory for the output files
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Treat unknown data types as always-failing columns instead of aborting
    #[arg(long, default_value_t = false)]
    pub lenient_types: bool,

    /// Write a JSON run summary to this path ("-" for stdout)
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Skip the SHA-256 digest of the source file
    #[arg(long, default_value_t = false)]
    pub no_hash: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}
