use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "txload")]
#[command(about = "Fleet-wide transaction load test for ledger nodes", long_about = None)]
pub struct Cli {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where to write the run result
    #[arg(short, long)]
    pub result: Option<PathBuf>,

    /// Log filters, e.g. "debug" or "info,reqwest=warn,root=error"
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Also write rolling log files into this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Run against an in-process ledger instead of the configured nodes
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
