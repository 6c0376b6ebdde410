use log::{info, warn};
use std::path::{Path, PathBuf};
use txload_core::foundation::Result;
use txload_core::infrastructure::config::{load_config, resolve_config_path, resolve_result_path, LoadConfig};
use txload_core::infrastructure::logging::init_logger;

use crate::cli::Cli;

pub fn init_logging(args: &Cli) -> Result<()> {
    init_logger(args.log_dir.as_deref(), &args.log_level)
}

pub fn paths(args: &Cli) -> (PathBuf, PathBuf) {
    (resolve_config_path(args.config.as_deref()), resolve_result_path(args.result.as_deref()))
}

pub fn load_run_config(path: &Path) -> Result<LoadConfig> {
    let config = load_config(path)?;
    if config.outputs_per_transaction > 0 && config.transactions_per_node % config.outputs_per_transaction != 0 {
        warn!(
            "transactions_per_node is not a multiple of outputs_per_transaction; the remainder is not sent transactions_per_node={} outputs_per_transaction={}",
            config.transactions_per_node,
            config.outputs_per_transaction
        );
    }
    if !config.node_client.accept_invalid_certs {
        info!("node TLS certificates will be verified");
    }
    Ok(config)
}
