//! Layered configuration loading with Figment.
//!
//! Precedence (lowest to highest):
//! 1. Compiled section defaults
//! 2. TOML or JSON config file, picked by extension
//! 3. Environment variables (`TXLOAD_` prefix, `__` between nesting levels)

use crate::foundation::{LoadError, Result};
use crate::infrastructure::config::types::{DispatchConfig, FundingConfig, LoadConfig, NodeClientConfig, NodeConfig, PreparationConfig};
use figment::providers::{Env, Format, Json, Serialized, Toml};
use figment::Figment;
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;

/// Example: `TXLOAD_DISPATCH__SIGN_ATTEMPTS` -> `dispatch.sign_attempts`
pub const ENV_PREFIX: &str = "TXLOAD_";

#[derive(Clone, Debug, Default, Deserialize)]
struct LoadConfigRaw {
    #[serde(default)]
    nodes: Vec<NodeConfig>,
    #[serde(default)]
    transactions_per_node: u64,
    #[serde(default)]
    outputs_per_transaction: u64,
    #[serde(default)]
    worker_count: Option<usize>,
    /// Older configs name the worker pool size after goroutines.
    #[serde(default)]
    goroutine_count: Option<usize>,
    #[serde(default)]
    receiver_address_base: String,
    #[serde(default)]
    receiver_key_identifier: String,
    #[serde(default)]
    funding: FundingConfig,
    #[serde(default)]
    preparation: PreparationConfig,
    #[serde(default)]
    dispatch: DispatchConfig,
    #[serde(default)]
    node_client: NodeClientConfig,
}

/// Loads `path` layered over defaults and the environment. Does not validate.
pub fn load_config_from_file(path: &Path) -> Result<LoadConfig> {
    info!("loading configuration path={}", path.display());
    let figment = figment_base(path).merge(Env::prefixed(ENV_PREFIX).split("__"));
    let raw: LoadConfigRaw = figment.extract()?;
    let config = convert_raw(raw);
    debug!(
        "configuration loaded nodes={} transactions_per_node={} outputs_per_transaction={} worker_count={}",
        config.nodes.len(),
        config.transactions_per_node,
        config.outputs_per_transaction,
        config.worker_count
    );
    Ok(config)
}

/// [`load_config_from_file`] followed by [`LoadConfig::validate`].
pub fn load_config(path: &Path) -> Result<LoadConfig> {
    let config = load_config_from_file(path)?;
    config.validate().map_err(|errors| LoadError::ConfigError(format!("validation failed: {}", errors.join("; "))))?;
    Ok(config)
}

fn figment_base(path: &Path) -> Figment {
    let figment = Figment::new()
        .merge(Serialized::default("funding", FundingConfig::default()))
        .merge(Serialized::default("preparation", PreparationConfig::default()))
        .merge(Serialized::default("dispatch", DispatchConfig::default()))
        .merge(Serialized::default("node_client", NodeClientConfig::default()));
    if !path.exists() {
        debug!("configuration file missing; using defaults and env only path={}", path.display());
        return figment;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => figment.merge(Json::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}

fn convert_raw(raw: LoadConfigRaw) -> LoadConfig {
    LoadConfig {
        nodes: raw.nodes,
        transactions_per_node: raw.transactions_per_node,
        outputs_per_transaction: raw.outputs_per_transaction,
        worker_count: raw.worker_count.or(raw.goroutine_count).unwrap_or_default(),
        receiver_address_base: raw.receiver_address_base,
        receiver_key_identifier: raw.receiver_key_identifier,
        funding: raw.funding,
        preparation: raw.preparation,
        dispatch: raw.dispatch,
        node_client: raw.node_client,
    }
}
