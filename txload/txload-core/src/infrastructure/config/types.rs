use crate::domain::{NodeEndpoint, NodeIdentity, Participant, RetryPolicy, Role, StabilizationPolicy, WalletAddress};
use crate::foundation::{
    NodeId, DEFAULT_PREPARE_COOLDOWN_SECS, DEFAULT_PROGRESS_EVERY, DEFAULT_SENDER_ATTEMPTS, DEFAULT_SENDER_BACKOFF_STEP_SECS,
    DEFAULT_SETTLE_DELAY_SECS, DEFAULT_SIGN_ATTEMPTS, DEFAULT_STABILIZE_ATTEMPTS, DEFAULT_STABILIZE_BACKOFF_STEP_SECS,
};
use crate::infrastructure::rpc::NodeClientOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One participant node as written in the config file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub ip: String,
    pub port: String,
    pub id: String,
    #[serde(default)]
    pub signature: String,
    pub address_base: String,
    pub key_identifier: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingConfig {
    /// Pause after the funding transaction before the first balance poll.
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
    #[serde(default = "default_stabilize_attempts")]
    pub max_attempts: u32,
    /// Round `n` waits `n * backoff_step_secs` first.
    #[serde(default = "default_stabilize_backoff_step_secs")]
    pub backoff_step_secs: u64,
    /// Funder's own readiness wait before it spends.
    #[serde(default = "default_sender_attempts")]
    pub sender_max_attempts: u32,
    #[serde(default = "default_sender_backoff_step_secs")]
    pub sender_backoff_step_secs: u64,
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: DEFAULT_SETTLE_DELAY_SECS,
            max_attempts: DEFAULT_STABILIZE_ATTEMPTS,
            backoff_step_secs: DEFAULT_STABILIZE_BACKOFF_STEP_SECS,
            sender_max_attempts: DEFAULT_SENDER_ATTEMPTS,
            sender_backoff_step_secs: DEFAULT_SENDER_BACKOFF_STEP_SECS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationConfig {
    #[serde(default = "default_prepare_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for PreparationConfig {
    fn default() -> Self {
        Self { cooldown_secs: DEFAULT_PREPARE_COOLDOWN_SECS }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_sign_attempts")]
    pub sign_attempts: u32,
    #[serde(default)]
    pub sign_backoff_millis: u64,
    /// Each worker asks its node for a fresh address before draining the queue.
    #[serde(default = "default_true")]
    pub fresh_worker_address: bool,
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { sign_attempts: DEFAULT_SIGN_ATTEMPTS, sign_backoff_millis: 0, fresh_worker_address: true, progress_every: DEFAULT_PROGRESS_EVERY }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeClientConfig {
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for NodeClientConfig {
    fn default() -> Self {
        Self { accept_invalid_certs: true, request_timeout_secs: None }
    }
}

/// Full load run configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// The first node funds the others.
    pub nodes: Vec<NodeConfig>,
    pub transactions_per_node: u64,
    pub outputs_per_transaction: u64,
    pub worker_count: usize,
    pub receiver_address_base: String,
    pub receiver_key_identifier: String,
    pub funding: FundingConfig,
    pub preparation: PreparationConfig,
    pub dispatch: DispatchConfig,
    pub node_client: NodeClientConfig,
}

impl LoadConfig {
    pub fn participants(&self) -> Vec<Participant> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| Participant {
                endpoint: NodeEndpoint { host: node.ip.clone(), port: node.port.clone() },
                identity: NodeIdentity { id: NodeId::from(node.id.as_str()), signature: node.signature.clone() },
                wallet: WalletAddress::new(node.address_base.clone(), node.key_identifier.clone()),
                role: if index == 0 { Role::Funder } else { Role::Participant },
            })
            .collect()
    }

    pub fn receiver(&self) -> WalletAddress {
        WalletAddress::new(self.receiver_address_base.clone(), self.receiver_key_identifier.clone())
    }

    pub fn stabilization(&self) -> StabilizationPolicy {
        StabilizationPolicy {
            settle_delay: Duration::from_secs(self.funding.settle_delay_secs),
            rounds: RetryPolicy::linear(self.funding.max_attempts, Duration::from_secs(self.funding.backoff_step_secs)),
        }
    }

    pub fn sender_readiness(&self) -> RetryPolicy {
        RetryPolicy::linear(self.funding.sender_max_attempts, Duration::from_secs(self.funding.sender_backoff_step_secs))
    }

    pub fn prepare_cooldown(&self) -> Duration {
        Duration::from_secs(self.preparation.cooldown_secs)
    }

    pub fn sign_policy(&self) -> RetryPolicy {
        match self.dispatch.sign_backoff_millis {
            0 => RetryPolicy::immediate(self.dispatch.sign_attempts),
            millis => RetryPolicy::new(self.dispatch.sign_attempts, crate::domain::Backoff::Fixed(Duration::from_millis(millis))),
        }
    }

    pub fn node_client_options(&self) -> NodeClientOptions {
        NodeClientOptions {
            accept_invalid_certs: self.node_client.accept_invalid_certs,
            request_timeout: self.node_client.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_settle_delay_secs() -> u64 {
    DEFAULT_SETTLE_DELAY_SECS
}

const fn default_stabilize_attempts() -> u32 {
    DEFAULT_STABILIZE_ATTEMPTS
}

const fn default_stabilize_backoff_step_secs() -> u64 {
    DEFAULT_STABILIZE_BACKOFF_STEP_SECS
}

const fn default_sender_attempts() -> u32 {
    DEFAULT_SENDER_ATTEMPTS
}

const fn default_sender_backoff_step_secs() -> u64 {
    DEFAULT_SENDER_BACKOFF_STEP_SECS
}

const fn default_prepare_cooldown_secs() -> u64 {
    DEFAULT_PREPARE_COOLDOWN_SECS
}

const fn default_sign_attempts() -> u32 {
    DEFAULT_SIGN_ATTEMPTS
}

const fn default_progress_every() -> u64 {
    DEFAULT_PROGRESS_EVERY
}
