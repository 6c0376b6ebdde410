use crate::foundation::{NodeId, ShardId, TransactionId, ADDRESS_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Wallet address split into the parts the node API works with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletAddress {
    pub base: String,
    pub key_identifier: String,
}

impl WalletAddress {
    pub fn new(base: impl Into<String>, key_identifier: impl Into<String>) -> Self {
        Self { base: base.into(), key_identifier: key_identifier.into() }
    }

    /// Full address string: `{base}lal{key_identifier}`.
    pub fn address(&self) -> String {
        format!("{}{}{}", self.base, ADDRESS_VERSION, self.key_identifier)
    }

    /// Address that receives change: the node books change under the key identifier in both parts.
    pub fn change_address(&self) -> WalletAddress {
        WalletAddress { base: self.key_identifier.clone(), key_identifier: self.key_identifier.clone() }
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.base, ADDRESS_VERSION, self.key_identifier)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Funder,
    Participant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEndpoint {
    pub host: String,
    pub port: String,
}

impl fmt::Display for NodeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub id: NodeId,
    pub signature: String,
}

/// A node/wallet pair driven by the load run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub endpoint: NodeEndpoint,
    pub identity: NodeIdentity,
    pub wallet: WalletAddress,
    pub role: Role,
}

impl Participant {
    pub fn address(&self) -> String {
        self.wallet.address()
    }

    pub fn is_funder(&self) -> bool {
        self.role == Role::Funder
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub transaction_id: TransactionId,
    pub shard_id: ShardId,
    pub output_position: u32,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub address_base: String,
    #[serde(default)]
    pub address_key_identifier: String,
    pub amount: u64,
    #[serde(default)]
    pub transaction_date: u64,
    #[serde(default)]
    pub address_version: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub address_base: String,
    pub address_key_identifier: String,
    pub address_version: String,
    pub output_position: u32,
    pub output_transaction_date: u64,
    pub output_transaction_id: TransactionId,
    pub output_shard_id: ShardId,
    pub input_position: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub address_base: String,
    pub address_version: String,
    pub address_key_identifier: String,
    pub amount: u64,
}

impl TransactionOutput {
    pub fn to(wallet: &WalletAddress, amount: u64) -> Self {
        Self {
            address_base: wallet.base.clone(),
            address_version: ADDRESS_VERSION.to_string(),
            address_key_identifier: wallet.key_identifier.clone(),
            amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub transaction_version: String,
    pub transaction_output_list: Vec<TransactionOutput>,
    pub transaction_input_list: Vec<TransactionInput>,
}

impl UnsignedTransaction {
    pub fn inputs(&self) -> &[TransactionInput] {
        &self.transaction_input_list
    }

    pub fn outputs(&self) -> &[TransactionOutput] {
        &self.transaction_output_list
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOutput {
    pub output_position: u32,
    pub address_base: String,
    pub address_key_identifier: String,
    pub amount: u64,
    pub address_version: String,
}

/// Transaction as returned by the node's signing endpoint.
///
/// Treated as opaque apart from its id, shard and outputs, which seed chained spends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction_id: TransactionId,
    #[serde(default, rename = "transaction_input_list")]
    pub inputs: Vec<TransactionInput>,
    #[serde(default, rename = "transaction_output_list")]
    pub outputs: Vec<SignedOutput>,
    #[serde(default, rename = "transaction_signature_list")]
    pub signatures: Vec<serde_json::Value>,
    #[serde(default, rename = "transaction_parent_list")]
    pub parents: Vec<String>,
    #[serde(default)]
    pub payload_hash: String,
    #[serde(default)]
    pub transaction_date: String,
    pub shard_id: ShardId,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub node_id_origin: String,
}

impl SignedTransaction {
    pub fn id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn output_at(&self, position: u32) -> Option<&SignedOutput> {
        self.outputs.iter().find(|out| out.output_position == position)
    }
}

/// Signing keys for one participant, scoped to a single run.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct KeyMaterial {
    private_keys: BTreeMap<String, String>,
    public_keys: BTreeMap<String, String>,
}

impl KeyMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Private key under the address key identifier, public key under the base address.
    pub fn insert(&mut self, key_identifier: impl Into<String>, private_key: impl Into<String>, base: impl Into<String>, public_key: impl Into<String>) {
        self.private_keys.insert(key_identifier.into(), private_key.into());
        self.public_keys.insert(base.into(), public_key.into());
    }

    pub fn private_keys(&self) -> &BTreeMap<String, String> {
        &self.private_keys
    }

    pub fn public_keys(&self) -> &BTreeMap<String, String> {
        &self.public_keys
    }

    pub fn private_key(&self, key_identifier: &str) -> Option<&str> {
        self.private_keys.get(key_identifier).map(String::as_str)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("private_keys", &self.private_keys.keys().collect::<Vec<_>>())
            .field("public_keys", &self.public_keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub address: String,
    pub address_base: String,
    #[serde(default)]
    pub address_version: String,
    pub address_key_identifier: String,
    #[serde(default)]
    pub public_key: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub stable: u64,
    pub unstable: u64,
}

impl Balance {
    /// Settled and funded.
    pub fn is_ready(&self) -> bool {
        self.unstable == 0 && self.stable > 0
    }
}

/// One destination and amount for a transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub to: WalletAddress,
    pub amount: u64,
}

impl Payment {
    pub fn new(to: WalletAddress, amount: u64) -> Self {
        Self { to, amount }
    }
}

/// One preparation round: its signed transaction and the positions of its unit outputs.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedBatch {
    pub transaction: SignedTransaction,
    pub unit_positions: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DispatchReport {
    pub queued: usize,
    pub succeeded: u64,
    pub elapsed: Duration,
    pub tps: f64,
}

/// The run's only persisted artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "total_transaction_count")]
    pub total_transactions: u64,
    pub node_count: u64,
    pub achieved_tps: f64,
}
