//! Deterministic in-process ledger for tests and dry runs.
//!
//! Transaction ids are derived from the unsigned transaction content, so identical work produces
//! identical ids regardless of scheduling. New outputs stay unstable for a configurable number of
//! balance polls of their owner.

use crate::domain::{AddressInfo, Balance, KeyMaterial, SignedOutput, SignedTransaction, UnsignedTransaction, UnspentOutput, WalletAddress};
use crate::foundation::{LoadError, NodeId, Result, ShardId, TransactionId, ADDRESS_VERSION};
use crate::infrastructure::rpc::NodeApi;
use async_trait::async_trait;
use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const DEFAULT_SHARD: &str = "memory-shard";
const STATUS_FAIL: &str = "fail";

type OutputKey = (TransactionId, u32);

#[derive(Clone, Debug)]
struct LedgerOutput {
    utxo: UnspentOutput,
    pending_polls: u32,
}

struct LedgerInner {
    outputs: BTreeMap<OutputKey, LedgerOutput>,
    spent: BTreeSet<OutputKey>,
    wallets: HashMap<String, WalletAddress>,
    signed: HashMap<TransactionId, (SignedTransaction, Vec<OutputKey>)>,
    submitted: Vec<TransactionId>,
    clock: u64,
    address_seq: u64,
}

/// Ledger state shared by every [`MemoryNode`] of a run.
pub struct MemoryLedger {
    inner: Mutex<LedgerInner>,
    shard: ShardId,
    settlement_polls: u32,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_settlement_polls(0)
    }

    /// Outputs report as unstable for their owner's first `polls` balance queries.
    pub fn with_settlement_polls(polls: u32) -> Self {
        Self {
            inner: Mutex::new(LedgerInner {
                outputs: BTreeMap::new(),
                spent: BTreeSet::new(),
                wallets: HashMap::new(),
                signed: HashMap::new(),
                submitted: Vec::new(),
                clock: 0,
                address_seq: 0,
            }),
            shard: ShardId::from(DEFAULT_SHARD),
            settlement_polls: polls,
        }
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, LedgerInner>> {
        self.inner.lock().map_err(|_| LoadError::Message("memory ledger lock poisoned".to_string()))
    }

    pub fn register_wallet(&self, wallet: &WalletAddress) -> Result<()> {
        let mut inner = self.lock_inner()?;
        inner.wallets.insert(wallet.address(), wallet.clone());
        inner.wallets.insert(wallet.change_address().address(), wallet.change_address());
        Ok(())
    }

    /// Credits `wallet` with one settled genesis output.
    pub fn fund(&self, wallet: &WalletAddress, amount: u64) -> Result<TransactionId> {
        self.register_wallet(wallet)?;
        let mut inner = self.lock_inner()?;
        inner.clock += 1;
        let id = content_id(&["genesis", &wallet.address(), &amount.to_string(), &inner.clock.to_string()]);
        let utxo = UnspentOutput {
            transaction_id: id.clone(),
            shard_id: self.shard.clone(),
            output_position: 0,
            address: wallet.address(),
            address_base: wallet.base.clone(),
            address_key_identifier: wallet.key_identifier.clone(),
            amount,
            transaction_date: inner.clock,
            address_version: ADDRESS_VERSION.to_string(),
        };
        inner.outputs.insert((id.clone(), 0), LedgerOutput { utxo, pending_polls: 0 });
        Ok(id)
    }

    /// Ids of accepted transactions, in submission order.
    pub fn submitted(&self) -> Vec<TransactionId> {
        self.lock_inner().map(|inner| inner.submitted.clone()).unwrap_or_default()
    }

    pub fn transaction(&self, id: &TransactionId) -> Option<SignedTransaction> {
        self.lock_inner().ok().and_then(|inner| inner.signed.get(id).map(|(tx, _)| tx.clone()))
    }

    /// Unspent total owned by `key_identifier`, settled or not.
    pub fn holdings(&self, key_identifier: &str) -> u64 {
        self.lock_inner()
            .map(|inner| inner.outputs.values().filter(|out| out.utxo.address_key_identifier == key_identifier).map(|out| out.utxo.amount).sum())
            .unwrap_or_default()
    }

    fn key_identifier_of(inner: &LedgerInner, address: &str) -> Option<String> {
        inner.wallets.get(address).map(|wallet| wallet.key_identifier.clone())
    }

    fn balance(&self, address: &str) -> Result<Balance> {
        let mut inner = self.lock_inner()?;
        let Some(kid) = Self::key_identifier_of(&inner, address) else {
            return Ok(Balance::default());
        };
        let mut balance = Balance::default();
        for output in inner.outputs.values_mut().filter(|out| out.utxo.address_key_identifier == kid) {
            if output.pending_polls > 0 {
                output.pending_polls -= 1;
                balance.unstable += output.utxo.amount;
            } else {
                balance.stable += output.utxo.amount;
            }
        }
        Ok(balance)
    }

    fn unspent(&self, key_identifier: &str) -> Result<Vec<UnspentOutput>> {
        let inner = self.lock_inner()?;
        Ok(inner.outputs.values().filter(|out| out.utxo.address_key_identifier == key_identifier).map(|out| out.utxo.clone()).collect())
    }

    fn wallet(&self, address: &str) -> Result<WalletAddress> {
        let inner = self.lock_inner()?;
        inner.wallets.get(address).cloned().ok_or_else(|| LoadError::rejected("address lookup", format!("unknown address {address}")))
    }

    fn new_address(&self, node: &NodeId) -> Result<WalletAddress> {
        let seq = {
            let mut inner = self.lock_inner()?;
            inner.address_seq += 1;
            inner.address_seq
        };
        let kid = format!("{node}-addr-{seq}");
        let wallet = WalletAddress::new(kid.clone(), kid);
        self.register_wallet(&wallet)?;
        Ok(wallet)
    }

    fn sign(&self, node: &NodeId, tx: &UnsignedTransaction, keys: &KeyMaterial) -> Result<SignedTransaction> {
        for input in tx.inputs() {
            let expected = private_key_for(&input.address_key_identifier);
            if keys.private_key(&input.address_key_identifier) != Some(expected.as_str()) {
                return Err(LoadError::rejected("sign_transaction", STATUS_FAIL));
            }
        }
        let body = serde_json::to_string(tx)?;
        let id = content_id(&["tx", &body]);
        let mut inner = self.lock_inner()?;
        inner.clock += 1;
        let signed = SignedTransaction {
            transaction_id: id.clone(),
            inputs: tx.inputs().to_vec(),
            outputs: tx
                .outputs()
                .iter()
                .zip(0u32..)
                .map(|(out, position)| SignedOutput {
                    output_position: position,
                    address_base: out.address_base.clone(),
                    address_key_identifier: out.address_key_identifier.clone(),
                    amount: out.amount,
                    address_version: out.address_version.clone(),
                })
                .collect(),
            signatures: Vec::new(),
            parents: Vec::new(),
            payload_hash: hex::encode(blake3::hash(body.as_bytes()).as_bytes()),
            transaction_date: inner.clock.to_string(),
            shard_id: self.shard.clone(),
            version: tx.transaction_version.clone(),
            node_id_origin: node.to_string(),
        };
        let spends = tx.inputs().iter().map(|input| (input.output_transaction_id.clone(), input.output_position)).collect();
        inner.signed.insert(id, (signed.clone(), spends));
        Ok(signed)
    }

    fn submit(&self, tx: &SignedTransaction) -> Result<()> {
        let mut inner = self.lock_inner()?;
        let Some((_, spends)) = inner.signed.get(tx.id()).cloned() else {
            return Err(LoadError::rejected("submit_transaction", STATUS_FAIL));
        };
        if spends.iter().any(|key| !inner.outputs.contains_key(key) || inner.spent.contains(key)) {
            trace!("memory ledger double spend tx_id={}", tx.id());
            return Err(LoadError::rejected("submit_transaction", STATUS_FAIL));
        }
        let input_total: u64 = spends.iter().filter_map(|key| inner.outputs.get(key)).map(|out| out.utxo.amount).sum();
        let output_total: u64 = tx.outputs.iter().map(|out| out.amount).sum();
        if input_total != output_total {
            return Err(LoadError::rejected("submit_transaction", STATUS_FAIL));
        }
        for key in spends {
            inner.outputs.remove(&key);
            inner.spent.insert(key);
        }
        let date = tx.transaction_date.parse().unwrap_or(inner.clock);
        for out in &tx.outputs {
            let owner = WalletAddress::new(out.address_base.clone(), out.address_key_identifier.clone());
            let utxo = UnspentOutput {
                transaction_id: tx.transaction_id.clone(),
                shard_id: tx.shard_id.clone(),
                output_position: out.output_position,
                address: owner.address(),
                address_base: owner.base,
                address_key_identifier: owner.key_identifier,
                amount: out.amount,
                transaction_date: date,
                address_version: out.address_version.clone(),
            };
            inner.outputs.insert((tx.transaction_id.clone(), out.output_position), LedgerOutput { utxo, pending_polls: self.settlement_polls });
        }
        inner.submitted.push(tx.transaction_id.clone());
        Ok(())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn content_id(parts: &[&str]) -> TransactionId {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(&[0]);
    }
    TransactionId::new(hex::encode(&hasher.finalize().as_bytes()[..16]))
}

fn private_key_for(key_identifier: &str) -> String {
    hex::encode(blake3::hash(format!("private/{key_identifier}").as_bytes()).as_bytes())
}

fn public_key_for(key_identifier: &str) -> String {
    hex::encode(blake3::hash(format!("public/{key_identifier}").as_bytes()).as_bytes())
}

/// Failures a [`MemoryNode`] injects into its responses.
#[derive(Clone, Debug, Default)]
pub struct NodeFaults {
    /// Node id reported by `verify_identity` instead of the real one.
    pub reported_id: Option<NodeId>,
    /// Number of upcoming balance queries that fail with a transport error.
    pub balance_errors: u32,
    /// Every distinct transaction is rejected on its first `n` signing attempts.
    pub sign_rejections: u32,
    /// Transactions spending any of these output positions are never signed.
    pub unsignable_positions: BTreeSet<u32>,
    /// Submissions past this many accepted ones come back with a failure status.
    pub submit_limit: Option<u64>,
    pub fail_new_address: bool,
}

/// One participant's view of a [`MemoryLedger`].
pub struct MemoryNode {
    ledger: Arc<MemoryLedger>,
    node_id: NodeId,
    faults: Mutex<NodeFaults>,
    sign_attempts: Mutex<HashMap<String, u32>>,
    accepted: AtomicU64,
}

impl MemoryNode {
    pub fn new(ledger: Arc<MemoryLedger>, node_id: impl Into<NodeId>) -> Self {
        Self::with_faults(ledger, node_id, NodeFaults::default())
    }

    pub fn with_faults(ledger: Arc<MemoryLedger>, node_id: impl Into<NodeId>, faults: NodeFaults) -> Self {
        Self {
            ledger,
            node_id: node_id.into(),
            faults: Mutex::new(faults),
            sign_attempts: Mutex::new(HashMap::new()),
            accepted: AtomicU64::new(0),
        }
    }

    pub fn ledger(&self) -> &Arc<MemoryLedger> {
        &self.ledger
    }

    /// Swaps the injected faults; later calls see the new set.
    pub fn set_faults(&self, faults: NodeFaults) -> Result<()> {
        *self.faults()? = faults;
        Ok(())
    }

    /// Submissions this node accepted.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::SeqCst)
    }

    fn faults(&self) -> Result<MutexGuard<'_, NodeFaults>> {
        self.faults.lock().map_err(|_| LoadError::Message("memory node fault lock poisoned".to_string()))
    }

    fn should_reject_sign(&self, tx: &UnsignedTransaction) -> Result<bool> {
        let faults = self.faults()?.clone();
        if tx.inputs().iter().any(|input| faults.unsignable_positions.contains(&input.output_position)) {
            return Ok(true);
        }
        if faults.sign_rejections == 0 {
            return Ok(false);
        }
        let key = serde_json::to_string(tx)?;
        let mut attempts = self.sign_attempts.lock().map_err(|_| LoadError::Message("memory node sign lock poisoned".to_string()))?;
        let seen = attempts.entry(key).or_insert(0);
        *seen += 1;
        Ok(*seen <= faults.sign_rejections)
    }
}

#[async_trait]
impl NodeApi for MemoryNode {
    async fn verify_identity(&self) -> Result<()> {
        let reported = self.faults()?.reported_id.clone().unwrap_or_else(|| self.node_id.clone());
        if reported != self.node_id {
            return Err(LoadError::NodeIdentityMismatch { expected: self.node_id.to_string(), actual: reported.to_string() });
        }
        Ok(())
    }

    async fn get_balance(&self, address: &str) -> Result<Balance> {
        {
            let mut faults = self.faults()?;
            if faults.balance_errors > 0 {
                faults.balance_errors -= 1;
                return Err(LoadError::transport("get_balance", "injected balance failure"));
            }
        }
        self.ledger.balance(address)
    }

    async fn list_unspent_outputs(&self, address_key_identifier: &str) -> Result<Vec<UnspentOutput>> {
        self.ledger.unspent(address_key_identifier)
    }

    async fn fetch_private_key(&self, address: &str) -> Result<String> {
        let wallet = self.ledger.wallet(address)?;
        Ok(private_key_for(&wallet.key_identifier))
    }

    async fn fetch_address_info(&self, address: &str) -> Result<AddressInfo> {
        let wallet = self.ledger.wallet(address)?;
        Ok(AddressInfo {
            address: wallet.address(),
            address_base: wallet.base.clone(),
            address_version: ADDRESS_VERSION.to_string(),
            public_key: Some(public_key_for(&wallet.key_identifier)),
            address_key_identifier: wallet.key_identifier,
        })
    }

    async fn sign_transaction(&self, tx: &UnsignedTransaction, keys: &KeyMaterial) -> Result<SignedTransaction> {
        if self.should_reject_sign(tx)? {
            return Err(LoadError::rejected("sign_transaction", STATUS_FAIL));
        }
        self.ledger.sign(&self.node_id, tx, keys)
    }

    async fn submit_transaction(&self, tx: &SignedTransaction) -> Result<()> {
        let limit = self.faults()?.submit_limit;
        if limit.is_some_and(|limit| self.accepted.load(Ordering::SeqCst) >= limit) {
            return Err(LoadError::rejected("submit_transaction", STATUS_FAIL));
        }
        self.ledger.submit(tx)?;
        let accepted = self.accepted.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("memory node accepted node_id={} tx_id={} accepted={}", self.node_id, tx.id(), accepted);
        Ok(())
    }

    async fn generate_new_address(&self) -> Result<AddressInfo> {
        if self.faults()?.fail_new_address {
            return Err(LoadError::transport("generate_new_address", "injected address failure"));
        }
        let wallet = self.ledger.new_address(&self.node_id)?;
        Ok(AddressInfo {
            address: wallet.address(),
            address_base: wallet.base.clone(),
            address_version: ADDRESS_VERSION.to_string(),
            public_key: Some(public_key_for(&wallet.key_identifier)),
            address_key_identifier: wallet.key_identifier,
        })
    }
}
