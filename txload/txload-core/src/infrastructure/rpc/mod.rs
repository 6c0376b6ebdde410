use crate::domain::{AddressInfo, Balance, KeyMaterial, SignedTransaction, UnsignedTransaction, UnspentOutput};
use crate::foundation::Result;
use async_trait::async_trait;

/// Remote ledger node operations used by every phase of a load run.
///
/// One instance is bound to one participant's node; identity and signature are fixed at
/// construction.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Fails with `NodeIdentityMismatch` when the node reports a different id.
    async fn verify_identity(&self) -> Result<()>;
    async fn get_balance(&self, address: &str) -> Result<Balance>;
    async fn list_unspent_outputs(&self, address_key_identifier: &str) -> Result<Vec<UnspentOutput>>;
    async fn fetch_private_key(&self, address: &str) -> Result<String>;
    async fn fetch_address_info(&self, address: &str) -> Result<AddressInfo>;
    /// An explicit failure status comes back as `LoadError::Rejected`.
    async fn sign_transaction(&self, tx: &UnsignedTransaction, keys: &KeyMaterial) -> Result<SignedTransaction>;
    /// Succeeds only on a `success` status; any other status is a rejection.
    async fn submit_transaction(&self, tx: &SignedTransaction) -> Result<()>;
    async fn generate_new_address(&self) -> Result<AddressInfo>;
}

pub mod http;
pub mod memory;
pub mod retry;

pub use http::{HttpNodeApi, NodeClientOptions};
pub use memory::{MemoryLedger, MemoryNode, NodeFaults};
pub use retry::{retry, retry_if};
