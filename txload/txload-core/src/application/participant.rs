use crate::domain::{KeyMaterial, Participant, UnspentOutput, WalletAddress};
use crate::foundation::Result;
use crate::infrastructure::rpc::NodeApi;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A participant bound to its node, with signing keys cached for the run.
pub struct ParticipantContext {
    pub participant: Participant,
    pub node: Arc<dyn NodeApi>,
    keys: OnceCell<KeyMaterial>,
}

impl ParticipantContext {
    pub fn new(participant: Participant, node: Arc<dyn NodeApi>) -> Self {
        Self { participant, node, keys: OnceCell::new() }
    }

    pub fn wallet(&self) -> &WalletAddress {
        &self.participant.wallet
    }

    pub fn address(&self) -> String {
        self.participant.address()
    }

    /// Fetched from the node on first use, then shared by every later phase.
    pub async fn key_material(&self) -> Result<&KeyMaterial> {
        self.keys.get_or_try_init(|| obtain_key_material(self.node.as_ref(), &self.participant.wallet)).await
    }
}

/// Private key of the wallet's address plus the public key of its base address.
pub async fn obtain_key_material(node: &dyn NodeApi, wallet: &WalletAddress) -> Result<KeyMaterial> {
    let mut keys = KeyMaterial::new();
    add_address_keys(node, &mut keys, &wallet.address(), &wallet.key_identifier).await?;
    debug!("key material obtained address={}", wallet.address());
    Ok(keys)
}

/// Keys for every distinct owning address among `outputs`.
pub async fn key_material_for_outputs(node: &dyn NodeApi, outputs: &[UnspentOutput]) -> Result<KeyMaterial> {
    let owners: BTreeMap<&str, &str> =
        outputs.iter().map(|utxo| (utxo.address.as_str(), utxo.address_key_identifier.as_str())).collect();
    let mut keys = KeyMaterial::new();
    for (address, key_identifier) in owners {
        add_address_keys(node, &mut keys, address, key_identifier).await?;
    }
    Ok(keys)
}

async fn add_address_keys(node: &dyn NodeApi, keys: &mut KeyMaterial, address: &str, key_identifier: &str) -> Result<()> {
    let private_key = node.fetch_private_key(address).await?;
    let info = node.fetch_address_info(address).await?;
    let public_key = info.public_key.unwrap_or_else(|| {
        warn!("address info has no public key address={}", address);
        String::new()
    });
    keys.insert(key_identifier, private_key, info.address_base, public_key);
    Ok(())
}
