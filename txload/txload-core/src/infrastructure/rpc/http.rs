use crate::domain::{AddressInfo, Balance, KeyMaterial, Participant, SignedTransaction, UnsignedTransaction, UnspentOutput};
use crate::foundation::{LoadError, NodeId, Result, UNSPENT_QUERY_LIMIT};
use crate::infrastructure::rpc::NodeApi;
use async_trait::async_trait;
use log::{debug, trace, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

const IDENTITY_ENDPOINT: &str = "ZFAYRM8LRtmfYp4Y";
const UNSPENT_OUTPUTS_ENDPOINT: &str = "FDLyQ5uo5t7jltiQ";
const PRIVATE_KEY_ENDPOINT: &str = "PKUv2JfV87KpEZwE";
const SIGN_ENDPOINT: &str = "RVBqKlGdk9aEhi5J";
const SUBMIT_ENDPOINT: &str = "VnJIBrrM0KY3uQ9X";
const ADDRESS_INFO_ENDPOINT: &str = "ywTmt3C0nwk5k4c7";
const BALANCE_ENDPOINT: &str = "zLsiAkocn90e3K6R";
const NEW_ADDRESS_ENDPOINT: &str = "Lb2fuhVMDQm1DrLL";

const STATUS_SUCCESS: &str = "success";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeClientOptions {
    /// Nodes usually run with self-signed certificates.
    pub accept_invalid_certs: bool,
    pub request_timeout: Option<Duration>,
}

/// `NodeApi` over the node's HTTPS/JSON API.
pub struct HttpNodeApi {
    client: reqwest::Client,
    base_url: String,
    node_id: NodeId,
}

#[derive(Deserialize)]
struct IdentityResponse {
    #[serde(default)]
    node_id: String,
}

#[derive(Deserialize)]
struct PrivateKeyResponse {
    private_key_hex: String,
}

#[derive(Deserialize)]
struct BalanceResponse {
    #[serde(default)]
    stable: u64,
    #[serde(default)]
    unstable: u64,
}

#[derive(Deserialize)]
struct AddressInfoResponse {
    #[serde(default)]
    address: String,
    #[serde(default)]
    address_base: String,
    #[serde(default)]
    address_version: String,
    #[serde(default)]
    address_key_identifier: String,
    #[serde(default)]
    address_attribute: HashMap<String, String>,
}

impl From<AddressInfoResponse> for AddressInfo {
    fn from(mut info: AddressInfoResponse) -> Self {
        AddressInfo {
            public_key: info.address_attribute.remove("key_public"),
            address: info.address,
            address_base: info.address_base,
            address_version: info.address_version,
            address_key_identifier: info.address_key_identifier,
        }
    }
}

#[derive(Serialize)]
struct SignRequest<'a> {
    p0: &'a UnsignedTransaction,
    p1: &'a BTreeMap<String, String>,
    p2: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    p0: &'a SignedTransaction,
}

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: Option<String>,
}

pub fn base_url(participant: &Participant) -> String {
    format!(
        "https://{}:{}/api/{}/{}",
        participant.endpoint.host, participant.endpoint.port, participant.identity.id, participant.identity.signature
    )
}

impl HttpNodeApi {
    pub fn new(participant: &Participant, options: &NodeClientOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(options.accept_invalid_certs);
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|err| LoadError::transport("build http client", err))?;
        Ok(Self { client, base_url: base_url(participant), node_id: participant.identity.id.clone() })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn get<T: DeserializeOwned>(&self, operation: &str, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let started = Instant::now();
        trace!("http request op={} endpoint={}", operation, endpoint);
        let response = self
            .client
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await
            .map_err(|err| LoadError::transport(operation, err))?;
        let value = decode(operation, response).await?;
        debug!("http response op={} elapsed_ms={}", operation, started.elapsed().as_millis());
        Ok(value)
    }

    async fn post<B: Serialize + ?Sized>(&self, operation: &str, endpoint: &str, body: &B) -> Result<serde_json::Value> {
        let started = Instant::now();
        let response = self
            .client
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|err| LoadError::transport(operation, err))?;
        let value = decode(operation, response).await?;
        debug!("http response op={} elapsed_ms={}", operation, started.elapsed().as_millis());
        Ok(value)
    }
}

async fn decode<T: DeserializeOwned>(operation: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await.map_err(|err| LoadError::transport(operation, err))?;
    serde_json::from_str(&body).map_err(|err| {
        if status.is_success() {
            crate::serde_err!("json", format!("{operation}: {err}"))
        } else {
            LoadError::transport(operation, format!("http status {status}"))
        }
    })
}

/// Sign responses carry either a transaction or a bare `{"status": ...}`.
fn parse_signed(body: serde_json::Value) -> Result<SignedTransaction> {
    let has_id = body.get("transaction_id").and_then(|id| id.as_str()).is_some_and(|id| !id.is_empty());
    if !has_id {
        let status = body.get("status").and_then(|status| status.as_str()).unwrap_or("missing transaction_id");
        return Err(LoadError::rejected("sign_transaction", status));
    }
    serde_json::from_value(body).map_err(|err| crate::serde_err!("json", format!("sign_transaction: {err}")))
}

fn check_submit_status(response: StatusResponse) -> Result<()> {
    match response.status.as_deref() {
        Some(STATUS_SUCCESS) => Ok(()),
        other => Err(LoadError::rejected("submit_transaction", other.unwrap_or_default())),
    }
}

#[async_trait]
impl NodeApi for HttpNodeApi {
    async fn verify_identity(&self) -> Result<()> {
        let response: IdentityResponse = self.get("verify_identity", IDENTITY_ENDPOINT, &[]).await?;
        if response.node_id != self.node_id.as_str() {
            warn!("node identity mismatch expected={} actual={}", self.node_id, response.node_id);
            return Err(LoadError::NodeIdentityMismatch { expected: self.node_id.to_string(), actual: response.node_id });
        }
        Ok(())
    }

    async fn get_balance(&self, address: &str) -> Result<Balance> {
        let response: BalanceResponse = self.get("get_balance", BALANCE_ENDPOINT, &[("p0", address)]).await?;
        Ok(Balance { stable: response.stable, unstable: response.unstable })
    }

    async fn list_unspent_outputs(&self, address_key_identifier: &str) -> Result<Vec<UnspentOutput>> {
        let limit = UNSPENT_QUERY_LIMIT.to_string();
        let query = [("p3", address_key_identifier), ("p7", "1"), ("p10", "0"), ("p14", limit.as_str())];
        self.get("list_unspent_outputs", UNSPENT_OUTPUTS_ENDPOINT, &query).await
    }

    async fn fetch_private_key(&self, address: &str) -> Result<String> {
        let response: PrivateKeyResponse = self.get("fetch_private_key", PRIVATE_KEY_ENDPOINT, &[("p0", address)]).await?;
        Ok(response.private_key_hex)
    }

    async fn fetch_address_info(&self, address: &str) -> Result<AddressInfo> {
        let response: AddressInfoResponse = self.get("fetch_address_info", ADDRESS_INFO_ENDPOINT, &[("p0", address)]).await?;
        Ok(response.into())
    }

    async fn sign_transaction(&self, tx: &UnsignedTransaction, keys: &KeyMaterial) -> Result<SignedTransaction> {
        let request = SignRequest { p0: tx, p1: keys.private_keys(), p2: keys.public_keys() };
        parse_signed(self.post("sign_transaction", SIGN_ENDPOINT, &request).await?)
    }

    async fn submit_transaction(&self, tx: &SignedTransaction) -> Result<()> {
        let body = self.post("submit_transaction", SUBMIT_ENDPOINT, &SubmitRequest { p0: tx }).await?;
        let response: StatusResponse = serde_json::from_value(body).unwrap_or(StatusResponse { status: None });
        check_submit_status(response)
    }

    async fn generate_new_address(&self) -> Result<AddressInfo> {
        let response: AddressInfoResponse = self.get("generate_new_address", NEW_ADDRESS_ENDPOINT, &[]).await?;
        Ok(response.into())
    }
}
