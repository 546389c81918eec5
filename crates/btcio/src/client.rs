//! HTTP clients for the external collaborators: the chain-data oracle, the
//! Ethereum RPC endpoint, and the remote signing oracle.
//!
//! The chain-data oracle wraps every response in `{"result": ...}` on
//! success or `{"err": "..."}` on failure; both arrive as HTTP 200, so the
//! envelope is unwrapped before anything is interpreted.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tapbridge_primitives::{Deposit, UtxoEntry};
use tracing::trace;

use crate::{
    errors::{OracleError, SignerError},
    traits::{ChainOracle, EthereumOracle, RemoteSigner, TxBroadcaster},
};

/// Page size for deposit-list requests.
const DEPOSIT_PAGE_MAX: u64 = 100;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    err: Option<String>,
}

impl<T> Envelope<T> {
    fn into_result(self) -> Result<T, OracleError> {
        if let Some(err) = self.err {
            return Err(OracleError::Api(err));
        }
        self.result.ok_or_else(|| OracleError::Api("no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct DeploymentInfo {
    dec: u8,
}

/// Client for the indexer that serves deposit and chain data, also used to
/// submit raw transactions.
#[derive(Debug, Clone)]
pub struct HttpBridgeClient {
    http: reqwest::Client,
    host: String,
    mint_tick: String,
}

impl HttpBridgeClient {
    pub fn new(host: impl Into<String>, mint_tick: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.into(),
            mint_tick: mint_tick.into(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, OracleError> {
        let url = format!("{}/{}", self.host, endpoint);
        trace!(%url, "oracle request");
        let envelope: Envelope<T> = self.http.get(&url).send().await?.json().await?;
        envelope.into_result()
    }
}

#[async_trait]
impl ChainOracle for HttpBridgeClient {
    async fn current_height(&self) -> Result<u64, OracleError> {
        self.call("getCurrentBlock").await
    }

    async fn deposit_count(&self, height: u64) -> Result<u64, OracleError> {
        self.call(&format!(
            "getTickerMintedListByBlockLength/{}/{height}",
            self.mint_tick
        ))
        .await
    }

    async fn deposits(&self, height: u64, count: u64) -> Result<Vec<Deposit>, OracleError> {
        let max = count.min(DEPOSIT_PAGE_MAX);
        let mut deposits = Vec::with_capacity(count as usize);
        let pages = count.div_ceil(max.max(1));
        for page in 0..pages {
            let offset = page * max;
            let chunk: Vec<Deposit> = self
                .call(&format!(
                    "getTickerMintedListByBlock/{}/{height}?offset={offset}&max={max}",
                    self.mint_tick
                ))
                .await?;
            deposits.extend(chunk);
        }
        Ok(deposits)
    }

    async fn ticker_decimals(&self, tick: &str) -> Result<Option<u8>, OracleError> {
        let url = format!("{}/getDeployment/{tick}", self.host);
        let envelope: Envelope<DeploymentInfo> =
            self.http.get(&url).send().await?.json().await?;
        if let Some(err) = envelope.err {
            return Err(OracleError::Api(err));
        }
        // a null result with no error means the ticker was never deployed
        Ok(envelope.result.map(|info| info.dec))
    }

    async fn spendable_utxos(&self, address: &str) -> Result<Vec<UtxoEntry>, OracleError> {
        self.call(&format!("getUtxos/{address}")).await
    }

    async fn fee_percentiles(&self) -> Result<Vec<u64>, OracleError> {
        self.call("getFeePercentiles").await
    }
}

#[async_trait]
impl TxBroadcaster for HttpBridgeClient {
    async fn send_raw(&self, tx: &[u8]) -> Result<(), OracleError> {
        let url = format!("{}/sendRawTransaction", self.host);
        let envelope: Envelope<serde_json::Value> = self
            .http
            .post(&url)
            .json(&json!({ "tx": hex::encode(tx) }))
            .send()
            .await?
            .json()
            .await?;
        if let Some(err) = envelope.err {
            return Err(OracleError::Api(err));
        }
        Ok(())
    }
}

/// Ethereum JSON-RPC client, used only for the head-block cursor.
#[derive(Debug, Clone)]
pub struct HttpEthClient {
    http: reqwest::Client,
    url: String,
}

impl HttpEthClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

fn parse_hex_block(raw: &str) -> Result<u64, OracleError> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|_| OracleError::Api(format!("bad block number: {raw}")))
}

#[async_trait]
impl EthereumOracle for HttpEthClient {
    async fn current_block(&self) -> Result<u64, OracleError> {
        #[derive(Deserialize)]
        struct RpcResponse {
            result: Option<String>,
            error: Option<serde_json::Value>,
        }

        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&json!({
                "method": "eth_blockNumber",
                "params": [],
                "id": 1,
                "jsonrpc": "2.0",
            }))
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(OracleError::Api(error.to_string()));
        }
        let raw = response
            .result
            .ok_or_else(|| OracleError::Api("no data".to_string()))?;
        parse_hex_block(&raw)
    }
}

/// Client for the remote signing oracle. Digests go out hex-encoded and
/// 64-byte compact signatures come back the same way.
#[derive(Debug, Clone)]
pub struct HttpRemoteSigner {
    http: reqwest::Client,
    host: String,
}

impl HttpRemoteSigner {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.into(),
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T, SignerError> {
        let url = format!("{}/{endpoint}", self.host);
        let envelope: Envelope<T> = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| SignerError::Oracle(err.to_string()))?
            .json()
            .await
            .map_err(|err| SignerError::Oracle(err.to_string()))?;
        envelope
            .into_result()
            .map_err(|err| SignerError::Oracle(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct SignatureResponse {
    signature: String,
}

#[derive(Debug, Deserialize)]
struct PublicKeyResponse {
    public_key: String,
}

#[async_trait]
impl RemoteSigner for HttpRemoteSigner {
    async fn sign_hash(
        &self,
        key_id: &str,
        derivation_path: &[Vec<u8>],
        hash: &[u8; 32],
    ) -> Result<[u8; 64], SignerError> {
        let path: Vec<String> = derivation_path.iter().map(hex::encode).collect();
        let response: SignatureResponse = self
            .post(
                "sign_with_ecdsa",
                json!({
                    "key_id": key_id,
                    "derivation_path": path,
                    "message_hash": hex::encode(hash),
                }),
            )
            .await?;
        let bytes = hex::decode(&response.signature)
            .map_err(|_| SignerError::MalformedSignature)?;
        bytes
            .try_into()
            .map_err(|_| SignerError::MalformedSignature)
    }

    async fn public_key(&self, key_id: &str) -> Result<Vec<u8>, SignerError> {
        let response: PublicKeyResponse = self
            .post("ecdsa_public_key", json!({ "key_id": key_id }))
            .await?;
        hex::decode(&response.public_key).map_err(|_| SignerError::MalformedSignature)
    }
}
