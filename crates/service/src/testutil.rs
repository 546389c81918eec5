//! Scripted collaborators and a wired-up bridge for worker tests.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bitcoin::{consensus::encode::deserialize, Transaction, Txid};
use parking_lot::Mutex;
use secp256k1::{Message, SecretKey, SECP256K1};
use tapbridge_btcio::{
    ChainOracle, EthereumOracle, OracleError, RemoteSigner, SignerError, TxBroadcaster,
    UtxoInventory,
};
use tapbridge_config::BridgeConfig;
use tapbridge_db::MemKvStore;
use tapbridge_primitives::{Deposit, LogEntry, LogEntryKind, UtxoEntry};
use tapbridge_storage::BridgeStorage;

use crate::{
    context::ServiceContext,
    keys::{KeyMaterial, ServiceKeys},
};

/// A destination address that validates on regtest.
pub(crate) const DEST_ADDRESS: &str = "bcrt1qw508d6qejxtdg4y5r3zarvary0c5xw7kygt080";

/// Signs with a locally held key, standing in for the signing oracle.
pub(crate) struct LocalSigner {
    secret: SecretKey,
}

impl LocalSigner {
    pub(crate) fn new(seed: [u8; 32]) -> Self {
        Self {
            secret: SecretKey::from_slice(&seed).expect("static seed"),
        }
    }
}

#[async_trait]
impl RemoteSigner for LocalSigner {
    async fn sign_hash(
        &self,
        _key_id: &str,
        _derivation_path: &[Vec<u8>],
        hash: &[u8; 32],
    ) -> Result<[u8; 64], SignerError> {
        let message = Message::from_digest(*hash);
        Ok(SECP256K1
            .sign_ecdsa(&message, &self.secret)
            .serialize_compact())
    }

    async fn public_key(&self, _key_id: &str) -> Result<Vec<u8>, SignerError> {
        Ok(self.secret.public_key(SECP256K1).serialize().to_vec())
    }
}

#[derive(Default)]
struct OracleState {
    height: u64,
    deposits: HashMap<u64, Vec<Deposit>>,
    failures: HashMap<u64, String>,
    decimals: Option<u8>,
    spendables: Vec<UtxoEntry>,
    percentiles: Vec<u64>,
    eth_block: u64,
    eth_failure: Option<String>,
}

/// Chain-data and Ethereum oracle with scripted responses.
pub(crate) struct ScriptedOracle {
    state: Mutex<OracleState>,
}

impl ScriptedOracle {
    fn new() -> Self {
        Self {
            state: Mutex::new(OracleState {
                height: 103,
                decimals: Some(18),
                ..Default::default()
            }),
        }
    }

    pub(crate) fn set_height(&self, height: u64) {
        self.state.lock().height = height;
    }

    pub(crate) fn push_deposits(&self, height: u64, deposits: Vec<Deposit>) {
        self.state.lock().deposits.insert(height, deposits);
    }

    pub(crate) fn fail_deposits(&self, height: u64, err: OracleError) {
        self.state.lock().failures.insert(height, err.to_string());
    }

    pub(crate) fn clear_failure(&self, height: u64) {
        self.state.lock().failures.remove(&height);
    }

    pub(crate) fn set_decimals(&self, decimals: Option<u8>) {
        self.state.lock().decimals = decimals;
    }

    pub(crate) fn set_spendables(&self, utxos: Vec<UtxoEntry>) {
        self.state.lock().spendables = utxos;
    }

    pub(crate) fn set_percentiles(&self, percentiles: Vec<u64>) {
        self.state.lock().percentiles = percentiles;
    }

    pub(crate) fn set_eth_block(&self, block: u64) {
        self.state.lock().eth_block = block;
    }

    pub(crate) fn fail_eth(&self, message: &str) {
        self.state.lock().eth_failure = Some(message.to_string());
    }
}

#[async_trait]
impl ChainOracle for ScriptedOracle {
    async fn current_height(&self) -> Result<u64, OracleError> {
        Ok(self.state.lock().height)
    }

    async fn deposit_count(&self, height: u64) -> Result<u64, OracleError> {
        let state = self.state.lock();
        if let Some(err) = state.failures.get(&height) {
            return Err(OracleError::Api(err.clone()));
        }
        Ok(state.deposits.get(&height).map_or(0, Vec::len) as u64)
    }

    async fn deposits(&self, height: u64, _count: u64) -> Result<Vec<Deposit>, OracleError> {
        let state = self.state.lock();
        if let Some(err) = state.failures.get(&height) {
            return Err(OracleError::Api(err.clone()));
        }
        Ok(state.deposits.get(&height).cloned().unwrap_or_default())
    }

    async fn ticker_decimals(&self, _tick: &str) -> Result<Option<u8>, OracleError> {
        Ok(self.state.lock().decimals)
    }

    async fn spendable_utxos(&self, _address: &str) -> Result<Vec<UtxoEntry>, OracleError> {
        Ok(self.state.lock().spendables.clone())
    }

    async fn fee_percentiles(&self) -> Result<Vec<u64>, OracleError> {
        Ok(self.state.lock().percentiles.clone())
    }
}

#[async_trait]
impl EthereumOracle for ScriptedOracle {
    async fn current_block(&self) -> Result<u64, OracleError> {
        let state = self.state.lock();
        if let Some(err) = &state.eth_failure {
            return Err(OracleError::Api(err.clone()));
        }
        Ok(state.eth_block)
    }
}

/// Records broadcast transactions, optionally failing one call.
#[derive(Default)]
pub(crate) struct RecordingBroadcaster {
    sent: Mutex<Vec<Vec<u8>>>,
    calls: Mutex<usize>,
    fail_call: Mutex<Option<usize>>,
}

impl RecordingBroadcaster {
    pub(crate) fn sent(&self) -> usize {
        self.sent.lock().len()
    }

    pub(crate) fn transactions(&self) -> Vec<Transaction> {
        self.sent
            .lock()
            .iter()
            .map(|bytes| deserialize(bytes).expect("recorded transaction decodes"))
            .collect()
    }

    /// Fails the `n`-th broadcast call (zero-based).
    pub(crate) fn fail_nth(&self, n: usize) {
        *self.fail_call.lock() = Some(n);
    }
}

#[async_trait]
impl TxBroadcaster for RecordingBroadcaster {
    async fn send_raw(&self, tx: &[u8]) -> Result<(), OracleError> {
        let mut calls = self.calls.lock();
        let call = *calls;
        *calls += 1;
        drop(calls);

        if *self.fail_call.lock() == Some(call) {
            return Err(OracleError::Api("broadcast refused".to_string()));
        }
        self.sent.lock().push(tx.to_vec());
        Ok(())
    }
}

/// A fully wired bridge over in-memory storage and scripted collaborators.
pub(crate) struct TestBridge {
    pub(crate) ctx: ServiceContext,
    pub(crate) oracle: Arc<ScriptedOracle>,
    pub(crate) broadcaster: Arc<RecordingBroadcaster>,
    pub(crate) keys: KeyMaterial,
}

impl TestBridge {
    pub(crate) async fn new() -> Self {
        let config: BridgeConfig = toml::from_str(
            r#"
            network = "regtest"
            oracle_url = "http://127.0.0.1:0"
            signer_url = "http://127.0.0.1:0"
            eth_rpc_url = "http://127.0.0.1:0"
            mint_ticker = "brdg"
            start_block = 100
            eth_start_block = 8000
            eth_chain_id = 1
            token_auth_inscription = "authi0"
            privilege_auth_inscription = "prvi0"
            "#,
        )
        .expect("static config");

        let storage = BridgeStorage::new(Arc::new(MemKvStore::new()));
        let oracle = Arc::new(ScriptedOracle::new());
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let ctx = ServiceContext {
            config,
            storage: storage.clone(),
            inventory: UtxoInventory::new(storage),
            oracle: oracle.clone(),
            eth_oracle: oracle.clone(),
            signer: Arc::new(LocalSigner::new([42u8; 32])),
            broadcaster: broadcaster.clone(),
            keys: ServiceKeys::new(),
        };
        let keys = ctx
            .keys
            .ensure(ctx.signer.as_ref(), ctx.key_id(), ctx.config.network)
            .await
            .expect("local signer never fails");

        Self {
            ctx,
            oracle,
            broadcaster,
            keys,
        }
    }
}

/// A valid deposit addressed to the bridge at `height`.
pub(crate) fn deposit_at(bridge: &TestBridge, height: u64, amount: u64, fee: u64) -> Deposit {
    Deposit {
        address: bridge.keys.address.to_string(),
        block: height,
        failed: false,
        data: Some(format!(
            r#"{{"op":"processMint","addr":"{DEST_ADDRESS}","fee":{fee}}}"#
        )),
        amount,
        token_amount: "1000000000000000000".to_string(),
        txid: "ab".repeat(32),
        vout: 0,
        inscription_id: "depositi0".to_string(),
    }
}

/// A pending mint-settlement entry, bypassing the interpreter.
pub(crate) fn mint_log_entry(_bridge: &TestBridge, outpoint: &str, amount_sats: u64) -> LogEntry {
    LogEntry {
        kind: LogEntryKind::MintSettlement {
            tick: "brdg".to_string(),
            dec: 18,
            amt: "1000000000000000000".to_string(),
        },
        address: DEST_ADDRESS.to_string(),
        amount_sats,
        fee_sats: 1_000,
        block_height: 100,
        utxo: outpoint.to_string(),
        inscription_id: "depositi0".to_string(),
        processed: false,
        result: None,
    }
}

pub(crate) fn utxo(tag: &str, vout: u32, value: u64) -> UtxoEntry {
    let txid: Txid = tag.repeat(32).parse().expect("static txid hex");
    UtxoEntry::new(txid, vout, value)
}
