//! Operator surface over a running bridge.
//!
//! [`BridgeHandle`] exposes the read queries and the manually triggered
//! signing operations that do not belong to any worker loop: ledger-log
//! inspection, authority issuance, mint vouchers, raw hash signing, and
//! sweeping a stray inscription output back to the service address.
//! Mutating operations record their failures under the diagnostic key
//! before surfacing them.

use std::sync::Arc;

use alloy_primitives::{Address as EthAddress, U256};
use anyhow::Context;
use bitcoin::consensus::encode::serialize;
use sha2::{Digest, Sha256};
use tapbridge_authority::{
    sign_privilege_authority, sign_privilege_verified, sign_token_authority, sign_voucher,
    MintVoucher, SignOutcome,
};
use tapbridge_btcio::{build_transaction, sign_transaction, CarrierInput, SigValidation};
use tapbridge_db::DbResult;
use tapbridge_primitives::{outpoint_key, LogEntry};
use tracing::info;

use crate::{context::ServiceContext, errors::ServiceError, interpret::ticker_decimals};

/// Largest page a single log query returns.
const LOG_PAGE_MAX: u64 = 100;

/// Postage attached to the destination output of a sweep.
const SWEEP_POSTAGE: u64 = 1_000;

/// Query and control surface over a [`ServiceContext`].
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    ctx: Arc<ServiceContext>,
}

impl BridgeHandle {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Raw store read, for operator debugging.
    pub fn raw_get(&self, key: &str) -> DbResult<Option<String>> {
        self.ctx.storage.raw_get(key)
    }

    pub fn log_count(&self) -> DbResult<u64> {
        self.ctx.storage.log_count()
    }

    pub fn log(&self, index: u64) -> DbResult<Option<LogEntry>> {
        self.ctx.storage.log(index)
    }

    /// A page of log entries starting at `offset`, capped at
    /// [`LOG_PAGE_MAX`] rows.
    pub fn logs(&self, offset: u64, max: u64) -> DbResult<Vec<LogEntry>> {
        self.ctx.storage.logs(offset, max.min(LOG_PAGE_MAX))
    }

    /// Looks up the log entry created for a deposit outpoint.
    pub fn log_by_outpoint(&self, txid: &str, vout: u32) -> DbResult<Option<(u64, LogEntry)>> {
        self.ctx.storage.log_by_utxo(&format!("{txid}:{vout}"))
    }

    pub fn bitcoin_cursor(&self) -> DbResult<Option<u64>> {
        self.ctx.storage.block_cursor()
    }

    pub fn ethereum_cursor(&self) -> DbResult<Option<u64>> {
        self.ctx.storage.eth_block_cursor()
    }

    pub fn is_busy(&self) -> DbResult<bool> {
        self.ctx.storage.is_busy()
    }

    pub fn token_authority(&self) -> &str {
        &self.ctx.config.token_auth_inscription
    }

    pub fn privilege_authority(&self) -> &str {
        &self.ctx.config.privilege_auth_inscription
    }

    /// Configured re-org safety distances, bitcoin first.
    pub fn finality_distances(&self) -> (u64, u64) {
        (
            self.ctx.config.finality_distance,
            self.ctx.config.eth_finality_distance,
        )
    }

    pub async fn bitcoin_address(&self) -> Result<String, ServiceError> {
        Ok(self.keys().await?.address.to_string())
    }

    pub async fn ethereum_address(&self) -> Result<String, ServiceError> {
        Ok(self.keys().await?.eth_address.to_string())
    }

    pub async fn public_key_hex(&self) -> Result<String, ServiceError> {
        Ok(hex::encode(&self.keys().await?.pubkey_bytes))
    }

    /// Current Ethereum head, straight from the RPC endpoint.
    pub async fn eth_block_number(&self) -> Result<u64, ServiceError> {
        Ok(self.ctx.eth_oracle.current_block().await?)
    }

    /// Signs the SHA-256 digest of an arbitrary message with the service
    /// key and returns the compact signature as hex.
    pub async fn sign_raw_hash(&self, message: &str) -> anyhow::Result<String> {
        self.record(self.sign_raw_hash_inner(message).await)
    }

    /// Issues a fresh token-authority document.
    pub async fn issue_token_authority(&self) -> anyhow::Result<SignOutcome> {
        let ctx = &self.ctx;
        let result: anyhow::Result<SignOutcome> = async {
            let keys = self.keys().await?;
            Ok(sign_token_authority(ctx.signer.as_ref(), ctx.key_id(), &keys.pubkey).await?)
        }
        .await;
        self.record(result)
    }

    /// Issues a privilege-authority document under the given name.
    pub async fn issue_privilege_authority(&self, name: &str) -> anyhow::Result<SignOutcome> {
        let ctx = &self.ctx;
        let result: anyhow::Result<SignOutcome> = async {
            let keys = self.keys().await?;
            Ok(
                sign_privilege_authority(ctx.signer.as_ref(), ctx.key_id(), &keys.pubkey, name)
                    .await?,
            )
        }
        .await;
        self.record(result)
    }

    /// Signs a privilege verification for `verify_hash` at `collection` /
    /// `sequence`, bound to `address`, under the configured privilege
    /// authority.
    pub async fn verify_privilege(
        &self,
        verify_hash: &str,
        collection: &str,
        sequence: u64,
        address: &str,
    ) -> anyhow::Result<SignOutcome> {
        let ctx = &self.ctx;
        let result: anyhow::Result<SignOutcome> = async {
            let privilege = &ctx.config.privilege_auth_inscription;
            if privilege.is_empty() {
                anyhow::bail!("no privilege authority configured");
            }
            let keys = self.keys().await?;
            Ok(sign_privilege_verified(
                ctx.signer.as_ref(),
                ctx.key_id(),
                &keys.pubkey,
                privilege,
                verify_hash,
                collection,
                sequence,
                address,
            )
            .await?)
        }
        .await;
        self.record(result)
    }

    /// Signs a cross-chain mint voucher over the configured ticker for
    /// `value` base units to `account`.
    pub async fn mint_voucher(
        &self,
        account: &str,
        value: &str,
        nonce: u64,
    ) -> anyhow::Result<String> {
        self.record(self.mint_voucher_inner(account, value, nonce).await)
    }

    /// Sweeps a stray inscription output back to the service address,
    /// funding the transaction from the chain's view of spendable outputs.
    /// Returns the broadcast transaction as hex.
    pub async fn sweep_inscription(
        &self,
        txid: &str,
        vout: u32,
        value: u64,
    ) -> anyhow::Result<String> {
        self.record(self.sweep_inner(txid, vout, value).await)
    }

    async fn sign_raw_hash_inner(&self, message: &str) -> anyhow::Result<String> {
        let digest: [u8; 32] = Sha256::digest(message.as_bytes()).into();
        let sig = self
            .ctx
            .signer
            .sign_hash(self.ctx.key_id(), &[], &digest)
            .await?;
        Ok(hex::encode(sig))
    }

    async fn mint_voucher_inner(
        &self,
        account: &str,
        value: &str,
        nonce: u64,
    ) -> anyhow::Result<String> {
        let ctx = &self.ctx;
        let keys = self.keys().await?;
        let tick = ctx.config.mint_ticker.clone();
        let decimals = ticker_decimals(ctx, &tick)
            .await?
            .with_context(|| format!("ticker {tick} is not deployed"))?;

        let voucher = MintVoucher {
            account: account.parse::<EthAddress>().context("parsing account")?,
            value: value.parse::<U256>().context("parsing voucher value")?,
            token: tick,
            decimals,
            nonce: U256::from(nonce),
            chain_id: ctx.config.eth_chain_id,
        };
        let signed =
            sign_voucher(ctx.signer.as_ref(), ctx.key_id(), keys.eth_address, &voucher).await?;
        info!(account, nonce, "mint voucher signed");
        Ok(signed)
    }

    async fn sweep_inner(&self, txid: &str, vout: u32, value: u64) -> anyhow::Result<String> {
        let ctx = &self.ctx;
        let keys = self.keys().await?;
        let carrier = CarrierInput {
            txid: txid.trim().parse().context("parsing carrier txid")?,
            vout,
            value,
        };
        if ctx.storage.is_utxo_consumed(&outpoint_key(&carrier.txid, vout))? {
            anyhow::bail!("outpoint {txid}:{vout} is already consumed");
        }

        let utxos = ctx.oracle.spendable_utxos(&keys.address.to_string()).await?;
        let percentiles = ctx.oracle.fee_percentiles().await?;
        let fee_per_byte = ctx.config.fee_per_byte(&percentiles);

        let unsigned = build_transaction(
            &keys.pubkey_bytes,
            &utxos,
            &keys.script_pubkey,
            &keys.script_pubkey,
            SWEEP_POSTAGE,
            fee_per_byte,
            Some(&carrier),
            false,
        )
        .await?;
        let signed = sign_transaction(
            ctx.signer.as_ref(),
            ctx.key_id(),
            &[],
            &keys.pubkey_bytes,
            &unsigned,
            SigValidation::Verify,
        )
        .await?;
        let bytes = serialize(&signed);
        ctx.broadcaster.send_raw(&bytes).await?;
        info!(txid, vout, "sweep transaction broadcast");
        Ok(hex::encode(bytes))
    }

    async fn keys(&self) -> Result<crate::keys::KeyMaterial, ServiceError> {
        self.ctx
            .keys
            .ensure(
                self.ctx.signer.as_ref(),
                self.ctx.key_id(),
                self.ctx.config.network,
            )
            .await
    }

    fn record<T>(&self, result: anyhow::Result<T>) -> anyhow::Result<T> {
        if let Err(err) = &result {
            let _ = self.ctx.storage.record_debug(&format!("{err:#}"));
        }
        result
    }
}
