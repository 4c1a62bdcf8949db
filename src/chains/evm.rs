//! EVM 系列适配器
//!
//! 同一实现按 chain_id/RPC 端点参数化，Ethereum 与 BSC 共用：
//! 两者派生路径相同（m/44'/60'/0'/0/{index}），只有链 ID 和端点不同。
//! 普通 JSON-RPC 节点无法枚举历史交易，get_transactions 返回空列表，
//! 活跃性依赖 eth_getTransactionCount

use async_trait::async_trait;
use serde_json::json;

use crate::config::{ChainSettings, EngineSettings};
use crate::domain::account::{BalanceSnapshot, DerivedAccount, ScannedAccount};
use crate::domain::chain_adapter::{
    check_count, Capabilities, ChainAdapter, ChainMetadata, DerivationKind,
};
use crate::domain::derivation::derive_secp256k1;
use crate::domain::seed::seed_bytes;
use crate::domain::transaction::TransactionRecord;
use crate::domain::transfer::TransferSummary;
use crate::error::WalletError;
use crate::infrastructure::http;
use crate::utils::address::{evm_address_from_pubkey, AddressValidator};

/// 简单转账的固定 gas 用量
const TRANSFER_GAS: u128 = 21_000;

pub struct EvmChain {
    meta: ChainMetadata,
    chain_id: u64,
    rpc_url: String,
    broadcast_delay_ms: u64,
    client: reqwest::Client,
}

impl EvmChain {
    fn new(
        key: &str,
        name: &str,
        chain_id: u64,
        settings: &ChainSettings,
        engine: &EngineSettings,
    ) -> Self {
        Self {
            meta: ChainMetadata {
                name: name.to_string(),
                symbol: settings.symbol.clone(),
                key: key.to_string(),
                coin_type: 60,
                supported_networks: vec!["mainnet".to_string()],
                default_network: "mainnet".to_string(),
                decimals: settings.decimals,
                derivation: DerivationKind::DirectIndex,
                scan_delay_ms: settings.scan_delay_ms,
                default_fee: settings.default_fee,
            },
            chain_id,
            rpc_url: settings.rpc_url.clone(),
            broadcast_delay_ms: engine.broadcast_delay_ms,
            client: http::build_client(engine.http_timeout_secs),
        }
    }

    pub fn ethereum(settings: &ChainSettings, engine: &EngineSettings) -> Self {
        Self::new("eth", "Ethereum", 1, settings, engine)
    }

    pub fn bsc(settings: &ChainSettings, engine: &EngineSettings) -> Self {
        Self::new("bsc", "BNB Smart Chain", 56, settings, engine)
    }

    /// 派生路径与 Ethereum 相同，BSC 也使用 coin type 60
    fn derivation_path(index: u32) -> String {
        format!("m/44'/60'/0'/0/{}", index)
    }

    async fn gas_price(&self) -> Result<u128, WalletError> {
        let result = http::rpc_call(&self.client, &self.rpc_url, "eth_gasPrice", json!([])).await?;
        http::parse_quantity(&result)
    }

    async fn transaction_count(&self, address: &str) -> Result<u64, WalletError> {
        let result = http::rpc_call(
            &self.client,
            &self.rpc_url,
            "eth_getTransactionCount",
            json!([address, "latest"]),
        )
        .await?;
        Ok(http::parse_quantity(&result)? as u64)
    }

    /// 构建并签名 EIP-155 legacy 交易
    fn sign_legacy_transfer(
        &self,
        private_key: &[u8; 32],
        recipient: &str,
        amount: u128,
        gas_price: u128,
        nonce: u64,
    ) -> Result<Vec<u8>, WalletError> {
        use k256::ecdsa::SigningKey;
        use rlp::RlpStream;
        use sha3::{Digest, Keccak256};

        let to_bytes = hex::decode(recipient.trim_start_matches("0x"))
            .map_err(|e| WalletError::Validation(format!("Invalid recipient hex: {}", e)))?;

        // 未签名交易: [nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]
        let mut stream = RlpStream::new();
        stream.begin_list(9);
        stream.append(&nonce);
        stream.append(&gas_price);
        stream.append(&TRANSFER_GAS);
        stream.append(&to_bytes);
        stream.append(&amount);
        stream.append_empty_data(); // data
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);

        let sighash = Keccak256::digest(stream.out());

        let signing_key = SigningKey::from_bytes(private_key.into())
            .map_err(|e| WalletError::Validation(format!("Invalid private key: {}", e)))?;
        let (signature, recovery_id) = signing_key
            .sign_prehash_recoverable(&sighash)
            .map_err(|e| WalletError::Validation(format!("Signing failed: {}", e)))?;

        // EIP-155: v = chainId * 2 + 35 + recovery_id
        let v = self.chain_id * 2 + 35 + u64::from(recovery_id.to_byte());

        let sig_bytes = signature.to_bytes();
        let r = trim_leading_zeros(&sig_bytes[..32]);
        let s = trim_leading_zeros(&sig_bytes[32..]);

        // 签名交易: [nonce, gasPrice, gasLimit, to, value, data, v, r, s]
        let mut signed = RlpStream::new();
        signed.begin_list(9);
        signed.append(&nonce);
        signed.append(&gas_price);
        signed.append(&TRANSFER_GAS);
        signed.append(&to_bytes);
        signed.append(&amount);
        signed.append_empty_data();
        signed.append(&v);
        signed.append(&r);
        signed.append(&s);

        Ok(signed.out().to_vec())
    }
}

fn trim_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

#[async_trait]
impl ChainAdapter for EvmChain {
    fn metadata(&self) -> &ChainMetadata {
        &self.meta
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            transfers: true,
            // 普通 RPC 节点无法枚举历史，可读展示不可用
            view_transactions: false,
            transaction_lookup: false,
        }
    }

    fn validate_seed_phrase(&self, seed: &str) -> Result<(), WalletError> {
        seed_bytes(seed)
            .map(|_| ())
            .map_err(|e| WalletError::Validation(e.to_string()))
    }

    fn generate_addresses(
        &self,
        seed: &str,
        count: u32,
        network: &str,
    ) -> Result<Vec<DerivedAccount>, WalletError> {
        check_count(count)?;
        self.check_network(network)?;
        let seed = seed_bytes(seed).map_err(|e| WalletError::Validation(e.to_string()))?;

        let mut accounts = Vec::with_capacity(count as usize);
        for index in 0..count {
            let path = Self::derivation_path(index);
            let key = derive_secp256k1(&seed, &path)
                .map_err(|e| WalletError::Validation(e.to_string()))?;
            let address = evm_address_from_pubkey(&key.public_key_uncompressed)
                .map_err(|e| WalletError::Validation(e.to_string()))?;

            accounts.push(DerivedAccount {
                index,
                address,
                private_key: hex::encode(key.private_key),
                derivation_path: path,
                imported: false,
            });
        }
        Ok(accounts)
    }

    async fn get_balance(
        &self,
        address: &str,
        network: &str,
    ) -> Result<BalanceSnapshot, WalletError> {
        self.check_network(network)?;

        let result = http::rpc_call(
            &self.client,
            &self.rpc_url,
            "eth_getBalance",
            json!([address, "latest"]),
        )
        .await?;
        let balance_wei = http::parse_quantity(&result)?;

        let tx_count = self.transaction_count(address).await?;

        Ok(BalanceSnapshot::simple(
            balance_wei,
            self.meta.decimals,
            tx_count > 0,
        ))
    }

    async fn get_transactions(
        &self,
        address: &str,
        network: &str,
        _limit: u32,
        _offset: u32,
    ) -> Result<Vec<TransactionRecord>, WalletError> {
        self.check_network(network)?;
        // 交易枚举需要 explorer 索引，普通 RPC 做不到
        tracing::debug!(
            chain = %self.meta.key,
            address = %address,
            "Transaction enumeration is unavailable over plain JSON-RPC"
        );
        Ok(vec![])
    }

    fn format_csv(&self, accounts: &[ScannedAccount]) -> String {
        let mut csv = format!(
            "Index,Address,Derivation Path,Private Key,Balance ({}),Active\n",
            self.meta.symbol
        );
        for scanned in accounts {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                scanned.account.index,
                scanned.account.address,
                scanned.account.derivation_path,
                scanned.account.private_key,
                scanned.balance.balance,
                scanned.balance.has_activity(),
            ));
        }
        csv
    }

    async fn estimate_fee(&self, _network: &str) -> Result<u128, WalletError> {
        // 实时 gas 价格 × 21000
        let gas_price = self.gas_price().await?;
        Ok(gas_price * TRANSFER_GAS)
    }

    async fn send_transfer(
        &self,
        account: &DerivedAccount,
        recipient: &str,
        amount: u128,
        fee: u128,
        network: &str,
    ) -> Result<String, WalletError> {
        self.check_network(network)?;
        if !AddressValidator::validate_evm(recipient) {
            return Err(WalletError::Validation(format!(
                "Invalid recipient address: {}",
                recipient
            )));
        }

        // 序列值：链上当前交易计数
        let nonce = self.transaction_count(&account.address).await?;
        let gas_price = (fee / TRANSFER_GAS).max(1);

        let private_key: [u8; 32] = hex::decode(&account.private_key)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| WalletError::Validation("Invalid private key encoding".into()))?;

        let raw_tx = self.sign_legacy_transfer(&private_key, recipient, amount, gas_price, nonce)?;

        tracing::info!(
            chain = %self.meta.key,
            from = %account.address,
            nonce,
            "Broadcasting transfer of {} wei",
            amount
        );

        let result = http::rpc_send(
            &self.client,
            &self.rpc_url,
            "eth_sendRawTransaction",
            json!([format!("0x{}", hex::encode(raw_tx))]),
        )
        .await?;

        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::Network("eth_sendRawTransaction returned no hash".into()))
    }

    async fn transfer_menu(
        &self,
        seed: &str,
        count: u32,
        network: &str,
    ) -> Result<TransferSummary, WalletError> {
        crate::service::transfer::interactive_transfer(
            self,
            seed,
            count,
            network,
            self.broadcast_delay_ms,
        )
        .await
    }
}
