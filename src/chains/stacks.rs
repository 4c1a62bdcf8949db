//! Stacks 适配器
//!
//! 派生策略是顺序重放：钱包 SDK 只有"下一个账户"语义，索引 i 需要按序
//! 物化 0..=i，成本 O(i)；物化前缀只在单次调用内复用，不跨调用缓存，
//! 避免索引编号与外部钱包状态脱节。
//! 地址为 c32check 编码的 hash160(压缩公钥)，余额区分可花/锁仓两段，
//! STX token transfer 交易按 SIP-005 线格式手工序列化并签名

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{ChainSettings, EngineSettings};
use crate::domain::account::{BalanceSnapshot, DerivedAccount, ScannedAccount};
use crate::domain::chain_adapter::{
    check_count, Capabilities, ChainAdapter, ChainMetadata, DerivationKind,
};
use crate::domain::derivation::{derive_secp256k1, Secp256k1Key};
use crate::domain::seed::seed_bytes;
use crate::domain::transaction::{TransactionKind, TransactionRecord};
use crate::domain::transfer::TransferSummary;
use crate::error::WalletError;
use crate::infrastructure::http;
use crate::service::inspector::parse_disbursement;
use crate::utils::c32;

pub struct StacksChain {
    meta: ChainMetadata,
    rpc_url: String,
    testnet_rpc_url: Option<String>,
    broadcast_delay_ms: u64,
    client: reqwest::Client,
}

impl StacksChain {
    pub fn new(settings: &ChainSettings, engine: &EngineSettings) -> Self {
        let mut networks = vec!["mainnet".to_string()];
        if settings.testnet_rpc_url.is_some() {
            networks.push("testnet".to_string());
        }

        Self {
            meta: ChainMetadata {
                name: settings.name.clone(),
                symbol: settings.symbol.clone(),
                key: "stacks".to_string(),
                coin_type: 5757,
                supported_networks: networks,
                default_network: "mainnet".to_string(),
                decimals: settings.decimals,
                derivation: DerivationKind::SequentialReplay,
                scan_delay_ms: settings.scan_delay_ms,
                default_fee: settings.default_fee,
            },
            rpc_url: settings.rpc_url.clone(),
            testnet_rpc_url: settings.testnet_rpc_url.clone(),
            broadcast_delay_ms: engine.broadcast_delay_ms,
            client: http::build_client(engine.http_timeout_secs),
        }
    }

    fn api_for(&self, network: &str) -> &str {
        match network {
            "testnet" => self.testnet_rpc_url.as_deref().unwrap_or(&self.rpc_url),
            _ => &self.rpc_url,
        }
    }

    fn address_version(network: &str) -> u8 {
        if network == "testnet" {
            c32::VERSION_TESTNET_P2PKH
        } else {
            c32::VERSION_MAINNET_P2PKH
        }
    }

    /// 顺序物化 0..count 的密钥
    ///
    /// 重放语义：每个索引都在前一个的基础上继续，整个前缀在本次调用内
    /// 一次算完（单调用内缓存），调用结束即丢弃
    fn materialize_keys(seed: &[u8], count: u32) -> Result<Vec<Secp256k1Key>, WalletError> {
        let mut keys = Vec::with_capacity(count as usize);
        for index in 0..count {
            let path = format!("m/44'/5757'/0'/0/{}", index);
            let key = derive_secp256k1(seed, &path)
                .map_err(|e| WalletError::Validation(e.to_string()))?;
            keys.push(key);
        }
        Ok(keys)
    }

    fn account_from_key(key: &Secp256k1Key, index: u32, network: &str) -> DerivedAccount {
        let hash = codec::hash160(&key.public_key_compressed);
        let address = c32::c32_address(Self::address_version(network), &hash);

        DerivedAccount {
            index,
            address,
            // 压缩公钥约定：私钥 hex 带 01 后缀
            private_key: format!("{}01", hex::encode(key.private_key)),
            derivation_path: format!("m/44'/5757'/0'/0/{}", index),
            imported: false,
        }
    }

    fn private_key_bytes(account: &DerivedAccount) -> Result<[u8; 32], WalletError> {
        let hex_key = account
            .private_key
            .strip_suffix("01")
            .filter(|rest| rest.len() == 64)
            .unwrap_or(&account.private_key);
        hex::decode(hex_key)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| WalletError::Validation("Invalid private key encoding".into()))
    }

    /// /v2/accounts 返回总余额、锁仓和 nonce（金额为 0x 前缀的 microSTX）
    async fn fetch_account(&self, address: &str, network: &str) -> Result<Value, WalletError> {
        let url = format!("{}/v2/accounts/{}?proof=0", self.api_for(network), address);
        http::get_json(&self.client, &url).await
    }

    fn record_from_json(tx: Value) -> TransactionRecord {
        let kind = tx
            .get("tx_type")
            .and_then(Value::as_str)
            .map(TransactionKind::from_api_type)
            .unwrap_or_else(|| TransactionKind::Other("unknown".to_string()));

        let function_name = tx
            .pointer("/contract_call/function_name")
            .and_then(Value::as_str)
            .map(str::to_string);

        // send-many 形态的合约调用：从参数的文本 repr 提取收款列表
        let recipients = if kind == TransactionKind::ContractCall
            && function_name
                .as_deref()
                .map(|name| name.contains("send-many") || name.contains("send_many"))
                .unwrap_or(false)
        {
            tx.pointer("/contract_call/function_args")
                .and_then(Value::as_array)
                .map(|args| {
                    args.iter()
                        .filter_map(|arg| arg.get("repr").and_then(Value::as_str))
                        .flat_map(parse_disbursement)
                        .collect()
                })
                .unwrap_or_default()
        } else {
            vec![]
        };

        TransactionRecord {
            txid: tx
                .get("tx_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            kind,
            status: tx
                .get("tx_status")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            sender: tx
                .get("sender_address")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            function_name,
            recipients,
            raw: tx,
        }
    }
}

#[async_trait]
impl ChainAdapter for StacksChain {
    fn metadata(&self) -> &ChainMetadata {
        &self.meta
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            transfers: true,
            view_transactions: true,
            transaction_lookup: true,
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

        // O(count)：顺序重放整个前缀
        let keys = Self::materialize_keys(&seed, count)?;
        Ok(keys
            .iter()
            .enumerate()
            .map(|(index, key)| Self::account_from_key(key, index as u32, network))
            .collect())
    }

    async fn get_balance(
        &self,
        address: &str,
        network: &str,
    ) -> Result<BalanceSnapshot, WalletError> {
        self.check_network(network)?;

        let data = self.fetch_account(address, network).await?;

        let total = data
            .get("balance")
            .map(http::parse_quantity)
            .transpose()?
            .unwrap_or(0);
        let locked = data
            .get("locked")
            .map(http::parse_quantity)
            .transpose()?
            .unwrap_or(0);
        let nonce = data.get("nonce").and_then(Value::as_u64).unwrap_or(0);

        // 可花 = 总额 − 锁仓；nonce > 0 说明有过出账
        Ok(BalanceSnapshot::with_locked(
            total.saturating_sub(locked),
            locked,
            self.meta.decimals,
            nonce > 0,
        ))
    }

    async fn get_transactions(
        &self,
        address: &str,
        network: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<TransactionRecord>, WalletError> {
        self.check_network(network)?;

        let url = format!(
            "{}/extended/v1/address/{}/transactions?limit={}&offset={}",
            self.api_for(network),
            address,
            limit,
            offset
        );
        let body = http::get_json(&self.client, &url).await?;

        let records = body
            .get("results")
            .and_then(Value::as_array)
            .map(|results| results.iter().cloned().map(Self::record_from_json).collect())
            .unwrap_or_default();
        Ok(records)
    }

    fn format_csv(&self, accounts: &[ScannedAccount]) -> String {
        let mut csv = format!(
            "Index,Address,Derivation Path,Private Key,Balance ({0}),Locked ({0}),Active\n",
            self.meta.symbol
        );
        for scanned in accounts {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                scanned.account.index,
                scanned.account.address,
                scanned.account.derivation_path,
                scanned.account.private_key,
                scanned.balance.balance,
                scanned.balance.locked.as_deref().unwrap_or("0"),
                scanned.balance.has_activity(),
            ));
        }
        csv
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

        let (recipient_version, recipient_hash) = c32::c32_address_decode(recipient)
            .map_err(|e| WalletError::Validation(format!("Invalid recipient address: {}", e)))?;

        // 序列值：链上当前 nonce
        let account_data = self.fetch_account(&account.address, network).await?;
        let nonce = account_data
            .get("nonce")
            .and_then(Value::as_u64)
            .ok_or_else(|| WalletError::Network("Account response missing nonce".into()))?;

        let private_key = Self::private_key_bytes(account)?;
        let amount_ustx = u64::try_from(amount)
            .map_err(|_| WalletError::Validation("Amount exceeds u64 microSTX".into()))?;
        let fee_ustx = u64::try_from(fee)
            .map_err(|_| WalletError::Validation("Fee exceeds u64 microSTX".into()))?;

        let transfer = codec::TokenTransfer {
            nonce,
            fee: fee_ustx,
            recipient_version,
            recipient_hash,
            amount: amount_ustx,
            memo: codec::encode_memo(""),
            mainnet: network != "testnet",
        };
        let (raw_tx, txid) = codec::sign_token_transfer(&transfer, &private_key)
            .map_err(|e| WalletError::Validation(e.to_string()))?;

        tracing::info!(
            chain = %self.meta.key,
            from = %account.address,
            nonce,
            "Broadcasting transfer of {} uSTX",
            amount_ustx
        );

        // 广播：POST /v2/transactions，原始字节
        let url = format!("{}/v2/transactions", self.api_for(network));
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .body(raw_tx)
            .send()
            .await
            .map_err(|e| WalletError::Network(format!("Broadcast request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .unwrap_or(Value::Null);

        if !status.is_success() {
            let reason = body
                .get("reason")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("broadcast rejected");
            return Err(WalletError::BroadcastRejected(format!(
                "{} (status {})",
                reason, status
            )));
        }

        // 节点返回不带 0x 的 txid 字符串
        let returned = body.as_str().map(str::to_string).unwrap_or(txid);
        Ok(returned)
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

    async fn fetch_transaction(
        &self,
        txid: &str,
        network: &str,
    ) -> Result<TransactionRecord, WalletError> {
        self.check_network(network)?;

        let url = format!("{}/extended/v1/tx/{}", self.api_for(network), txid);
        let body = http::get_json(&self.client, &url).await?;
        Ok(Self::record_from_json(body))
    }

    async fn view_transactions(
        &self,
        address: &str,
        network: &str,
        limit: u32,
    ) -> Result<String, WalletError> {
        let records = self.get_transactions(address, network, limit, 0).await?;
        if records.is_empty() {
            return Ok(format!("No transactions found for {}", address));
        }

        let mut out = format!("Transactions for {} ({} shown)\n", address, records.len());
        for record in &records {
            out.push_str(&format!(
                "  [{}] {} {}\n",
                record.status, record.kind, record.txid
            ));
            if !record.recipients.is_empty() {
                out.push_str(&format!(
                    "      send-many with {} recipients\n",
                    record.recipients.len()
                ));
            }
        }
        Ok(out)
    }
}

/// STX token transfer 的 SIP-005 线格式序列化与签名
pub mod codec {
    use anyhow::Result;
    use ripemd::Ripemd160;
    use sha2::{Digest, Sha256, Sha512_256};

    const AUTH_TYPE_STANDARD: u8 = 0x04;
    const HASH_MODE_P2PKH: u8 = 0x00;
    const KEY_ENCODING_COMPRESSED: u8 = 0x00;
    const ANCHOR_MODE_ANY: u8 = 0x03;
    const POST_CONDITION_MODE_DENY: u8 = 0x02;
    const CLARITY_PRINCIPAL_STANDARD: u8 = 0x05;
    const PAYLOAD_TOKEN_TRANSFER: u8 = 0x00;
    /// memo 字段固定 34 字节，零填充
    pub const MEMO_LENGTH: usize = 34;

    /// hash160 = RIPEMD160(SHA256(data))
    pub fn hash160(data: &[u8]) -> [u8; 20] {
        let sha = Sha256::digest(data);
        let ripe = Ripemd160::digest(sha);
        let mut out = [0u8; 20];
        out.copy_from_slice(&ripe);
        out
    }

    pub fn encode_memo(memo: &str) -> [u8; MEMO_LENGTH] {
        let mut out = [0u8; MEMO_LENGTH];
        let bytes = memo.as_bytes();
        let len = bytes.len().min(MEMO_LENGTH);
        out[..len].copy_from_slice(&bytes[..len]);
        out
    }

    pub struct TokenTransfer {
        pub nonce: u64,
        pub fee: u64,
        pub recipient_version: u8,
        pub recipient_hash: [u8; 20],
        pub amount: u64,
        pub memo: [u8; MEMO_LENGTH],
        pub mainnet: bool,
    }

    fn sha512_256(data: &[u8]) -> [u8; 32] {
        let digest = Sha512_256::digest(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }

    /// 按给定 fee/nonce/签名序列化完整交易
    fn serialize(
        transfer: &TokenTransfer,
        signer: &[u8; 20],
        fee: u64,
        nonce: u64,
        signature: &[u8; 65],
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);

        // version + chain id
        if transfer.mainnet {
            out.push(0x00);
            out.extend_from_slice(&0x0000_0001u32.to_be_bytes());
        } else {
            out.push(0x80);
            out.extend_from_slice(&0x8000_0000u32.to_be_bytes());
        }

        // 标准单签 spending condition
        out.push(AUTH_TYPE_STANDARD);
        out.push(HASH_MODE_P2PKH);
        out.extend_from_slice(signer);
        out.extend_from_slice(&nonce.to_be_bytes());
        out.extend_from_slice(&fee.to_be_bytes());
        out.push(KEY_ENCODING_COMPRESSED);
        out.extend_from_slice(signature);

        out.push(ANCHOR_MODE_ANY);
        out.push(POST_CONDITION_MODE_DENY);
        out.extend_from_slice(&0u32.to_be_bytes()); // 无 post conditions

        // token transfer payload
        out.push(PAYLOAD_TOKEN_TRANSFER);
        out.push(CLARITY_PRINCIPAL_STANDARD);
        out.push(transfer.recipient_version);
        out.extend_from_slice(&transfer.recipient_hash);
        out.extend_from_slice(&transfer.amount.to_be_bytes());
        out.extend_from_slice(&transfer.memo);

        out
    }

    /// 签名并返回 (原始交易字节, txid hex)
    ///
    /// SIP-005 签名流程：
    /// 1. 初始 sighash = sha512/256(fee/nonce/签名清零的交易)
    /// 2. presign = sha512/256(sighash || auth_type || fee || nonce)
    /// 3. 对 presign 做可恢复 ECDSA，签名为 recovery_id || r || s
    pub fn sign_token_transfer(
        transfer: &TokenTransfer,
        private_key: &[u8; 32],
    ) -> Result<(Vec<u8>, String)> {
        use k256::ecdsa::SigningKey;

        let signing_key = SigningKey::from_bytes(private_key.into())
            .map_err(|e| anyhow::anyhow!("Invalid private key: {}", e))?;
        let public_key = signing_key.verifying_key().to_encoded_point(true);
        let signer = hash160(public_key.as_bytes());

        // 1. fee/nonce/签名清零后的初始 sighash
        let cleared = serialize(transfer, &signer, 0, 0, &[0u8; 65]);
        let initial_sighash = sha512_256(&cleared);

        // 2. presign hash
        let mut presign_input = Vec::with_capacity(32 + 1 + 8 + 8);
        presign_input.extend_from_slice(&initial_sighash);
        presign_input.push(AUTH_TYPE_STANDARD);
        presign_input.extend_from_slice(&transfer.fee.to_be_bytes());
        presign_input.extend_from_slice(&transfer.nonce.to_be_bytes());
        let presign = sha512_256(&presign_input);

        // 3. 可恢复签名
        let (signature, recovery_id) = signing_key
            .sign_prehash_recoverable(&presign)
            .map_err(|e| anyhow::anyhow!("Signing failed: {}", e))?;

        let mut vrs = [0u8; 65];
        vrs[0] = recovery_id.to_byte();
        vrs[1..].copy_from_slice(&signature.to_bytes());

        let raw = serialize(transfer, &signer, transfer.fee, transfer.nonce, &vrs);
        let txid = hex::encode(sha512_256(&raw));
        Ok((raw, txid))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn transfer() -> TokenTransfer {
            TokenTransfer {
                nonce: 3,
                fee: 3_000,
                recipient_version: crate::utils::c32::VERSION_MAINNET_P2PKH,
                recipient_hash: [0x11u8; 20],
                amount: 1_000_000,
                memo: encode_memo("test"),
                mainnet: true,
            }
        }

        #[test]
        fn test_memo_padding() {
            let memo = encode_memo("hello");
            assert_eq!(&memo[..5], b"hello");
            assert!(memo[5..].iter().all(|&b| b == 0));
            assert_eq!(memo.len(), MEMO_LENGTH);

            // 超长截断
            let long = encode_memo(&"x".repeat(100));
            assert_eq!(long.len(), MEMO_LENGTH);
        }

        #[test]
        fn test_serialized_layout() {
            let private_key = [0x01u8; 32];
            let (raw, txid) = sign_token_transfer(&transfer(), &private_key).unwrap();

            // version + chain id
            assert_eq!(raw[0], 0x00);
            assert_eq!(&raw[1..5], &[0x00, 0x00, 0x00, 0x01]);
            // auth type + hash mode
            assert_eq!(raw[5], 0x04);
            assert_eq!(raw[6], 0x00);
            // nonce 在 signer 之后
            assert_eq!(&raw[27..35], &3u64.to_be_bytes());
            assert_eq!(&raw[35..43], &3_000u64.to_be_bytes());

            assert_eq!(txid.len(), 64);
        }

        #[test]
        fn test_signing_deterministic() {
            let private_key = [0x01u8; 32];
            let (raw1, txid1) = sign_token_transfer(&transfer(), &private_key).unwrap();
            let (raw2, txid2) = sign_token_transfer(&transfer(), &private_key).unwrap();
            assert_eq!(raw1, raw2);
            assert_eq!(txid1, txid2);

            // fee 参与签名：改 fee 必然改 txid
            let mut bumped = transfer();
            bumped.fee = 4_000;
            let (_, txid3) = sign_token_transfer(&bumped, &private_key).unwrap();
            assert_ne!(txid1, txid3);
        }
    }
}
