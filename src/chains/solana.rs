//! Solana 适配器
//!
//! SLIP-0010 ed25519 派生（m/44'/501'/{index}'/0'），地址即公钥的 Base58。
//! 系统转账指令手工序列化（legacy message 格式），签名后 base64 广播。
//! 序列值等价物是 recent blockhash，在签名时获取

use async_trait::async_trait;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use serde_json::json;

use crate::config::{ChainSettings, EngineSettings};
use crate::domain::account::{BalanceSnapshot, DerivedAccount, ScannedAccount};
use crate::domain::chain_adapter::{
    check_count, Capabilities, ChainAdapter, ChainMetadata, DerivationKind,
};
use crate::domain::derivation::derive_slip10_ed25519;
use crate::domain::seed::seed_bytes;
use crate::domain::transaction::{TransactionKind, TransactionRecord};
use crate::domain::transfer::TransferSummary;
use crate::error::WalletError;
use crate::infrastructure::http;
use crate::utils::address::AddressValidator;

/// System Program 地址（全零公钥）
const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

pub struct SolanaChain {
    meta: ChainMetadata,
    rpc_url: String,
    testnet_rpc_url: Option<String>,
    broadcast_delay_ms: u64,
    client: reqwest::Client,
}

impl SolanaChain {
    pub fn new(settings: &ChainSettings, engine: &EngineSettings) -> Self {
        let mut networks = vec!["mainnet".to_string()];
        if settings.testnet_rpc_url.is_some() {
            networks.push("devnet".to_string());
        }

        Self {
            meta: ChainMetadata {
                name: settings.name.clone(),
                symbol: settings.symbol.clone(),
                key: "sol".to_string(),
                coin_type: 501,
                supported_networks: networks,
                default_network: "mainnet".to_string(),
                decimals: settings.decimals,
                derivation: DerivationKind::DirectIndex,
                scan_delay_ms: settings.scan_delay_ms,
                default_fee: settings.default_fee,
            },
            rpc_url: settings.rpc_url.clone(),
            testnet_rpc_url: settings.testnet_rpc_url.clone(),
            broadcast_delay_ms: engine.broadcast_delay_ms,
            client: http::build_client(engine.http_timeout_secs),
        }
    }

    fn rpc_for(&self, network: &str) -> &str {
        match network {
            "devnet" => self.testnet_rpc_url.as_deref().unwrap_or(&self.rpc_url),
            _ => &self.rpc_url,
        }
    }

    fn derivation_path(index: u32) -> String {
        format!("m/44'/501'/{}'/0'", index)
    }

    fn keypair_from_account(account: &DerivedAccount) -> Result<SigningKey, WalletError> {
        let seed: [u8; 32] = hex::decode(&account.private_key)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| WalletError::Validation("Invalid private key encoding".into()))?;
        Ok(SigningKey::from_bytes(&seed))
    }

    async fn signatures_for(
        &self,
        address: &str,
        network: &str,
        limit: u32,
    ) -> Result<Vec<serde_json::Value>, WalletError> {
        let result = http::rpc_call(
            &self.client,
            self.rpc_for(network),
            "getSignaturesForAddress",
            json!([address, { "limit": limit }]),
        )
        .await?;
        Ok(result.as_array().cloned().unwrap_or_default())
    }
}

/// Solana 紧凑长度前缀（compact-u16）
fn shortvec_len(len: usize, out: &mut Vec<u8>) {
    let mut remaining = len as u16;
    loop {
        let mut byte = (remaining & 0x7f) as u8;
        remaining >>= 7;
        if remaining != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if remaining == 0 {
            break;
        }
    }
}

/// 序列化 legacy 转账消息
///
/// 账户顺序：[付款方(签名者), 收款方, System Program]；
/// 指令数据：u32 LE 指令号 2 (Transfer) + u64 LE lamports
fn build_transfer_message(
    from: &[u8; 32],
    to: &[u8; 32],
    recent_blockhash: &[u8; 32],
    lamports: u64,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(1 + 2 + 1 + 32 * 3 + 32 + 16);

    // header: 1 个签名者，0 个只读签名账户，1 个只读非签名账户（program）
    message.extend_from_slice(&[1, 0, 1]);

    // account keys
    shortvec_len(3, &mut message);
    message.extend_from_slice(from);
    message.extend_from_slice(to);
    message.extend_from_slice(&SYSTEM_PROGRAM_ID);

    message.extend_from_slice(recent_blockhash);

    // instructions
    shortvec_len(1, &mut message);
    message.push(2); // program_id index
    shortvec_len(2, &mut message);
    message.extend_from_slice(&[0, 1]); // from, to
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&2u32.to_le_bytes()); // SystemInstruction::Transfer
    data.extend_from_slice(&lamports.to_le_bytes());
    shortvec_len(data.len(), &mut message);
    message.extend_from_slice(&data);

    message
}

#[async_trait]
impl ChainAdapter for SolanaChain {
    fn metadata(&self) -> &ChainMetadata {
        &self.meta
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            transfers: true,
            view_transactions: true,
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
            let derived = derive_slip10_ed25519(&seed, &path)
                .map_err(|e| WalletError::Validation(e.to_string()))?;
            let signing_key = SigningKey::from_bytes(&derived);
            let address = bs58::encode(signing_key.verifying_key().to_bytes()).into_string();

            accounts.push(DerivedAccount {
                index,
                address,
                private_key: hex::encode(derived),
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
            self.rpc_for(network),
            "getBalance",
            json!([address]),
        )
        .await?;
        let lamports = result
            .get("value")
            .map(http::parse_quantity)
            .transpose()?
            .unwrap_or(0);

        // 活跃性：至少一条签名记录
        let signatures = self.signatures_for(address, network, 1).await?;

        Ok(BalanceSnapshot::simple(
            lamports,
            self.meta.decimals,
            !signatures.is_empty(),
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

        // getSignaturesForAddress 只支持 limit 和游标，offset 在客户端跳过
        let signatures = self
            .signatures_for(address, network, limit + offset)
            .await?;

        let records = signatures
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|entry| {
                let failed = entry.get("err").map(|e| !e.is_null()).unwrap_or(false);
                TransactionRecord {
                    txid: entry
                        .get("signature")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    kind: TransactionKind::Other("signature".to_string()),
                    status: (if failed { "failed" } else { "success" }).to_string(),
                    sender: address.to_string(),
                    function_name: None,
                    recipients: vec![],
                    raw: entry,
                }
            })
            .collect();
        Ok(records)
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

    async fn send_transfer(
        &self,
        account: &DerivedAccount,
        recipient: &str,
        amount: u128,
        _fee: u128,
        network: &str,
    ) -> Result<String, WalletError> {
        self.check_network(network)?;
        if !AddressValidator::validate_solana(recipient) {
            return Err(WalletError::Validation(format!(
                "Invalid recipient address: {}",
                recipient
            )));
        }
        if recipient == account.address {
            return Err(WalletError::Validation(
                "Recipient must differ from source account".into(),
            ));
        }

        let signing_key = Self::keypair_from_account(account)?;
        let from_pubkey = signing_key.verifying_key().to_bytes();
        let to_pubkey: [u8; 32] = bs58::decode(recipient)
            .into_vec()
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| WalletError::Validation("Invalid recipient pubkey".into()))?;

        // 序列值等价物：recent blockhash
        let rpc_url = self.rpc_for(network);
        let blockhash_result = http::rpc_call(
            &self.client,
            rpc_url,
            "getLatestBlockhash",
            json!([{ "commitment": "confirmed" }]),
        )
        .await?;
        let blockhash: [u8; 32] = blockhash_result
            .pointer("/value/blockhash")
            .and_then(serde_json::Value::as_str)
            .and_then(|s| bs58::decode(s).into_vec().ok())
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| WalletError::Network("getLatestBlockhash returned no blockhash".into()))?;

        let lamports = u64::try_from(amount)
            .map_err(|_| WalletError::Validation("Amount exceeds u64 lamports".into()))?;
        let message = build_transfer_message(&from_pubkey, &to_pubkey, &blockhash, lamports);

        // 签名并组装完整交易：shortvec(签名数) || 签名 || message
        let signature = signing_key.sign(&message);
        let mut tx = Vec::with_capacity(1 + 64 + message.len());
        shortvec_len(1, &mut tx);
        tx.extend_from_slice(&signature.to_bytes());
        tx.extend_from_slice(&message);

        let tx_base64 = base64::engine::general_purpose::STANDARD.encode(&tx);

        tracing::info!(
            chain = %self.meta.key,
            from = %account.address,
            "Broadcasting transfer of {} lamports",
            lamports
        );

        let result = http::rpc_send(
            &self.client,
            rpc_url,
            "sendTransaction",
            json!([
                tx_base64,
                {
                    "encoding": "base64",
                    "skipPreflight": false,
                    "preflightCommitment": "confirmed",
                    "maxRetries": 3
                }
            ]),
        )
        .await?;

        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::Network("sendTransaction returned no signature".into()))
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
            out.push_str(&format!("  [{}] {}\n", record.status, record.txid));
        }
        Ok(out)
    }
}
