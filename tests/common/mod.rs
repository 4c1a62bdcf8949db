//! 测试辅助模块
//!
//! 可编程的假适配器：余额、广播结果都可预置，
//! 用于在不访问网络的情况下验证扫描与转账编排

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chainseed::domain::account::{BalanceSnapshot, DerivedAccount, ScannedAccount};
use chainseed::domain::chain_adapter::{
    check_count, Capabilities, ChainAdapter, ChainMetadata, DerivationKind,
};
use chainseed::domain::transaction::TransactionRecord;
use chainseed::error::WalletError;

/// BIP39 标准测试助记词
pub const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// 可编程假链
pub struct MockChain {
    meta: ChainMetadata,
    /// index → 可花余额
    pub balances: HashMap<u32, u128>,
    /// 广播即被拒绝的地址
    pub reject: HashSet<String>,
    /// 本地异常的地址
    pub fail_locally: HashSet<String>,
    /// 已广播记录 (from, amount)
    pub broadcasts: Mutex<Vec<(String, u128)>>,
    pub with_transfers: bool,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            meta: ChainMetadata {
                name: "Mockchain".to_string(),
                symbol: "MCK".to_string(),
                key: "mock".to_string(),
                coin_type: 1,
                supported_networks: vec!["mainnet".to_string()],
                default_network: "mainnet".to_string(),
                decimals: 6,
                derivation: DerivationKind::DirectIndex,
                // 测试不等真实限速
                scan_delay_ms: 0,
                default_fee: 100,
            },
            balances: HashMap::new(),
            reject: HashSet::new(),
            fail_locally: HashSet::new(),
            broadcasts: Mutex::new(vec![]),
            with_transfers: true,
        }
    }

    pub fn with_balance(mut self, index: u32, amount: u128) -> Self {
        self.balances.insert(index, amount);
        self
    }

    pub fn address_for(index: u32) -> String {
        format!("MOCK000000000000000000000000000{:04}", index)
    }
}

#[async_trait]
impl ChainAdapter for MockChain {
    fn metadata(&self) -> &ChainMetadata {
        &self.meta
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            transfers: self.with_transfers,
            view_transactions: false,
            transaction_lookup: false,
        }
    }

    fn validate_seed_phrase(&self, seed: &str) -> Result<(), WalletError> {
        if seed.trim().is_empty() {
            return Err(WalletError::Validation("empty seed phrase".into()));
        }
        Ok(())
    }

    fn generate_addresses(
        &self,
        _seed: &str,
        count: u32,
        _network: &str,
    ) -> Result<Vec<DerivedAccount>, WalletError> {
        check_count(count)?;
        Ok((0..count)
            .map(|index| DerivedAccount {
                index,
                address: Self::address_for(index),
                private_key: format!("{:064x}", index + 1),
                derivation_path: format!("m/44'/1'/0'/0/{}", index),
                imported: false,
            })
            .collect())
    }

    async fn get_balance(
        &self,
        address: &str,
        _network: &str,
    ) -> Result<BalanceSnapshot, WalletError> {
        let balance = self
            .balances
            .iter()
            .find(|(index, _)| Self::address_for(**index) == address)
            .map(|(_, amount)| *amount)
            .unwrap_or(0);
        Ok(BalanceSnapshot::simple(balance, 6, balance > 0))
    }

    async fn get_transactions(
        &self,
        _address: &str,
        _network: &str,
        _limit: u32,
        _offset: u32,
    ) -> Result<Vec<TransactionRecord>, WalletError> {
        Ok(vec![])
    }

    fn format_csv(&self, accounts: &[ScannedAccount]) -> String {
        let mut csv = String::from("Index,Address,Derivation Path,Private Key,Balance (MCK),Active\n");
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
        _recipient: &str,
        amount: u128,
        _fee: u128,
        _network: &str,
    ) -> Result<String, WalletError> {
        if !self.with_transfers {
            return Err(WalletError::Unsupported(
                "transfers are not supported for Mockchain".into(),
            ));
        }
        if self.reject.contains(&account.address) {
            return Err(WalletError::BroadcastRejected("ConflictingNonceInMempool".into()));
        }
        if self.fail_locally.contains(&account.address) {
            return Err(WalletError::Validation("signing failure".into()));
        }

        self.broadcasts
            .lock()
            .expect("broadcast log lock")
            .push((account.address.clone(), amount));
        Ok(format!("0xmock{:08}", account.index))
    }
}
