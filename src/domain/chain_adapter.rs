//! 链适配器契约
//!
//! 每个链后端必须满足的能力接口。必选方法由 trait 静态保证——
//! 缺实现直接编译失败，而不是运行时才暴露的配置错误；
//! 可选能力有默认降级实现，调用方通过 capabilities() 探测后再调用

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::account::{BalanceSnapshot, DerivedAccount, ScannedAccount};
use crate::domain::transaction::TransactionRecord;
use crate::domain::transfer::TransferSummary;
use crate::error::WalletError;

/// 派生策略
///
/// 两种互不兼容的派生语义收敛在同一接口后面，用显式标签区分，
/// 调用方不得假设所有链都能 O(1) 随机访问索引
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationKind {
    /// 索引 i 的地址是 (seed, i) 的纯函数，O(1)
    DirectIndex,
    /// 索引 i 需要按序物化 0..=i，O(i)；
    /// 物化前缀只允许在单次调用内缓存，不得跨调用持久化
    SequentialReplay,
}

/// 静态链元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainMetadata {
    /// 链名称
    pub name: String,
    /// 币种符号
    pub symbol: String,
    /// 注册键（命令后缀）
    pub key: String,
    /// BIP44 coin type
    pub coin_type: u32,
    /// 支持的网络
    pub supported_networks: Vec<String>,
    /// 默认网络
    pub default_network: String,
    /// 基础单位精度
    pub decimals: u8,
    /// 派生策略
    pub derivation: DerivationKind,
    /// 逐账户余额查询间隔（尊重第三方限流）
    pub scan_delay_ms: u64,
    /// 固定手续费默认值（基础单位）
    pub default_fee: u128,
}

/// 可选能力标记
///
/// 调用缺失的可选能力会得到 Unsupported 错误而不是 panic，
/// 但调用方应当先探测再调用
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// 是否支持转账（send_transfer / transfer_menu）
    pub transfers: bool,
    /// 是否支持交易列表的可读展示
    pub view_transactions: bool,
    /// 是否支持按交易 id 拉取完整详情
    pub transaction_lookup: bool,
}

/// 链适配器契约
///
/// 实现不变量：适配器只能输出用自身声明的派生策略从给定种子和索引
/// 算出的地址，跨适配器地址复用不允许发生
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 必选方法（编译期保证实现）
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// 静态元数据
    fn metadata(&self) -> &ChainMetadata;

    /// 完整 BIP39 校验，任何派生前先行拒绝非法输入
    fn validate_seed_phrase(&self, seed: &str) -> Result<(), WalletError>;

    /// 快速派生 count 个账户（索引 0..count，不做任何网络调用）
    fn generate_addresses(
        &self,
        seed: &str,
        count: u32,
        network: &str,
    ) -> Result<Vec<DerivedAccount>, WalletError>;

    /// 查询单地址余额快照（含活跃性启发式所需的交易存在性检查）
    async fn get_balance(&self, address: &str, network: &str)
        -> Result<BalanceSnapshot, WalletError>;

    /// 地址的交易记录（分页）
    async fn get_transactions(
        &self,
        address: &str,
        network: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<TransactionRecord>, WalletError>;

    /// 按链定义的列头导出 CSV
    fn format_csv(&self, accounts: &[ScannedAccount]) -> String;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 默认提供的方法
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// 派生 + 逐账户余额查询（带固定间隔限速）
    ///
    /// 单账户的网络错误降级为零值快照并注记，不中断批量扫描
    async fn generate_accounts(
        &self,
        seed: &str,
        count: u32,
        network: &str,
    ) -> Result<Vec<ScannedAccount>, WalletError> {
        let accounts = self.generate_addresses(seed, count, network)?;
        let delay = std::time::Duration::from_millis(self.metadata().scan_delay_ms);

        let mut scanned = Vec::with_capacity(accounts.len());
        for (pos, account) in accounts.into_iter().enumerate() {
            if pos > 0 {
                tokio::time::sleep(delay).await;
            }

            let balance = match self.get_balance(&account.address, network).await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::warn!(
                        chain = %self.metadata().key,
                        address = %account.address,
                        "Balance lookup failed, degrading to zero: {}",
                        err
                    );
                    BalanceSnapshot::degraded(&err)
                }
            };
            tracing::debug!(
                chain = %self.metadata().key,
                index = account.index,
                balance = %balance.balance,
                "Scanned account"
            );
            scanned.push(ScannedAccount { account, balance });
        }
        Ok(scanned)
    }

    /// 导入流程：从外部助记词派生主地址（索引 0）并打上导入标记
    fn import_account(&self, seed: &str, network: &str) -> Result<DerivedAccount, WalletError> {
        let mut accounts = self.generate_addresses(seed, 1, network)?;
        let mut account = accounts
            .pop()
            .ok_or_else(|| WalletError::Validation("derivation produced no account".into()))?;
        account.imported = true;
        Ok(account)
    }

    /// 校验助记词在索引 0 是否派生出预期地址（大小写不敏感）
    fn verify_seed_derivation(
        &self,
        seed: &str,
        network: &str,
        expected_address: &str,
    ) -> Result<bool, WalletError> {
        let accounts = self.generate_addresses(seed, 1, network)?;
        let derived = accounts
            .first()
            .map(|account| account.address.as_str())
            .ok_or_else(|| WalletError::Validation("derivation produced no account".into()))?;
        let matches = derived.eq_ignore_ascii_case(expected_address.trim());
        if !matches {
            tracing::warn!(
                chain = %self.metadata().key,
                expected = %expected_address,
                derived = %derived,
                "Derivation mismatch"
            );
        }
        Ok(matches)
    }

    /// 可选能力标记，默认全关
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// 手续费估算，默认返回链的固定默认值
    async fn estimate_fee(&self, _network: &str) -> Result<u128, WalletError> {
        Ok(self.metadata().default_fee)
    }

    /// 校验网络是否受支持
    fn check_network(&self, network: &str) -> Result<(), WalletError> {
        let meta = self.metadata();
        if meta.supported_networks.iter().any(|n| n == network) {
            Ok(())
        } else {
            Err(WalletError::Validation(format!(
                "Unsupported network '{}' for {} (supported: {})",
                network,
                meta.name,
                meta.supported_networks.join(", ")
            )))
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 可选能力（探测 capabilities() 后调用）
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// 单账户签名并广播
    ///
    /// 实现内部自行获取账户的序列值（nonce 或等价物）；
    /// 广播被链上拒绝返回 BroadcastRejected，其余错误视为本地异常
    async fn send_transfer(
        &self,
        _account: &DerivedAccount,
        _recipient: &str,
        _amount: u128,
        _fee: u128,
        _network: &str,
    ) -> Result<String, WalletError> {
        Err(WalletError::Unsupported(format!(
            "transfers are not supported for {}",
            self.metadata().name
        )))
    }

    /// 交互式转账菜单（扫描 + 逐步输入 + 批量执行）
    async fn transfer_menu(
        &self,
        _seed: &str,
        _count: u32,
        _network: &str,
    ) -> Result<TransferSummary, WalletError> {
        Err(WalletError::Unsupported(format!(
            "transfer menu is not supported for {}",
            self.metadata().name
        )))
    }

    /// 按交易 id 拉取完整详情并分类
    async fn fetch_transaction(
        &self,
        _txid: &str,
        _network: &str,
    ) -> Result<TransactionRecord, WalletError> {
        Err(WalletError::Unsupported(format!(
            "transaction lookup is not supported for {}",
            self.metadata().name
        )))
    }

    /// 交易列表的可读展示
    async fn view_transactions(
        &self,
        _address: &str,
        _network: &str,
        _limit: u32,
    ) -> Result<String, WalletError> {
        Err(WalletError::Unsupported(format!(
            "transaction view is not supported for {}",
            self.metadata().name
        )))
    }
}

/// 地址数量参数校验（所有 generate 入口共用）
pub fn check_count(count: u32) -> Result<(), WalletError> {
    if count == 0 {
        return Err(WalletError::Validation(
            "address count must be a positive number".into(),
        ));
    }
    Ok(())
}
