//! 派生账户与钱包文件结构
//!
//! WalletFile 是核心与外围工具（查找、转账、机器人前端）交换的唯一
//! 持久化格式；字段名采用 camelCase，与既有文件保持兼容

use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::utils::units::format_units;

fn is_false(v: &bool) -> bool {
    !v
}

/// 派生账户
///
/// 确定性保证：相同 (seed, chain, index) 永远产生相同的账户。
/// 私钥以值传递，引擎不做任何托管管理
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedAccount {
    /// 派生索引
    pub index: u32,
    /// 链地址
    pub address: String,
    /// 私钥 (hex 编码)
    pub private_key: String,
    /// 派生路径
    pub derivation_path: String,
    /// 是否来自导入流程（由外部助记词在固定索引派生）
    #[serde(default, skip_serializing_if = "is_false")]
    pub imported: bool,
}

/// 余额快照
///
/// 账户模型且有质押概念的链（Stacks）区分可花/锁仓两部分；
/// 其余链只有单一余额。网络错误降级为零值并写入 error 注记
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    /// 可花余额（十进制显示）
    pub balance: String,
    /// 可花余额（基础单位）
    pub raw_balance: u128,
    /// 锁仓余额（十进制显示，仅质押型链）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<String>,
    /// 锁仓余额（基础单位）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_locked: Option<u128>,
    /// 交易记录查询是否返回过至少一条结果
    pub has_transactions: bool,
    /// 网络错误降级注记
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BalanceSnapshot {
    /// 单一余额链的快照
    pub fn simple(raw_balance: u128, decimals: u8, has_transactions: bool) -> Self {
        Self {
            balance: format_units(raw_balance, decimals),
            raw_balance,
            locked: None,
            raw_locked: None,
            has_transactions,
            error: None,
        }
    }

    /// 可花/锁仓两段式快照
    pub fn with_locked(
        raw_available: u128,
        raw_locked: u128,
        decimals: u8,
        has_transactions: bool,
    ) -> Self {
        Self {
            balance: format_units(raw_available, decimals),
            raw_balance: raw_available,
            locked: Some(format_units(raw_locked, decimals)),
            raw_locked: Some(raw_locked),
            has_transactions,
            error: None,
        }
    }

    /// 网络错误降级：零值 + 错误注记，不中断批量扫描
    pub fn degraded(err: &WalletError) -> Self {
        Self {
            balance: "0".to_string(),
            raw_balance: 0,
            locked: None,
            raw_locked: None,
            has_transactions: false,
            error: Some(err.annotation()),
        }
    }

    /// 总余额 = 可花 + 锁仓
    pub fn total_raw(&self) -> u128 {
        self.raw_balance + self.raw_locked.unwrap_or(0)
    }

    /// 活跃性启发式：余额非零，或交易记录查询返回过结果
    pub fn has_activity(&self) -> bool {
        self.total_raw() > 0 || self.has_transactions
    }
}

/// 扫描后的账户（派生信息 + 余额快照）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedAccount {
    #[serde(flatten)]
    pub account: DerivedAccount,
    #[serde(flatten)]
    pub balance: BalanceSnapshot,
}

/// 钱包文件中的单条地址记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEntry {
    #[serde(flatten)]
    pub account: DerivedAccount,
    /// generate（快速模式）生成的文件没有余额字段
    #[serde(flatten)]
    pub balance: Option<BalanceSnapshot>,
}

impl From<ScannedAccount> for WalletEntry {
    fn from(scanned: ScannedAccount) -> Self {
        Self {
            account: scanned.account,
            balance: Some(scanned.balance),
        }
    }
}

impl From<DerivedAccount> for WalletEntry {
    fn from(account: DerivedAccount) -> Self {
        Self {
            account,
            balance: None,
        }
    }
}

/// 钱包文件
///
/// 生成/扫描时一次性写出，除显式重新生成外不可变；
/// 由查找与转账工具消费
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletFile {
    pub blockchain: String,
    pub wallet_name: String,
    pub network: String,
    pub total_addresses: u32,
    /// ISO-8601 时间戳
    pub generated_at: String,
    pub addresses: Vec<WalletEntry>,
}

impl WalletFile {
    pub fn new(
        blockchain: &str,
        wallet_name: &str,
        network: &str,
        addresses: Vec<WalletEntry>,
    ) -> Self {
        Self {
            blockchain: blockchain.to_string(),
            wallet_name: wallet_name.to_string(),
            network: network.to_string(),
            total_addresses: addresses.len() as u32,
            generated_at: chrono::Utc::now().to_rfc3339(),
            addresses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_decomposition() {
        let snapshot = BalanceSnapshot::with_locked(1_500_000, 500_000, 6, true);

        // total == spendable + locked
        assert_eq!(snapshot.total_raw(), 2_000_000);
        assert_eq!(snapshot.balance, "1.5");
        assert_eq!(snapshot.locked.as_deref(), Some("0.5"));
    }

    #[test]
    fn test_activity_heuristic() {
        let empty = BalanceSnapshot::simple(0, 9, false);
        assert!(!empty.has_activity());

        // 余额为零但有交易记录，仍视为活跃
        let swept = BalanceSnapshot::simple(0, 9, true);
        assert!(swept.has_activity());

        let funded = BalanceSnapshot::simple(1, 9, false);
        assert!(funded.has_activity());
    }

    #[test]
    fn test_wallet_file_serde_camel_case() {
        let account = DerivedAccount {
            index: 0,
            address: "SP000000000000000000002Q6VF78".to_string(),
            private_key: "00".repeat(32),
            derivation_path: "m/44'/5757'/0'/0/0".to_string(),
            imported: false,
        };
        let file = WalletFile::new("Stacks", "stx_wallets", "mainnet", vec![account.into()]);

        let json = serde_json::to_value(&file).unwrap();
        assert!(json.get("walletName").is_some());
        assert!(json.get("totalAddresses").is_some());
        assert_eq!(json["addresses"][0]["privateKey"], "00".repeat(32));
        // imported=false 不写入文件
        assert!(json["addresses"][0].get("imported").is_none());
    }
}
