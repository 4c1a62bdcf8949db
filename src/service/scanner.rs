//! 余额与活跃度扫描
//!
//! 逐账户查询由适配器带固定间隔执行（见 ChainAdapter::generate_accounts），
//! 这里负责派生入口校验和末尾的聚合报告

use crate::domain::account::ScannedAccount;
use crate::domain::chain_adapter::ChainAdapter;
use crate::error::WalletError;
use crate::utils::units::format_units;

/// 扫描聚合报告
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    pub total_accounts: usize,
    /// 总余额非零的账户数
    pub accounts_with_balance: usize,
    /// 活跃账户数（余额非零或有交易记录）
    pub accounts_with_activity: usize,
    /// 可花总额（基础单位）
    pub total_available: u128,
    /// 锁仓总额（仅质押型链非零）
    pub total_locked: u128,
    /// 查询失败而降级的账户数
    pub degraded: usize,
    /// 估值（可选，由行情服务填充）
    pub usd_value: Option<f64>,
}

impl ScanSummary {
    pub fn from_accounts(accounts: &[ScannedAccount]) -> Self {
        let mut summary = Self {
            total_accounts: accounts.len(),
            ..Default::default()
        };

        for scanned in accounts {
            if scanned.balance.total_raw() > 0 {
                summary.accounts_with_balance += 1;
            }
            if scanned.balance.has_activity() {
                summary.accounts_with_activity += 1;
            }
            if scanned.balance.error.is_some() {
                summary.degraded += 1;
            }
            summary.total_available += scanned.balance.raw_balance;
            summary.total_locked += scanned.balance.raw_locked.unwrap_or(0);
        }
        summary
    }

    /// 可读汇总（锁仓行只在链有该概念时出现）
    pub fn display(&self, symbol: &str, decimals: u8) -> String {
        let mut out = format!(
            "Scanned {} accounts: {} with balance, {} active\n",
            self.total_accounts, self.accounts_with_balance, self.accounts_with_activity
        );
        out.push_str(&format!(
            "Total available: {} {}\n",
            format_units(self.total_available, decimals),
            symbol
        ));
        if self.total_locked > 0 {
            out.push_str(&format!(
                "Total locked:    {} {}\n",
                format_units(self.total_locked, decimals),
                symbol
            ));
            out.push_str(&format!(
                "Total combined:  {} {}\n",
                format_units(self.total_available + self.total_locked, decimals),
                symbol
            ));
        }
        if self.degraded > 0 {
            out.push_str(&format!(
                "{} account(s) degraded to zero due to network errors\n",
                self.degraded
            ));
        }
        if let Some(usd) = self.usd_value {
            out.push_str(&format!("Estimated value: ${:.2}\n", usd));
        }
        out
    }
}

/// 扫描入口：派生 N 个账户并逐个查余额，返回账户明细 + 聚合
pub async fn scan(
    adapter: &dyn ChainAdapter,
    seed: &str,
    count: u32,
    network: &str,
) -> Result<(Vec<ScannedAccount>, ScanSummary), WalletError> {
    adapter.validate_seed_phrase(seed)?;

    tracing::info!(
        chain = %adapter.metadata().key,
        count,
        network,
        "Starting balance scan"
    );

    let accounts = adapter.generate_accounts(seed, count, network).await?;
    let summary = ScanSummary::from_accounts(&accounts);

    tracing::info!(
        chain = %adapter.metadata().key,
        with_balance = summary.accounts_with_balance,
        "Scan finished"
    );
    Ok((accounts, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{BalanceSnapshot, DerivedAccount};

    fn scanned(index: u32, available: u128, locked: u128, has_tx: bool) -> ScannedAccount {
        ScannedAccount {
            account: DerivedAccount {
                index,
                address: format!("ADDR{}", index),
                private_key: "00".repeat(32),
                derivation_path: format!("m/44'/0'/0'/0/{}", index),
                imported: false,
            },
            balance: if locked > 0 {
                BalanceSnapshot::with_locked(available, locked, 6, has_tx)
            } else {
                BalanceSnapshot::simple(available, 6, has_tx)
            },
        }
    }

    #[test]
    fn test_summary_counts() {
        let accounts = vec![
            scanned(0, 0, 0, false),
            scanned(1, 2_000_000, 500_000, true),
            scanned(2, 0, 0, true), // 清空但有历史
        ];

        let summary = ScanSummary::from_accounts(&accounts);
        assert_eq!(summary.total_accounts, 3);
        assert_eq!(summary.accounts_with_balance, 1);
        assert_eq!(summary.accounts_with_activity, 2);
        assert_eq!(summary.total_available, 2_000_000);
        assert_eq!(summary.total_locked, 500_000);
    }

    #[test]
    fn test_display_includes_locked_only_when_present() {
        let with_locked = ScanSummary::from_accounts(&[scanned(0, 100, 50, true)]);
        assert!(with_locked.display("STX", 6).contains("Total locked"));

        let without = ScanSummary::from_accounts(&[scanned(0, 100, 0, true)]);
        assert!(!without.display("SOL", 9).contains("Total locked"));
    }
}
