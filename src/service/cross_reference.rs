//! 钱包交叉比对
//!
//! 把拆账调用解析出的收款列表与已生成的钱包文件做集合交集，
//! 报告每个命中的派生索引与归属金额。只读操作

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::account::WalletFile;
use crate::domain::transaction::RecipientEntry;
use crate::error::WalletError;
use crate::service::wallet_store::WalletStore;
use crate::utils::units::format_units;

/// 单个命中的收款人
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientMatch {
    pub index: u32,
    pub address: String,
    pub derivation_path: String,
    /// 该地址在拆账中分到的金额（基础单位）
    pub amount: u128,
}

/// 比对报告
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossReferenceReport {
    pub matches: Vec<RecipientMatch>,
    /// 命中地址的金额合计
    pub total_matched: u128,
    /// 未命中的收款条目数
    pub unmatched: usize,
}

/// 收款列表 × 钱包文件 的交集（两侧地址都做 trim + 小写归一）
pub fn cross_reference(
    recipients: &[RecipientEntry],
    wallet: &WalletFile,
) -> CrossReferenceReport {
    let mut report = CrossReferenceReport::default();

    for recipient in recipients {
        match WalletStore::find_address(wallet, &recipient.address) {
            Some(entry) => {
                report.total_matched += recipient.amount;
                report.matches.push(RecipientMatch {
                    index: entry.account.index,
                    address: entry.account.address.clone(),
                    derivation_path: entry.account.derivation_path.clone(),
                    amount: recipient.amount,
                });
            }
            None => report.unmatched += 1,
        }
    }
    report
}

/// 从磁盘加载钱包文件再比对；文件缺失/损坏报错而不是崩溃
pub fn cross_reference_path(
    recipients: &[RecipientEntry],
    wallet_path: &Path,
) -> Result<CrossReferenceReport, WalletError> {
    let wallet = WalletStore::load(wallet_path)?;
    Ok(cross_reference(recipients, &wallet))
}

/// 可读输出
pub fn format_report(report: &CrossReferenceReport, symbol: &str, decimals: u8) -> String {
    if report.matches.is_empty() {
        return format!(
            "No recipients matched the wallet file ({} unmatched)\n",
            report.unmatched
        );
    }

    let mut out = format!(
        "{} recipient(s) matched, {} unmatched\n",
        report.matches.len(),
        report.unmatched
    );
    for matched in &report.matches {
        out.push_str(&format!(
            "  index {} ({}) <- {} {}  [{}]\n",
            matched.index,
            matched.address,
            format_units(matched.amount, decimals),
            symbol,
            matched.derivation_path
        ));
    }
    out.push_str(&format!(
        "Total matched: {} {}\n",
        format_units(report.total_matched, decimals),
        symbol
    ));
    out
}
