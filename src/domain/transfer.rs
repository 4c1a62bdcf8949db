//! 转账请求与结果模型

use serde::{Deserialize, Serialize};

use crate::error::TransferStatus;

/// 扣费后无可转金额的跳过原因
pub const REASON_INSUFFICIENT_AFTER_FEE: &str = "insufficient-after-fee";

/// 转账金额：固定值或"余额减去手续费预算后的全部"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAmount {
    /// 基础单位固定金额
    Fixed(u128),
    /// 最大可用（余额 − 手续费预算）
    Max,
}

/// 账户选择：全部非零余额账户，或显式索引子集
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSelection {
    NonZeroBalance,
    Indices(Vec<u32>),
}

/// 一次批量转账的完整计划
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub selection: AccountSelection,
    pub recipient: String,
    pub amount: TransferAmount,
    /// 不指定时使用适配器的手续费估算
    pub fee_budget: Option<u128>,
}

/// 单账户转账结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub index: u32,
    pub address: String,
    pub status: TransferStatus,
    /// 实际发送的基础单位金额（skip/error 时为 0）
    pub amount: u128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// 批次汇总
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    /// 成功发送的基础单位总额
    pub total_sent: u128,
    pub outcomes: Vec<TransferOutcome>,
}

impl TransferSummary {
    /// 从逐账户结果汇总计数
    pub fn tally(outcomes: Vec<TransferOutcome>) -> Self {
        let mut summary = Self {
            outcomes: Vec::new(),
            ..Default::default()
        };
        for outcome in &outcomes {
            match outcome.status {
                TransferStatus::Success => {
                    summary.success += 1;
                    summary.total_sent += outcome.amount;
                }
                TransferStatus::Failed => summary.failed += 1,
                TransferStatus::Skipped => summary.skipped += 1,
                TransferStatus::Error => summary.errors += 1,
            }
        }
        summary.outcomes = outcomes;
        summary
    }
}
