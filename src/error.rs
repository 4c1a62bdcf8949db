//! 统一错误类型
//!
//! 错误分类：校验错误在任何网络调用前立即返回；网络错误在批量扫描中
//! 降级为带注记的零值结果；转账错误按账户记录到批次汇总，不中断批次

use thiserror::Error;

/// 引擎统一错误类型
#[derive(Debug, Error)]
pub enum WalletError {
    /// 校验错误：助记词格式、地址格式、数量参数、不支持的网络等
    #[error("validation error: {0}")]
    Validation(String),

    /// 网络错误：RPC/API 调用失败
    #[error("network error: {0}")]
    Network(String),

    /// 广播被链上拒绝（与本地异常区分，用于转账结果分类）
    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),

    /// 可选能力未实现（调用方应先探测 capabilities）
    #[error("not supported for this chain: {0}")]
    Unsupported(String),

    /// 配置错误：未注册的链、缺失的环境变量等
    #[error("configuration error: {0}")]
    Config(String),

    /// 钱包文件读写错误
    #[error("wallet store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WalletError {
    /// 网络错误的降级注记文本（写入 BalanceSnapshot.error 字段）
    pub fn annotation(&self) -> String {
        self.to_string()
    }
}

/// 转账结果状态分类
///
/// - `Skipped`：扣除手续费后无可转金额，未尝试广播
/// - `Failed`：已广播但被链上明确拒绝
/// - `Error`：本地异常（签名失败等）
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Success,
    Failed,
    Skipped,
    Error,
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}
