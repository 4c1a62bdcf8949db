//! 交易记录与收款人条目

use serde::{Deserialize, Serialize};

/// 交易类型分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// 简单转账
    TokenTransfer,
    /// 合约/程序调用
    ContractCall,
    /// 合约部署
    SmartContract,
    /// 出块奖励
    Coinbase,
    /// 其他链特有类型
    Other(String),
}

impl TransactionKind {
    /// 从链 API 的类型字符串分类
    pub fn from_api_type(tx_type: &str) -> Self {
        match tx_type {
            "token_transfer" => Self::TokenTransfer,
            "contract_call" => Self::ContractCall,
            "smart_contract" => Self::SmartContract,
            "coinbase" => Self::Coinbase,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TokenTransfer => f.write_str("token transfer"),
            Self::ContractCall => f.write_str("contract call"),
            Self::SmartContract => f.write_str("contract deployment"),
            Self::Coinbase => f.write_str("coinbase"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// 多收款人拆账调用中解析出的单个收款条目
///
/// 仅在交易检查期间临时存在，不落盘
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientEntry {
    pub address: String,
    /// 基础单位金额
    pub amount: u128,
}

/// 链原生交易加上解析后的结构化视图
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub txid: String,
    pub kind: TransactionKind,
    pub status: String,
    pub sender: String,
    /// 合约调用的函数名（若有）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    /// 拆账调用解析出的收款列表；非拆账交易为空
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<RecipientEntry>,
    /// 链原生响应（保留给调用方做深度检查）
    #[serde(skip_serializing, default)]
    pub raw: serde_json::Value,
}
