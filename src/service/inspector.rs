//! 交易检查器
//!
//! 按交易 id 拉取完整详情、分类交易类型，并从 send-many 形态合约调用的
//! 参数文本 repr 中提取收款列表。
//! 文本模式匹配天然依赖上游 API 的格式化方式：repr 格式变化会导致
//! 静默不匹配，此时解析返回空列表而不是报错

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::chain_adapter::ChainAdapter;
use crate::domain::transaction::{RecipientEntry, TransactionRecord};
use crate::error::WalletError;

/// Clarity repr 中的收款 tuple：(tuple ... (to 'SPxxx) (ustx u123) ...)
/// 键按字母序排列，to 紧邻 ustx；memo 等其他键被模式跳过
static DISBURSEMENT_TUPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(to\s+'?([A-Z0-9]+(?:\.[A-Za-z0-9\-]+)?)\)\s*\(ustx\s+u([0-9]+)\)")
        .expect("disbursement pattern is valid")
});

/// 从参数 repr 提取任意数量的 (address, amount) 收款条目
///
/// 完全函数：repr 不匹配时返回空列表，永不报错
pub fn parse_disbursement(repr: &str) -> Vec<RecipientEntry> {
    DISBURSEMENT_TUPLE
        .captures_iter(repr)
        .filter_map(|caps| {
            let address = caps.get(1)?.as_str().to_string();
            let amount = caps.get(2)?.as_str().parse::<u128>().ok()?;
            Some(RecipientEntry { address, amount })
        })
        .collect()
}

/// 交易检查器：经适配器拉取交易并给出结构化视图
pub struct TransactionInspector<'a> {
    adapter: &'a dyn ChainAdapter,
}

impl<'a> TransactionInspector<'a> {
    pub fn new(adapter: &'a dyn ChainAdapter) -> Self {
        Self { adapter }
    }

    /// 按交易 id 检查；先探测适配器能力，不支持时平滑降级
    pub async fn inspect(
        &self,
        txid: &str,
        network: &str,
    ) -> Result<TransactionRecord, WalletError> {
        if !self.adapter.capabilities().transaction_lookup {
            return Err(WalletError::Unsupported(format!(
                "transaction lookup is not supported for {}",
                self.adapter.metadata().name
            )));
        }
        self.adapter.fetch_transaction(txid, network).await
    }

    /// 可读摘要
    pub fn summarize(&self, record: &TransactionRecord) -> String {
        let mut out = format!(
            "Transaction {}\n  type:   {}\n  status: {}\n  sender: {}\n",
            record.txid, record.kind, record.status, record.sender
        );
        if let Some(name) = &record.function_name {
            out.push_str(&format!("  function: {}\n", name));
        }
        if !record.recipients.is_empty() {
            let decimals = self.adapter.metadata().decimals;
            let total: u128 = record.recipients.iter().map(|r| r.amount).sum();
            out.push_str(&format!("  recipients: {}\n", record.recipients.len()));
            for recipient in &record.recipients {
                out.push_str(&format!(
                    "    {} <- {} {}\n",
                    recipient.address,
                    crate::utils::units::format_units(recipient.amount, decimals),
                    self.adapter.metadata().symbol
                ));
            }
            out.push_str(&format!(
                "  total disbursed: {} {}\n",
                crate::utils::units::format_units(total, decimals),
                self.adapter.metadata().symbol
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multiple_tuples() {
        let repr = "(list (tuple (to 'SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7) (ustx u100)) \
                    (tuple (to 'SP1P72Z3704VMT3DMHPP2CB8TGQWGDBHD3RPR9GZS) (ustx u250)) \
                    (tuple (to 'SP3FBR2AGK5H9QBDH3EEN6DF8EK8JY7RX8QJ5SVTE) (ustx u999999)))";

        let entries = parse_disbursement(repr);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].address, "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7");
        assert_eq!(entries[0].amount, 100);
        assert_eq!(entries[2].amount, 999_999);
    }

    #[test]
    fn test_parse_with_memo_key() {
        // send-many-memo：memo 键按字母序排在 to 之前
        let repr = "(list (tuple (memo 0x74657374) (to 'SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7) (ustx u42)))";
        let entries = parse_disbursement(repr);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, 42);
    }

    #[test]
    fn test_parse_contract_principal_recipient() {
        let repr = "(tuple (to 'SP000000000000000000002Q6VF78.pox) (ustx u7))";
        let entries = parse_disbursement(repr);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].address, "SP000000000000000000002Q6VF78.pox");
    }

    #[test]
    fn test_parse_no_match_returns_empty() {
        assert!(parse_disbursement("").is_empty());
        assert!(parse_disbursement("(tuple (amount u100))").is_empty());
        assert!(parse_disbursement("u123456").is_empty());
        // 格式漂移：不 panic，返回空
        assert!(parse_disbursement("(tuple (to SPX) ustx u1)").is_empty());
    }

    #[test]
    fn test_parse_large_entry_count() {
        let tuples: Vec<String> = (0..200)
            .map(|i| {
                format!(
                    "(tuple (to 'SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ{:02}) (ustx u{}))",
                    i % 100,
                    i + 1
                )
            })
            .collect();
        let repr = format!("(list {})", tuples.join(" "));

        let entries = parse_disbursement(&repr);
        assert_eq!(entries.len(), 200);
        assert_eq!(entries[199].amount, 200);
    }
}
