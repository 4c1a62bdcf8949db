//! 转账编排器
//!
//! 状态机：选择账户 → 输入收款地址 → 输入金额 → 输入手续费预算 →
//! 确认 → 逐账户执行 → 汇总报告。
//! 执行严格串行：每个账户的序列值必须按序消费，且第三方端点有限流；
//! 单账户失败不影响其余账户，批次一旦开始就跑完整个账户列表

use std::io::Write;

use crate::domain::account::ScannedAccount;
use crate::domain::chain_adapter::ChainAdapter;
use crate::domain::transfer::{
    AccountSelection, TransferAmount, TransferOutcome, TransferPlan, TransferSummary,
    REASON_INSUFFICIENT_AFTER_FEE,
};
use crate::error::{TransferStatus, WalletError};
use crate::utils::units::{format_units, parse_units};

/// 批量执行转账计划
///
/// 手续费预算缺省时使用适配器估算；估算失败在任何广播前中止整个批次
pub async fn execute_batch(
    adapter: &dyn ChainAdapter,
    accounts: &[ScannedAccount],
    plan: &TransferPlan,
    network: &str,
    broadcast_delay_ms: u64,
) -> Result<TransferSummary, WalletError> {
    let fee = match plan.fee_budget {
        Some(fee) => fee,
        None => adapter.estimate_fee(network).await?,
    };

    let selected: Vec<&ScannedAccount> = match &plan.selection {
        AccountSelection::NonZeroBalance => accounts
            .iter()
            .filter(|s| s.balance.raw_balance > 0)
            .collect(),
        AccountSelection::Indices(indices) => accounts
            .iter()
            .filter(|s| indices.contains(&s.account.index))
            .collect(),
    };

    if selected.is_empty() {
        tracing::info!("No accounts selected for transfer");
        return Ok(TransferSummary::tally(vec![]));
    }

    tracing::info!(
        chain = %adapter.metadata().key,
        count = selected.len(),
        fee,
        "Executing transfer batch"
    );

    let delay = std::time::Duration::from_millis(broadcast_delay_ms);
    let mut outcomes = Vec::with_capacity(selected.len());

    for (pos, scanned) in selected.iter().enumerate() {
        if pos > 0 {
            tokio::time::sleep(delay).await;
        }

        let available = scanned.balance.raw_balance;
        let (amount, sendable) = match plan.amount {
            TransferAmount::Max => {
                let amount = available.saturating_sub(fee);
                (amount, amount > 0)
            }
            TransferAmount::Fixed(amount) => {
                let covered = amount
                    .checked_add(fee)
                    .map(|needed| needed <= available)
                    .unwrap_or(false);
                (amount, amount > 0 && covered)
            }
        };

        // 扣费后无可转金额：跳过，不尝试广播
        if !sendable {
            tracing::info!(
                index = scanned.account.index,
                available,
                fee,
                "Skipping account: insufficient after fee"
            );
            outcomes.push(TransferOutcome {
                index: scanned.account.index,
                address: scanned.account.address.clone(),
                status: TransferStatus::Skipped,
                amount: 0,
                txid: None,
                reason: Some(REASON_INSUFFICIENT_AFTER_FEE.to_string()),
            });
            continue;
        }

        let outcome = match adapter
            .send_transfer(&scanned.account, &plan.recipient, amount, fee, network)
            .await
        {
            Ok(txid) => {
                tracing::info!(index = scanned.account.index, txid = %txid, "Transfer succeeded");
                TransferOutcome {
                    index: scanned.account.index,
                    address: scanned.account.address.clone(),
                    status: TransferStatus::Success,
                    amount,
                    txid: Some(txid),
                    reason: None,
                }
            }
            Err(WalletError::BroadcastRejected(reason)) => {
                tracing::warn!(index = scanned.account.index, %reason, "Broadcast rejected");
                TransferOutcome {
                    index: scanned.account.index,
                    address: scanned.account.address.clone(),
                    status: TransferStatus::Failed,
                    amount: 0,
                    txid: None,
                    reason: Some(reason),
                }
            }
            // 本地异常：记录后继续处理剩余账户
            Err(err) => {
                tracing::error!(index = scanned.account.index, "Transfer error: {}", err);
                TransferOutcome {
                    index: scanned.account.index,
                    address: scanned.account.address.clone(),
                    status: TransferStatus::Error,
                    amount: 0,
                    txid: None,
                    reason: Some(err.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }

    Ok(TransferSummary::tally(outcomes))
}

/// 批次汇总的可读输出
pub fn format_summary(summary: &TransferSummary, symbol: &str, decimals: u8) -> String {
    let mut out = format!(
        "Transfer batch finished: {} success, {} failed, {} skipped, {} errors\n",
        summary.success, summary.failed, summary.skipped, summary.errors
    );
    out.push_str(&format!(
        "Total sent: {} {}\n",
        format_units(summary.total_sent, decimals),
        symbol
    ));
    for outcome in &summary.outcomes {
        match outcome.status {
            TransferStatus::Success => out.push_str(&format!(
                "  #{} {} -> sent {} {} (txid {})\n",
                outcome.index,
                outcome.address,
                format_units(outcome.amount, decimals),
                symbol,
                outcome.txid.as_deref().unwrap_or("?")
            )),
            _ => out.push_str(&format!(
                "  #{} {} -> {} ({})\n",
                outcome.index,
                outcome.address,
                outcome.status,
                outcome.reason.as_deref().unwrap_or("-")
            )),
        }
    }
    out
}

fn prompt(label: &str) -> Result<String, WalletError> {
    print!("{}", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// 交互式转账：扫描 → 逐步输入 → 确认 → 批量执行
pub async fn interactive_transfer(
    adapter: &dyn ChainAdapter,
    seed: &str,
    count: u32,
    network: &str,
    broadcast_delay_ms: u64,
) -> Result<TransferSummary, WalletError> {
    let meta = adapter.metadata();
    let (accounts, summary) = crate::service::scanner::scan(adapter, seed, count, network).await?;

    println!("{}", summary.display(&meta.symbol, meta.decimals));
    for scanned in &accounts {
        println!(
            "  [{}] {}  {} {}",
            scanned.account.index, scanned.account.address, scanned.balance.balance, meta.symbol
        );
    }

    if summary.accounts_with_balance == 0 {
        println!("No funded accounts, nothing to transfer");
        return Ok(TransferSummary::tally(vec![]));
    }

    // 账户选择：回车 = 全部非零余额账户
    let selection_input = prompt("Account indices (comma separated, enter for all funded): ")?;
    let selection = if selection_input.is_empty() {
        AccountSelection::NonZeroBalance
    } else {
        let indices = selection_input
            .split(',')
            .map(|part| {
                part.trim().parse::<u32>().map_err(|_| {
                    WalletError::Validation(format!("Invalid account index: {}", part.trim()))
                })
            })
            .collect::<Result<Vec<u32>, WalletError>>()?;
        AccountSelection::Indices(indices)
    };

    let recipient = prompt("Recipient address: ")?;
    if recipient.is_empty() {
        return Err(WalletError::Validation("Recipient must not be empty".into()));
    }

    let amount_input = prompt(&format!("Amount in {} ('all' for maximum): ", meta.symbol))?;
    let amount = if amount_input.eq_ignore_ascii_case("all") {
        TransferAmount::Max
    } else {
        TransferAmount::Fixed(
            parse_units(&amount_input, meta.decimals)
                .map_err(|e| WalletError::Validation(e.to_string()))?,
        )
    };

    let fee_input = prompt("Fee budget (enter for default): ")?;
    let fee_budget = if fee_input.is_empty() {
        None
    } else {
        Some(
            parse_units(&fee_input, meta.decimals)
                .map_err(|e| WalletError::Validation(e.to_string()))?,
        )
    };

    let confirm = prompt(&format!("Send to {} on {}? [y/N]: ", recipient, network))?;
    if !confirm.eq_ignore_ascii_case("y") {
        println!("Aborted");
        return Ok(TransferSummary::tally(vec![]));
    }

    let plan = TransferPlan {
        selection,
        recipient,
        amount,
        fee_budget,
    };
    let summary = execute_batch(adapter, &accounts, &plan, network, broadcast_delay_ms).await?;
    println!("{}", format_summary(&summary, &meta.symbol, meta.decimals));
    Ok(summary)
}
