//! 扫描与转账编排的端到端场景
//!
//! 用可编程假适配器覆盖：余额聚合、手续费感知跳过、
//! 广播拒绝与本地异常的结果分类、单账户失败不中断批次

mod common;

use chainseed::domain::chain_adapter::ChainAdapter;
use chainseed::domain::transfer::{
    AccountSelection, TransferAmount, TransferPlan, REASON_INSUFFICIENT_AFTER_FEE,
};
use chainseed::error::{TransferStatus, WalletError};
use chainseed::service::{scanner, transfer};
use common::{MockChain, TEST_MNEMONIC};

fn plan_max(recipient: &str) -> TransferPlan {
    TransferPlan {
        selection: AccountSelection::NonZeroBalance,
        recipient: recipient.to_string(),
        amount: TransferAmount::Max,
        fee_budget: Some(100),
    }
}

/// 场景：扫描 3 个账户，仅账户 1 有余额
#[tokio::test]
async fn test_scan_counts_single_funded_account() {
    let chain = MockChain::new().with_balance(1, 5_000_000);

    let (accounts, summary) = scanner::scan(&chain, TEST_MNEMONIC, 3, "mainnet")
        .await
        .unwrap();

    assert_eq!(accounts.len(), 3);
    assert_eq!(summary.total_accounts, 3);
    assert_eq!(summary.accounts_with_balance, 1);
    assert_eq!(summary.total_available, 5_000_000);
    assert_eq!(summary.degraded, 0);
}

/// 场景：批量转账 2 个账户，A 成功、B 广播被拒 → 1 success / 1 failed / 0 skipped
#[tokio::test]
async fn test_batch_success_and_rejection() {
    let mut chain = MockChain::new()
        .with_balance(0, 1_000_000)
        .with_balance(1, 2_000_000);
    chain.reject.insert(MockChain::address_for(1));

    let (accounts, _) = scanner::scan(&chain, TEST_MNEMONIC, 2, "mainnet")
        .await
        .unwrap();
    let summary = transfer::execute_batch(&chain, &accounts, &plan_max("RECIPIENT"), "mainnet", 0)
        .await
        .unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.errors, 0);
    // Max 模式：余额 − 手续费
    assert_eq!(summary.total_sent, 1_000_000 - 100);

    let success = summary
        .outcomes
        .iter()
        .find(|o| o.status == TransferStatus::Success)
        .unwrap();
    assert!(success.txid.is_some());

    let failed = summary
        .outcomes
        .iter()
        .find(|o| o.status == TransferStatus::Failed)
        .unwrap();
    assert!(failed.reason.as_deref().unwrap().contains("Nonce"));
}

/// 手续费感知跳过：(balance − fee) ≤ 0 时结果为 skipped 且不尝试广播
#[tokio::test]
async fn test_fee_aware_skip_without_broadcast() {
    let chain = MockChain::new().with_balance(0, 80); // 低于 fee=100

    let (accounts, _) = scanner::scan(&chain, TEST_MNEMONIC, 1, "mainnet")
        .await
        .unwrap();
    let summary = transfer::execute_batch(&chain, &accounts, &plan_max("RECIPIENT"), "mainnet", 0)
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.success, 0);
    assert_eq!(
        summary.outcomes[0].reason.as_deref(),
        Some(REASON_INSUFFICIENT_AFTER_FEE)
    );
    // 未发生任何广播
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}

/// 本地异常归类为 error，且不中断剩余账户
#[tokio::test]
async fn test_local_error_does_not_abort_batch() {
    let mut chain = MockChain::new()
        .with_balance(0, 1_000_000)
        .with_balance(1, 1_000_000)
        .with_balance(2, 1_000_000);
    chain.fail_locally.insert(MockChain::address_for(0));

    let (accounts, _) = scanner::scan(&chain, TEST_MNEMONIC, 3, "mainnet")
        .await
        .unwrap();
    let summary = transfer::execute_batch(&chain, &accounts, &plan_max("RECIPIENT"), "mainnet", 0)
        .await
        .unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.success, 2);
    // 异常账户之后的账户仍被处理
    assert_eq!(chain.broadcasts.lock().unwrap().len(), 2);
}

/// 显式索引子集选择 + 固定金额
#[tokio::test]
async fn test_explicit_index_selection_with_fixed_amount() {
    let chain = MockChain::new()
        .with_balance(0, 1_000_000)
        .with_balance(1, 1_000_000)
        .with_balance(2, 1_000_000);

    let (accounts, _) = scanner::scan(&chain, TEST_MNEMONIC, 3, "mainnet")
        .await
        .unwrap();
    let plan = TransferPlan {
        selection: AccountSelection::Indices(vec![0, 2]),
        recipient: "RECIPIENT".to_string(),
        amount: TransferAmount::Fixed(500_000),
        fee_budget: Some(100),
    };
    let summary = transfer::execute_batch(&chain, &accounts, &plan, "mainnet", 0)
        .await
        .unwrap();

    assert_eq!(summary.success, 2);
    assert_eq!(summary.total_sent, 1_000_000);

    let broadcasts = chain.broadcasts.lock().unwrap();
    assert_eq!(broadcasts.len(), 2);
    assert!(broadcasts.iter().all(|(_, amount)| *amount == 500_000));
    // 未选中的账户没有动作
    assert!(broadcasts
        .iter()
        .all(|(from, _)| from != &MockChain::address_for(1)));
}

/// 固定金额 + 手续费超出余额同样跳过
#[tokio::test]
async fn test_fixed_amount_insufficient_after_fee() {
    let chain = MockChain::new().with_balance(0, 500_050); // 500_000 + 100 > 余额

    let (accounts, _) = scanner::scan(&chain, TEST_MNEMONIC, 1, "mainnet")
        .await
        .unwrap();
    let plan = TransferPlan {
        selection: AccountSelection::NonZeroBalance,
        recipient: "RECIPIENT".to_string(),
        amount: TransferAmount::Fixed(500_000),
        fee_budget: Some(100),
    };
    let summary = transfer::execute_batch(&chain, &accounts, &plan, "mainnet", 0)
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert!(chain.broadcasts.lock().unwrap().is_empty());
}

/// 可选能力探测：不支持转账的链平滑降级
#[tokio::test]
async fn test_capability_probe_degrades_gracefully() {
    let mut chain = MockChain::new();
    chain.with_transfers = false;

    assert!(!chain.capabilities().transfers);
    let result = chain.transfer_menu(TEST_MNEMONIC, 1, "mainnet").await;
    assert!(matches!(result, Err(WalletError::Unsupported(_))));

    let view = chain.view_transactions("MOCK", "mainnet", 10).await;
    assert!(matches!(view, Err(WalletError::Unsupported(_))));
}

/// 网络错误降级：余额查询失败的账户注记错误并计零，扫描不中断
#[tokio::test]
async fn test_degraded_balance_annotated() {
    struct FlakyChain(MockChain);

    #[async_trait::async_trait]
    impl ChainAdapter for FlakyChain {
        fn metadata(&self) -> &chainseed::domain::chain_adapter::ChainMetadata {
            self.0.metadata()
        }
        fn validate_seed_phrase(&self, seed: &str) -> Result<(), WalletError> {
            self.0.validate_seed_phrase(seed)
        }
        fn generate_addresses(
            &self,
            seed: &str,
            count: u32,
            network: &str,
        ) -> Result<Vec<chainseed::domain::account::DerivedAccount>, WalletError> {
            self.0.generate_addresses(seed, count, network)
        }
        async fn get_balance(
            &self,
            address: &str,
            network: &str,
        ) -> Result<chainseed::domain::account::BalanceSnapshot, WalletError> {
            if address == MockChain::address_for(1) {
                return Err(WalletError::Network("rpc timeout".into()));
            }
            self.0.get_balance(address, network).await
        }
        async fn get_transactions(
            &self,
            address: &str,
            network: &str,
            limit: u32,
            offset: u32,
        ) -> Result<Vec<chainseed::domain::transaction::TransactionRecord>, WalletError> {
            self.0.get_transactions(address, network, limit, offset).await
        }
        fn format_csv(
            &self,
            accounts: &[chainseed::domain::account::ScannedAccount],
        ) -> String {
            self.0.format_csv(accounts)
        }
    }

    let chain = FlakyChain(MockChain::new().with_balance(0, 777));
    let (accounts, summary) = scanner::scan(&chain, TEST_MNEMONIC, 3, "mainnet")
        .await
        .unwrap();

    assert_eq!(accounts.len(), 3);
    assert_eq!(summary.degraded, 1);
    assert!(accounts[1].balance.error.as_deref().unwrap().contains("rpc timeout"));
    assert_eq!(accounts[1].balance.raw_balance, 0);
    assert_eq!(summary.total_available, 777);
}
