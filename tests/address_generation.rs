//! 地址生成端到端验证
//!
//! 用 BIP39 标准测试向量验证各链派生的确定性、索引连续性，
//! 以及"适配器只输出自身派生策略产出的地址"这一不变量

mod common;

use chainseed::chains::{evm::EvmChain, solana::SolanaChain, stacks::StacksChain};
use chainseed::config::Config;
use chainseed::domain::chain_adapter::{ChainAdapter, DerivationKind};
use common::TEST_MNEMONIC;

fn config() -> Config {
    Config::builtin()
}

/// 固定测试种子生成 5 个地址，重复运行结果完全一致
#[test]
fn test_scenario_repeat_runs_are_identical() {
    let config = config();
    let adapters: Vec<Box<dyn ChainAdapter>> = vec![
        Box::new(StacksChain::new(config.chain("stacks").unwrap(), &config.settings)),
        Box::new(SolanaChain::new(config.chain("sol").unwrap(), &config.settings)),
        Box::new(EvmChain::ethereum(config.chain("eth").unwrap(), &config.settings)),
    ];

    for adapter in &adapters {
        let network = adapter.metadata().default_network.clone();
        let first = adapter
            .generate_addresses(TEST_MNEMONIC, 5, &network)
            .unwrap();
        let second = adapter
            .generate_addresses(TEST_MNEMONIC, 5, &network)
            .unwrap();

        assert_eq!(first.len(), 5, "{}", adapter.metadata().name);
        for (i, (a, b)) in first.iter().zip(&second).enumerate() {
            // 索引 0..N-1 连续
            assert_eq!(a.index, i as u32);
            // 地址与私钥逐字节一致
            assert_eq!(a.address, b.address, "{}", adapter.metadata().name);
            assert_eq!(a.private_key, b.private_key);
            assert_eq!(a.derivation_path, b.derivation_path);
        }
    }
}

/// 同一账户下地址互不重复
#[test]
fn test_addresses_unique_within_chain() {
    let config = config();
    let chain = EvmChain::ethereum(config.chain("eth").unwrap(), &config.settings);
    let accounts = chain
        .generate_addresses(TEST_MNEMONIC, 20, "mainnet")
        .unwrap();

    let mut addresses: Vec<&str> = accounts.iter().map(|a| a.address.as_str()).collect();
    addresses.sort_unstable();
    addresses.dedup();
    assert_eq!(addresses.len(), 20);
}

/// 不同派生策略的链不会产出相同地址
#[test]
fn test_no_cross_adapter_address_reuse() {
    let config = config();
    let stacks = StacksChain::new(config.chain("stacks").unwrap(), &config.settings);
    let solana = SolanaChain::new(config.chain("sol").unwrap(), &config.settings);
    let eth = EvmChain::ethereum(config.chain("eth").unwrap(), &config.settings);

    let stacks_addrs = stacks.generate_addresses(TEST_MNEMONIC, 5, "mainnet").unwrap();
    let sol_addrs = solana.generate_addresses(TEST_MNEMONIC, 5, "mainnet").unwrap();
    let eth_addrs = eth.generate_addresses(TEST_MNEMONIC, 5, "mainnet").unwrap();

    for s in &stacks_addrs {
        assert!(s.address.starts_with("SP"));
        assert!(sol_addrs.iter().all(|o| o.address != s.address));
        assert!(eth_addrs.iter().all(|o| o.address != s.address));
    }
    for e in &eth_addrs {
        assert!(e.address.starts_with("0x"));
    }
}

/// 派生策略标签与实现一致
#[test]
fn test_derivation_strategy_tags() {
    let config = config();
    let stacks = StacksChain::new(config.chain("stacks").unwrap(), &config.settings);
    let solana = SolanaChain::new(config.chain("sol").unwrap(), &config.settings);
    let bsc = EvmChain::bsc(config.chain("bsc").unwrap(), &config.settings);

    assert_eq!(stacks.metadata().derivation, DerivationKind::SequentialReplay);
    assert_eq!(solana.metadata().derivation, DerivationKind::DirectIndex);
    assert_eq!(bsc.metadata().derivation, DerivationKind::DirectIndex);
}

/// EVM 家族共用实现：ETH 与 BSC 对同一种子派生出相同地址（coin type 60）
#[test]
fn test_evm_family_shares_derivation() {
    let config = config();
    let eth = EvmChain::ethereum(config.chain("eth").unwrap(), &config.settings);
    let bsc = EvmChain::bsc(config.chain("bsc").unwrap(), &config.settings);

    let eth_addrs = eth.generate_addresses(TEST_MNEMONIC, 3, "mainnet").unwrap();
    let bsc_addrs = bsc.generate_addresses(TEST_MNEMONIC, 3, "mainnet").unwrap();

    for (a, b) in eth_addrs.iter().zip(&bsc_addrs) {
        assert_eq!(a.address, b.address);
    }
}

/// 导入流程：索引 0 派生 + imported 标记
#[test]
fn test_import_account_flag() {
    let config = config();
    let chain = SolanaChain::new(config.chain("sol").unwrap(), &config.settings);

    let imported = chain.import_account(TEST_MNEMONIC, "mainnet").unwrap();
    let derived = chain.generate_addresses(TEST_MNEMONIC, 1, "mainnet").unwrap();

    assert!(imported.imported);
    assert_eq!(imported.index, 0);
    assert_eq!(imported.address, derived[0].address);
}

/// 派生验证辅助：预期地址大小写不敏感比对
#[test]
fn test_verify_seed_derivation() {
    let config = config();
    let chain = EvmChain::ethereum(config.chain("eth").unwrap(), &config.settings);

    let accounts = chain.generate_addresses(TEST_MNEMONIC, 1, "mainnet").unwrap();
    let expected_lower = accounts[0].address.to_lowercase();

    assert!(chain
        .verify_seed_derivation(TEST_MNEMONIC, "mainnet", &expected_lower)
        .unwrap());
    assert!(!chain
        .verify_seed_derivation(TEST_MNEMONIC, "mainnet", "0x0000000000000000000000000000000000000000")
        .unwrap());
}
