//! 链适配器实现
//!
//! - Stacks：顺序重放派生，c32check 地址，可花/锁仓两段余额，
//!   send-many 拆账交易的检查来源
//! - Solana：SLIP-0010 ed25519 直接索引派生
//! - EVM 系列：同一实现按 coin type/RPC 参数化，复用于 Ethereum 与 BSC

pub mod evm;
pub mod solana;
pub mod stacks;

use std::sync::Arc;

use crate::config::Config;
use crate::domain::chain_registry::ChainRegistry;
use crate::error::WalletError;

/// 按配置构建标准注册表（stacks 为无后缀命令的默认链）
pub fn build_registry(config: &Config) -> Result<ChainRegistry, WalletError> {
    let mut registry = ChainRegistry::new("stacks");

    let engine = &config.settings;

    if let Some(settings) = config.chain("stacks").filter(|c| c.enabled) {
        registry.register(Arc::new(stacks::StacksChain::new(settings, engine)));
    }
    if let Some(settings) = config.chain("sol").filter(|c| c.enabled) {
        registry.register(Arc::new(solana::SolanaChain::new(settings, engine)));
    }
    if let Some(settings) = config.chain("eth").filter(|c| c.enabled) {
        registry.register(Arc::new(evm::EvmChain::ethereum(settings, engine)));
    }
    if let Some(settings) = config.chain("bsc").filter(|c| c.enabled) {
        registry.register(Arc::new(evm::EvmChain::bsc(settings, engine)));
    }

    if registry.keys().is_empty() {
        return Err(WalletError::Config("No chains enabled".into()));
    }
    Ok(registry)
}
