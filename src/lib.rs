//! ChainSeed - 多链种子钱包适配引擎
//!
//! 从单个 BIP39 助记词派生、扫描和转移多条独立区块链上的资产，
//! 所有链通过统一的 ChainAdapter 能力契约接入

pub mod chains;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::WalletError;

// 统一模块导出
pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{
            account::{BalanceSnapshot, DerivedAccount, ScannedAccount, WalletFile},
            chain_adapter::{ChainAdapter, ChainMetadata},
            chain_registry::ChainRegistry,
        },
        error::WalletError,
    };
}
