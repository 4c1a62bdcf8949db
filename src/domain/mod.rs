//! 领域模型层
//!
//! 账户、钱包文件、交易记录等核心数据结构，以及链适配器契约与注册表

pub mod account;
pub mod chain_adapter;
pub mod chain_registry;
pub mod derivation;
pub mod seed;
pub mod transaction;
pub mod transfer;

pub use account::{BalanceSnapshot, DerivedAccount, ScannedAccount, WalletEntry, WalletFile};
pub use chain_adapter::{Capabilities, ChainAdapter, ChainMetadata, DerivationKind};
pub use chain_registry::ChainRegistry;
pub use transaction::{RecipientEntry, TransactionKind, TransactionRecord};
