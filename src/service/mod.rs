//! 服务层
//!
//! 扫描、转账编排、交易检查、钱包文件与交叉比对；
//! 全部通过注入的 ChainAdapter 工作，不绕过适配器直连链

pub mod cross_reference;
pub mod inspector;
pub mod price;
pub mod scanner;
pub mod transfer;
pub mod wallet_store;
