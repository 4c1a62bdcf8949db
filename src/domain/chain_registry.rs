//! 链适配器注册表
//!
//! 进程启动时显式构造并注入到需要它的组件，不做模块级单例，
//! 测试可以用假适配器隔离

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::chain_adapter::ChainAdapter;
use crate::error::WalletError;

/// 无链后缀时回退到默认适配器的基础命令集合
const BASE_COMMANDS: &[&str] = &["generate", "scan", "transfer", "find", "tx"];

/// 名称（大小写不敏感）→ 适配器 的注册表
pub struct ChainRegistry {
    adapters: HashMap<String, Arc<dyn ChainAdapter>>,
    /// 无后缀基础命令的向后兼容默认链
    default_key: String,
}

impl ChainRegistry {
    pub fn new(default_key: &str) -> Self {
        Self {
            adapters: HashMap::new(),
            default_key: default_key.to_lowercase(),
        }
    }

    /// 注册适配器
    ///
    /// 重复注册同一个键会覆盖旧适配器并发出警告，不允许静默覆盖
    pub fn register(&mut self, adapter: Arc<dyn ChainAdapter>) {
        let key = adapter.metadata().key.to_lowercase();
        if self.adapters.contains_key(&key) {
            tracing::warn!(chain = %key, "Overwriting previously registered chain adapter");
        }
        self.adapters.insert(key, adapter);
    }

    /// 按键查找适配器，未注册时报错并列出可用键
    pub fn get(&self, key: &str) -> Result<Arc<dyn ChainAdapter>, WalletError> {
        self.adapters
            .get(&key.to_lowercase())
            .cloned()
            .ok_or_else(|| {
                let mut available: Vec<&str> =
                    self.adapters.keys().map(String::as_str).collect();
                available.sort_unstable();
                WalletError::Config(format!(
                    "Unknown chain '{}' (available: {})",
                    key,
                    available.join(", ")
                ))
            })
    }

    /// 从命令推断目标链
    ///
    /// 命令按 '-' 分段，末段命中注册键则选中该链；
    /// 否则若基础命令属于无后缀兼容集合，回退到默认链
    pub fn detect_chain_from_command(
        &self,
        command: &str,
    ) -> Result<Arc<dyn ChainAdapter>, WalletError> {
        let lowered = command.to_lowercase();
        if let Some((_, suffix)) = lowered.rsplit_once('-') {
            if let Some(adapter) = self.adapters.get(suffix) {
                return Ok(adapter.clone());
            }
        }

        if BASE_COMMANDS.contains(&lowered.as_str()) {
            return self.get(&self.default_key);
        }

        let mut available: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        available.sort_unstable();
        Err(WalletError::Config(format!(
            "Cannot resolve chain from command '{}' (available: {})",
            command,
            available.join(", ")
        )))
    }

    /// 去掉命令末尾的链后缀；没有链后缀时原样返回
    pub fn get_base_command<'a>(&self, command: &'a str) -> &'a str {
        if let Some((base, suffix)) = command.rsplit_once('-') {
            if self.adapters.contains_key(&suffix.to_lowercase()) {
                return base;
            }
        }
        command
    }

    /// 所有已注册的键（排序后）
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.adapters.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{BalanceSnapshot, DerivedAccount, ScannedAccount};
    use crate::domain::chain_adapter::{ChainMetadata, DerivationKind};
    use crate::domain::transaction::TransactionRecord;
    use async_trait::async_trait;

    struct StubChain {
        meta: ChainMetadata,
    }

    impl StubChain {
        fn new(key: &str) -> Self {
            Self {
                meta: ChainMetadata {
                    name: key.to_uppercase(),
                    symbol: key.to_uppercase(),
                    key: key.to_string(),
                    coin_type: 1,
                    supported_networks: vec!["mainnet".into()],
                    default_network: "mainnet".into(),
                    decimals: 6,
                    derivation: DerivationKind::DirectIndex,
                    scan_delay_ms: 0,
                    default_fee: 0,
                },
            }
        }
    }

    #[async_trait]
    impl ChainAdapter for StubChain {
        fn metadata(&self) -> &ChainMetadata {
            &self.meta
        }

        fn validate_seed_phrase(&self, _seed: &str) -> Result<(), WalletError> {
            Ok(())
        }

        fn generate_addresses(
            &self,
            _seed: &str,
            _count: u32,
            _network: &str,
        ) -> Result<Vec<DerivedAccount>, WalletError> {
            Ok(vec![])
        }

        async fn get_balance(
            &self,
            _address: &str,
            _network: &str,
        ) -> Result<BalanceSnapshot, WalletError> {
            Ok(BalanceSnapshot::simple(0, 6, false))
        }

        async fn get_transactions(
            &self,
            _address: &str,
            _network: &str,
            _limit: u32,
            _offset: u32,
        ) -> Result<Vec<TransactionRecord>, WalletError> {
            Ok(vec![])
        }

        fn format_csv(&self, _accounts: &[ScannedAccount]) -> String {
            String::new()
        }
    }

    fn registry() -> ChainRegistry {
        let mut registry = ChainRegistry::new("stacks");
        registry.register(Arc::new(StubChain::new("stacks")));
        registry.register(Arc::new(StubChain::new("sol")));
        registry.register(Arc::new(StubChain::new("eth")));
        registry
    }

    #[test]
    fn test_detect_chain_suffix() {
        let registry = registry();

        let sol = registry.detect_chain_from_command("generate-sol").unwrap();
        assert_eq!(sol.metadata().key, "sol");

        // 大小写不敏感
        let eth = registry.detect_chain_from_command("SCAN-ETH").unwrap();
        assert_eq!(eth.metadata().key, "eth");
    }

    #[test]
    fn test_base_command_falls_back_to_default() {
        let registry = registry();
        let adapter = registry.detect_chain_from_command("scan").unwrap();
        assert_eq!(adapter.metadata().key, "stacks");
    }

    #[test]
    fn test_unknown_command_lists_keys() {
        let registry = registry();
        let err = match registry.detect_chain_from_command("frobnicate") {
            Ok(_) => panic!("expected error"),
            Err(e) => e,
        };
        let msg = err.to_string();
        assert!(msg.contains("eth"));
        assert!(msg.contains("sol"));
        assert!(msg.contains("stacks"));
    }

    #[test]
    fn test_get_base_command() {
        let registry = registry();
        assert_eq!(registry.get_base_command("generate-sol"), "generate");
        assert_eq!(registry.get_base_command("generate"), "generate");
        // 末段不是注册键时原样返回
        assert_eq!(registry.get_base_command("dry-run"), "dry-run");
    }

    #[test]
    fn test_duplicate_registration_overwrites() {
        let mut registry = registry();
        registry.register(Arc::new(StubChain::new("sol")));
        assert_eq!(registry.keys(), vec!["eth", "sol", "stacks"]);
    }
}
