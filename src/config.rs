//! 配置管理模块
//! 支持内置默认值、TOML 配置文件和环境变量覆盖

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub chains: HashMap<String, ChainSettings>,
    #[serde(default)]
    pub settings: EngineSettings,
}

/// 单链配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub name: String,
    pub symbol: String,
    /// 主网 RPC/API 端点
    pub rpc_url: String,
    /// 测试网端点（可选）
    #[serde(default)]
    pub testnet_rpc_url: Option<String>,
    /// 基础单位精度
    pub decimals: u8,
    /// 余额扫描的逐账户间隔（共享公共端点取更长间隔）
    pub scan_delay_ms: u64,
    /// 固定手续费默认值（基础单位；EVM 为 0，走实时估算）
    pub default_fee: u128,
    /// CoinGecko 行情标识（可选，用于扫描汇总的美元估值）
    #[serde(default)]
    pub coingecko_id: Option<String>,
}

/// 引擎全局配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// 批量转账的逐笔广播间隔
    pub broadcast_delay_ms: u64,
    /// HTTP 请求超时
    pub http_timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            broadcast_delay_ms: 1000,
            http_timeout_secs: 30,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// 内置默认配置
    pub fn builtin() -> Self {
        let mut chains = HashMap::new();

        chains.insert(
            "stacks".to_string(),
            ChainSettings {
                enabled: true,
                name: "Stacks".to_string(),
                symbol: "STX".to_string(),
                rpc_url: "https://api.hiro.so".to_string(),
                testnet_rpc_url: Some("https://api.testnet.hiro.so".to_string()),
                decimals: 6,
                // 共享公共 explorer API，取较长间隔
                scan_delay_ms: 500,
                default_fee: 3_000, // 0.003 STX
                coingecko_id: Some("blockstack".to_string()),
            },
        );

        chains.insert(
            "sol".to_string(),
            ChainSettings {
                enabled: true,
                name: "Solana".to_string(),
                symbol: "SOL".to_string(),
                rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
                testnet_rpc_url: Some("https://api.devnet.solana.com".to_string()),
                decimals: 9,
                scan_delay_ms: 200,
                default_fee: 5_000, // lamports
                coingecko_id: Some("solana".to_string()),
            },
        );

        chains.insert(
            "eth".to_string(),
            ChainSettings {
                enabled: true,
                name: "Ethereum".to_string(),
                symbol: "ETH".to_string(),
                rpc_url: "https://eth.llamarpc.com".to_string(),
                testnet_rpc_url: None,
                decimals: 18,
                scan_delay_ms: 250,
                default_fee: 0, // gas_price × 21000 实时估算
                coingecko_id: Some("ethereum".to_string()),
            },
        );

        chains.insert(
            "bsc".to_string(),
            ChainSettings {
                enabled: true,
                name: "BNB Smart Chain".to_string(),
                symbol: "BNB".to_string(),
                rpc_url: "https://bsc-dataseed.binance.org".to_string(),
                testnet_rpc_url: None,
                decimals: 18,
                scan_delay_ms: 250,
                default_fee: 0,
                coingecko_id: Some("binancecoin".to_string()),
            },
        );

        Self {
            chains,
            settings: EngineSettings::default(),
        }
    }

    /// 从环境变量和配置文件加载配置
    ///
    /// 优先级：环境变量 > 配置文件 > 内置默认值
    pub fn from_env_and_file(config_path: Option<&str>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) if Path::new(path).exists() => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path))?;
                toml::from_str::<Config>(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path))?
            }
            Some(path) => {
                tracing::warn!("Config file not found: {}, using defaults", path);
                Self::builtin()
            }
            None => Self::builtin(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// 应用环境变量覆盖（<CHAIN>_RPC_URL / <CHAIN>_SCAN_DELAY_MS）
    fn apply_env_overrides(&mut self) {
        for (key, chain) in self.chains.iter_mut() {
            let prefix = key.to_uppercase();

            if let Ok(url) = std::env::var(format!("{}_RPC_URL", prefix)) {
                chain.rpc_url = url;
            }
            if let Ok(ms) = std::env::var(format!("{}_SCAN_DELAY_MS", prefix)) {
                if let Ok(parsed) = ms.parse::<u64>() {
                    chain.scan_delay_ms = parsed;
                }
            }
        }
    }

    /// 获取链配置（键大小写不敏感）
    pub fn chain(&self, key: &str) -> Option<&ChainSettings> {
        self.chains.get(&key.to_lowercase())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::builtin()
    }
}
