//! 助记词处理
//!
//! 助记词只在派生时消费，永远不写入派生账户记录

use anyhow::{Context, Result};
use bip39::{Language, Mnemonic};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// BIP39 助记词的不透明包装，离开作用域时清零内存
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SeedPhrase(String);

impl SeedPhrase {
    pub fn new(phrase: &str) -> Self {
        Self(phrase.trim().to_string())
    }

    /// 从环境变量读取助记词（调用方只传变量名，助记词本身不出现在命令行）
    pub fn from_env(var_name: &str) -> Result<Self> {
        let phrase = std::env::var(var_name)
            .with_context(|| format!("Environment variable {} is not set", var_name))?;
        Ok(Self::new(&phrase))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SeedPhrase {
    /// 助记词不进日志
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SeedPhrase(***)")
    }
}

/// 生成新的 BIP39 助记词（12 或 24 词）
pub fn generate_mnemonic(word_count: usize) -> Result<String> {
    use rand::RngCore;

    // 12 词 = 128 bit 熵，24 词 = 256 bit 熵
    let entropy_len = match word_count {
        12 => 16,
        24 => 32,
        other => anyhow::bail!("word count must be 12 or 24, got {}", other),
    };

    let mut entropy = vec![0u8; entropy_len];
    rand::thread_rng().fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
        .context("Failed to generate mnemonic")?;
    Ok(mnemonic.to_string())
}

/// 完整 BIP39 校验并展开为 64 字节种子
///
/// 任何派生发生前都必须先通过这里；非法助记词立即拒绝
pub fn seed_bytes(phrase: &str) -> Result<[u8; 64]> {
    let mnemonic = Mnemonic::parse_in(Language::English, phrase.trim())
        .context("Invalid mnemonic")?;
    Ok(mnemonic.to_seed(""))
}
