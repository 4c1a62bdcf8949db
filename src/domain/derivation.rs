//! 密钥派生原语
//!
//! 为不同加密曲线提供确定性派生：
//! - secp256k1：BIP44，coins-bip32 实现（EVM 系列、Stacks）
//! - ed25519：SLIP-0010 硬化派生，HMAC-SHA512 手工实现（Solana）

use anyhow::{Context, Result};
use coins_bip32::path::DerivationPath;
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// secp256k1 派生结果
pub struct Secp256k1Key {
    /// 私钥 (32 字节)
    pub private_key: [u8; 32],
    /// 压缩公钥 (33 字节)
    pub public_key_compressed: Vec<u8>,
    /// 未压缩公钥去掉 0x04 前缀 (64 字节)
    pub public_key_uncompressed: Vec<u8>,
}

/// 沿 BIP32 路径派生 secp256k1 密钥
pub fn derive_secp256k1(seed: &[u8], path: &str) -> Result<Secp256k1Key> {
    use coins_bip32::prelude::*;
    use k256::ecdsa::SigningKey;

    // 解析派生路径
    let derivation_path = path
        .parse::<DerivationPath>()
        .context("Invalid derivation path")?;

    // 从种子派生密钥
    let master_key = XPriv::root_from_seed(seed, None).context("Failed to derive master key")?;

    let derived_key = master_key
        .derive_path(&derivation_path)
        .context("Failed to derive key")?;

    // XPriv 实现 AsRef<SigningKey>
    let signing_key: &SigningKey = derived_key.as_ref();
    let private_key: [u8; 32] = signing_key.to_bytes().into();

    let verifying_key = signing_key.verifying_key();
    let compressed = verifying_key.to_encoded_point(true);
    let uncompressed = verifying_key.to_encoded_point(false);

    Ok(Secp256k1Key {
        private_key,
        public_key_compressed: compressed.as_bytes().to_vec(),
        // 去掉 0x04 前缀
        public_key_uncompressed: uncompressed.as_bytes()[1..].to_vec(),
    })
}

/// SLIP-0010 ed25519 硬化派生
///
/// 与 ed25519-hd-key 的 derivePath 行为一致：
/// master = HMAC-SHA512("ed25519 seed", seed)，
/// 每级 CKD 用 0x00 || key || (index + 2^31) 对 chain_code 做 HMAC。
/// ed25519 只支持硬化派生，路径中的每一段都必须带 '
pub fn derive_slip10_ed25519(seed: &[u8], path: &str) -> Result<[u8; 32]> {
    let segments = parse_hardened_path(path)?;

    // SLIP-0010 主密钥
    let mut mac = HmacSha512::new_from_slice(b"ed25519 seed").expect("HMAC accepts any key size");
    mac.update(seed);
    let master = mac.finalize().into_bytes();

    let mut key: [u8; 32] = master[..32].try_into().expect("HMAC-SHA512 output is 64 bytes");
    let mut chain_code: [u8; 32] = master[32..].try_into().expect("HMAC-SHA512 output is 64 bytes");

    for index in segments {
        let hardened_index = index | 0x8000_0000;

        let mut data = Vec::with_capacity(37);
        data.push(0x00);
        data.extend_from_slice(&key);
        data.extend_from_slice(&hardened_index.to_be_bytes());

        let mut mac = HmacSha512::new_from_slice(&chain_code).expect("HMAC accepts any key size");
        mac.update(&data);
        let derived = mac.finalize().into_bytes();

        key = derived[..32].try_into().expect("HMAC-SHA512 output is 64 bytes");
        chain_code = derived[32..].try_into().expect("HMAC-SHA512 output is 64 bytes");
    }

    Ok(key)
}

/// 解析全硬化路径（m/44'/501'/0'/0'）
fn parse_hardened_path(path: &str) -> Result<Vec<u32>> {
    let rest = path
        .strip_prefix("m/")
        .context("Path must start with 'm/'")?;

    let mut segments = Vec::new();
    for segment in rest.split('/') {
        if segment.is_empty() {
            continue;
        }
        let trimmed = segment
            .strip_suffix('\'')
            .with_context(|| format!("ed25519 derivation requires hardened segment: {}", segment))?;
        let index: u32 = trimmed
            .parse()
            .with_context(|| format!("Invalid path segment: {}", segment))?;
        segments.push(index);
    }
    Ok(segments)
}
