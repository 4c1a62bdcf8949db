//! 统一地址校验与格式化
//!
//! 广播前的收款地址校验都走这里，校验逻辑不分散到各适配器

use anyhow::Result;
use sha3::{Digest, Keccak256};

use crate::utils::c32;

/// 地址校验器
pub struct AddressValidator;

impl AddressValidator {
    /// 验证 EVM 地址（支持 EIP-55 Checksum）
    pub fn validate_evm(address: &str) -> bool {
        if !address.starts_with("0x") || address.len() != 42 {
            return false;
        }

        let hex_part = &address[2..];
        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }

        // 混合大小写时按 EIP-55 校验
        if hex_part.chars().any(|c| c.is_ascii_uppercase())
            && hex_part.chars().any(|c| c.is_ascii_lowercase())
        {
            return to_eip55_checksum(address) == address;
        }
        true
    }

    /// 验证 Solana 地址（Base58，32 字节公钥）
    pub fn validate_solana(address: &str) -> bool {
        if address.len() < 32 || address.len() > 44 {
            return false;
        }
        match bs58::decode(address).into_vec() {
            Ok(bytes) => bytes.len() == 32,
            Err(_) => false,
        }
    }

    /// 验证 Stacks 地址（c32check，校验和必须正确）
    pub fn validate_stacks(address: &str) -> bool {
        c32::c32_address_decode(address).is_ok()
    }
}

/// EIP-55 Checksum 地址
/// https://eips.ethereum.org/EIPS/eip-55
pub fn to_eip55_checksum(address: &str) -> String {
    let lower = address.trim_start_matches("0x").to_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        if c.is_ascii_digit() {
            out.push(c);
        } else {
            // 哈希对应 nibble >= 8 时大写
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
    }
    out
}

/// 由未压缩公钥（去 0x04 前缀的 64 字节）计算 EVM 地址
pub fn evm_address_from_pubkey(public_key_uncompressed: &[u8]) -> Result<String> {
    anyhow::ensure!(
        public_key_uncompressed.len() == 64,
        "Uncompressed public key must be 64 bytes"
    );
    let hash = Keccak256::digest(public_key_uncompressed);
    // 取后 20 字节
    let address = format!("0x{}", hex::encode(&hash[12..]));
    Ok(to_eip55_checksum(&address))
}
