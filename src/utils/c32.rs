//! c32check 地址编码（Stacks）
//!
//! Crockford 风格的 base32 变体：按数值编码，前导零字节保留为 '0' 字符，
//! 校验和为 double-SHA256 前 4 字节。
//! 地址形如 'S' + 版本字符 + c32(payload + checksum)

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// 主网单签地址版本（'SP' 前缀）
pub const VERSION_MAINNET_P2PKH: u8 = 22;
/// 测试网单签地址版本（'ST' 前缀）
pub const VERSION_TESTNET_P2PKH: u8 = 26;

/// c32 编码
pub fn c32_encode(data: &[u8]) -> String {
    // 从低位向高位按 5 bit 取数字
    let mut digits: Vec<u8> = Vec::new();
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in data.iter().rev() {
        acc |= (byte as u32) << bits;
        bits += 8;
        while bits >= 5 {
            digits.push((acc & 0x1f) as u8);
            acc >>= 5;
            bits -= 5;
        }
    }
    if bits > 0 && acc != 0 {
        digits.push((acc & 0x1f) as u8);
    }

    // 去掉数值高位多余的零（前导零字节在下面单独补回）
    while digits.last() == Some(&0) {
        digits.pop();
    }

    // 前导零字节各保留一个 '0' 字符
    let leading_zero_bytes = data.iter().take_while(|&&b| b == 0).count();

    let mut out = String::with_capacity(leading_zero_bytes + digits.len());
    for _ in 0..leading_zero_bytes {
        out.push('0');
    }
    for &digit in digits.iter().rev() {
        out.push(C32_ALPHABET[digit as usize] as char);
    }
    out
}

/// c32 解码（容忍小写与 O/L/I 同形字符）
pub fn c32_decode(input: &str) -> Result<Vec<u8>> {
    let normalized: String = input
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'O' => '0',
            'L' | 'I' => '1',
            other => other,
        })
        .collect();

    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out: Vec<u8> = Vec::new();

    for c in normalized.chars().rev() {
        let value = C32_ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .with_context(|| format!("Invalid c32 character: {}", c))? as u32;
        acc |= value << bits;
        bits += 5;
        while bits >= 8 {
            out.push((acc & 0xff) as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 && acc != 0 {
        out.push(acc as u8);
    }

    // 去掉数值高位的零字节，再按前导 '0' 字符补回
    while out.last() == Some(&0) {
        out.pop();
    }
    let leading_zero_chars = normalized.chars().take_while(|&c| c == '0').count();
    out.extend(std::iter::repeat(0).take(leading_zero_chars));

    out.reverse();
    Ok(out)
}

/// 计算 c32check 校验和：double-SHA256(version || payload) 前 4 字节
fn checksum(version: u8, payload: &[u8]) -> [u8; 4] {
    let mut data = Vec::with_capacity(1 + payload.len());
    data.push(version);
    data.extend_from_slice(payload);

    let first = Sha256::digest(&data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 4];
    out.copy_from_slice(&second[..4]);
    out
}

/// 由版本字节和 hash160 生成 c32check 地址
pub fn c32_address(version: u8, hash160: &[u8; 20]) -> String {
    let check = checksum(version, hash160);

    let mut payload = Vec::with_capacity(24);
    payload.extend_from_slice(hash160);
    payload.extend_from_slice(&check);

    format!(
        "S{}{}",
        C32_ALPHABET[version as usize & 0x1f] as char,
        c32_encode(&payload)
    )
}

/// 解码 c32check 地址为 (版本字节, hash160)，校验和不符时报错
pub fn c32_address_decode(address: &str) -> Result<(u8, [u8; 20])> {
    let rest = address
        .strip_prefix('S')
        .context("Stacks address must start with 'S'")?;
    anyhow::ensure!(rest.len() > 1, "Address too short");

    let version_char = rest.chars().next().context("Address too short")?;
    let version = C32_ALPHABET
        .iter()
        .position(|&a| a as char == version_char.to_ascii_uppercase())
        .with_context(|| format!("Invalid version character: {}", version_char))?
        as u8;

    let mut decoded = c32_decode(&rest[1..])?;
    anyhow::ensure!(decoded.len() >= 4, "Address payload too short");

    // 数值解码可能丢掉 hash160 的前导零字节，左侧补齐到 24 字节
    while decoded.len() < 24 {
        decoded.insert(0, 0);
    }
    anyhow::ensure!(decoded.len() == 24, "Address payload has unexpected length");

    let (payload, check) = decoded.split_at(20);
    let expected = checksum(version, payload);
    anyhow::ensure!(check == expected, "Address checksum mismatch");

    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(payload);
    Ok((version, hash160))
}
