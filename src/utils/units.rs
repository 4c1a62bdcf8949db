//! 基础单位与十进制显示的互转
//!
//! 金额全程用 u128 基础单位运算，只在展示和输入解析时转十进制，
//! 避免浮点精度问题

use anyhow::Result;

/// 基础单位 → 十进制字符串（去掉尾部多余的零）
pub fn format_units(raw: u128, decimals: u8) -> String {
    let divisor = 10u128.pow(decimals as u32);
    let integer = raw / divisor;
    let fraction = raw % divisor;

    if fraction == 0 {
        return integer.to_string();
    }

    let mut frac_str = format!("{:0width$}", fraction, width = decimals as usize);
    while frac_str.ends_with('0') {
        frac_str.pop();
    }
    format!("{}.{}", integer, frac_str)
}

/// 十进制字符串 → 基础单位
///
/// 超过链精度的小数位直接拒绝，不做静默截断
pub fn parse_units(input: &str, decimals: u8) -> Result<u128> {
    let trimmed = input.trim();
    anyhow::ensure!(!trimmed.is_empty(), "Amount must not be empty");

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };

    anyhow::ensure!(
        int_part.chars().all(|c| c.is_ascii_digit()) && !int_part.is_empty(),
        "Invalid amount: {}",
        input
    );
    anyhow::ensure!(
        frac_part.chars().all(|c| c.is_ascii_digit()),
        "Invalid amount: {}",
        input
    );
    anyhow::ensure!(
        frac_part.len() <= decimals as usize,
        "Amount {} has more than {} decimal places",
        input,
        decimals
    );

    let divisor = 10u128.pow(decimals as u32);
    let integer: u128 = int_part.parse()?;

    let fraction: u128 = if frac_part.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac_part, width = decimals as usize);
        padded.parse()?
    };

    integer
        .checked_mul(divisor)
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(|| anyhow::anyhow!("Amount overflow: {}", input))
}
