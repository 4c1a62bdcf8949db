//! HTTP / JSON-RPC 客户端
//!
//! 所有链的网络调用共用一个带超时配置的 reqwest 客户端；
//! 单线程协作式调度，调用之间的限速间隔由适配器层负责

use std::time::Duration;

use serde_json::{json, Value};

use crate::error::WalletError;

/// 构建带超时的 HTTP 客户端
pub fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// JSON-RPC 2.0 调用，返回 result 字段
///
/// RPC 层面的 error 对象映射为 NetworkError，错误信息原样带回
pub async fn rpc_call(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Value,
) -> Result<Value, WalletError> {
    let payload = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });

    let response = client
        .post(url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| WalletError::Network(format!("{} request failed: {}", method, e)))?;

    let body: Value = response
        .json()
        .await
        .map_err(|e| WalletError::Network(format!("{} returned invalid JSON: {}", method, e)))?;

    if let Some(err) = body.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown RPC error");
        return Err(WalletError::Network(format!("{}: {}", method, message)));
    }

    body.get("result")
        .cloned()
        .ok_or_else(|| WalletError::Network(format!("{}: response missing result", method)))
}

/// 广播类 JSON-RPC 调用
///
/// 与 rpc_call 的区别：RPC error 对象代表链上明确拒绝本次广播，
/// 映射为 BroadcastRejected 以便转账结果分类；传输层失败仍是 NetworkError
pub async fn rpc_send(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Value,
) -> Result<Value, WalletError> {
    let payload = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });

    let response = client
        .post(url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| WalletError::Network(format!("{} request failed: {}", method, e)))?;

    let body: Value = response
        .json()
        .await
        .map_err(|e| WalletError::Network(format!("{} returned invalid JSON: {}", method, e)))?;

    if let Some(err) = body.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown RPC error");
        return Err(WalletError::BroadcastRejected(message.to_string()));
    }

    body.get("result")
        .cloned()
        .ok_or_else(|| WalletError::Network(format!("{}: response missing result", method)))
}

/// GET 请求并解析 JSON（REST 风格的链 API）
pub async fn get_json(client: &reqwest::Client, url: &str) -> Result<Value, WalletError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| WalletError::Network(format!("GET {} failed: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(WalletError::Network(format!(
            "GET {} returned status {}",
            url, status
        )));
    }

    response
        .json()
        .await
        .map_err(|e| WalletError::Network(format!("GET {} returned invalid JSON: {}", url, e)))
}

/// 解析 0x 前缀或十进制的数量字段（各链 API 混用两种格式）
pub fn parse_quantity(value: &Value) -> Result<u128, WalletError> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if let Some(hex_part) = trimmed.strip_prefix("0x") {
                u128::from_str_radix(hex_part, 16)
                    .map_err(|e| WalletError::Network(format!("Invalid hex quantity {}: {}", s, e)))
            } else {
                trimmed
                    .parse::<u128>()
                    .map_err(|e| WalletError::Network(format!("Invalid quantity {}: {}", s, e)))
            }
        }
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| WalletError::Network(format!("Invalid numeric quantity: {}", n))),
        other => Err(WalletError::Network(format!(
            "Unexpected quantity type: {}",
            other
        ))),
    }
}
