//! 行情服务
//!
//! CoinGecko simple price 查询，用于扫描汇总的美元估值；
//! 任何失败都降级为空结果，估值缺失不影响扫描本身

use std::collections::HashMap;

use crate::infrastructure::http;

const COINGECKO_SIMPLE_PRICE: &str = "https://api.coingecko.com/api/v3/simple/price";

pub struct PriceService {
    client: reqwest::Client,
}

impl PriceService {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: http::build_client(timeout_secs),
        }
    }

    /// 按 CoinGecko id 批量查美元价格；失败返回空表
    pub async fn fetch_usd_prices(&self, ids: &[&str]) -> HashMap<String, f64> {
        if ids.is_empty() {
            return HashMap::new();
        }

        let url = format!(
            "{}?ids={}&vs_currencies=usd",
            COINGECKO_SIMPLE_PRICE,
            ids.join(",")
        );

        match http::get_json(&self.client, &url).await {
            Ok(body) => ids
                .iter()
                .filter_map(|id| {
                    let price = body.pointer(&format!("/{}/usd", id))?.as_f64()?;
                    Some((id.to_string(), price))
                })
                .collect(),
            Err(err) => {
                tracing::warn!("Price lookup failed, skipping USD valuation: {}", err);
                HashMap::new()
            }
        }
    }
}
