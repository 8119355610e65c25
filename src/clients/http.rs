use crate::config::Config;
use crate::error::{FetchError, FetchResult};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// 创建共享的 HTTP 客户端（每个请求独立超时）
pub fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("无法创建 HTTP 客户端")
}

/// 发送 JSON POST 请求并解析 JSON 响应
///
/// 网络错误和响应体解析失败返回 `TransportError`，非 2xx 返回 `UnexpectedStatus`
pub async fn post_json<B: Serialize + ?Sized>(
    http: &reqwest::Client,
    url: &str,
    body: &B,
) -> FetchResult<Value> {
    let response = http
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| FetchError::transport(url, e))?;

    let status = response.status();
    if !status.is_success() {
        debug!("接口 {} 返回状态 {}", url, status);
        return Err(FetchError::UnexpectedStatus {
            endpoint: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| FetchError::transport(url, e))
}
