/// 验证码求解服务客户端
///
/// 一次请求拿回一批已求解的验证码，本层不做重试
use crate::clients::http::post_json;
use crate::error::{FetchError, FetchResult};
use crate::models::{CaptchaBatch, CaptchaToken};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// 验证码批次来源
#[async_trait]
pub trait CaptchaSource: Send + Sync {
    /// 请求 `count` 个已求解的验证码
    async fn request_batch(&self, count: usize) -> FetchResult<CaptchaBatch>;
}

/// 基于 HTTP 的验证码求解服务客户端
pub struct CaptchaClient {
    http: reqwest::Client,
    url: String,
}

impl CaptchaClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CaptchaSource for CaptchaClient {
    async fn request_batch(&self, count: usize) -> FetchResult<CaptchaBatch> {
        debug!("请求 {} 个验证码: {}", count, self.url);

        let body = post_json(&self.http, &self.url, &json!({ "count": count }))
            .await
            .map_err(|e| FetchError::SolverUnavailable(e.to_string()))?;

        parse_captcha_response(body)
    }
}

#[derive(Deserialize)]
struct CaptchaResponse {
    captchas: Vec<CaptchaToken>,
}

/// 解析求解服务响应：`{captchas: [{id, value}, ...]}`
///
/// 格式错误或列表为空都视为服务不可用
pub fn parse_captcha_response(body: Value) -> FetchResult<CaptchaBatch> {
    let response: CaptchaResponse = serde_json::from_value(body)
        .map_err(|e| FetchError::SolverUnavailable(format!("响应格式错误: {}", e)))?;

    if response.captchas.is_empty() {
        return Err(FetchError::SolverUnavailable("返回的验证码列表为空".to_string()));
    }

    Ok(CaptchaBatch::new(response.captchas))
}
