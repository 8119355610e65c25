//! 选举委员会网关客户端
//!
//! 负责语言列表查询和受验证码保护的 PDF 下载，每次调用只发一个请求

use crate::clients::http::post_json;
use crate::config::Config;
use crate::error::{FetchError, FetchResult};
use crate::models::{CaptchaToken, FetchOutcome, WorkItem};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// 选区可用语言来源
#[async_trait]
pub trait LanguageSource: Send + Sync {
    /// 返回选区可用的语言代码（保持接口返回顺序）
    async fn available_languages(&self, item: &WorkItem) -> FetchResult<Vec<String>>;
}

/// 受保护文档下载
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// 使用一个验证码进行一次下载尝试，内部不重试
    async fn fetch(&self, item: &WorkItem, language: &str, token: &CaptchaToken) -> FetchOutcome;
}

/// 网关 HTTP 客户端
pub struct EciClient {
    http: reqwest::Client,
    languages_url: String,
    download_url: String,
}

impl EciClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            languages_url: config.languages_url(),
            download_url: config.download_url(),
        }
    }
}

#[async_trait]
impl LanguageSource for EciClient {
    async fn available_languages(&self, item: &WorkItem) -> FetchResult<Vec<String>> {
        let body = json!({
            "stateCd": item.state_cd,
            "districtCd": item.district_cd,
            "acNumber": item.ac_number,
        });

        let response = post_json(&self.http, &self.languages_url, &body).await?;
        parse_language_response(&self.languages_url, response)
    }
}

#[async_trait]
impl DocumentFetcher for EciClient {
    async fn fetch(&self, item: &WorkItem, language: &str, token: &CaptchaToken) -> FetchOutcome {
        let body = download_payload(item, language, token);
        debug!("{} 使用验证码 {} 请求下载", item, token.value);

        match post_json(&self.http, &self.download_url, &body).await {
            Ok(response) => parse_download_response(response),
            Err(e) => FetchOutcome::Failure(e),
        }
    }
}

/// 构建下载请求体；`isSupplement` 只在为 true 时发送
pub fn download_payload(item: &WorkItem, language: &str, token: &CaptchaToken) -> Value {
    let mut body = json!({
        "stateCd": item.state_cd,
        "districtCd": item.district_cd,
        "acNumber": item.ac_number,
        "partNumber": item.part_number,
        "langCd": language,
        "captcha": token.value,
        "captchaId": token.id,
    });
    if item.is_supplement {
        body["isSupplement"] = json!(true);
    }
    body
}

/// 解析下载响应：`{file: base64}`，缺失或为空视为 `EmptyPayload`
pub fn parse_download_response(response: Value) -> FetchOutcome {
    match response.get("file").and_then(|v| v.as_str()) {
        Some(file) if !file.trim().is_empty() => FetchOutcome::Success(file.as_bytes().to_vec()),
        _ => FetchOutcome::Failure(FetchError::EmptyPayload),
    }
}

/// 语言条目：可能是纯代码，也可能是带 `languagePneumonicL1` 的对象
#[derive(Deserialize)]
#[serde(untagged)]
enum LanguageEntry {
    Code(String),
    Detailed {
        #[serde(rename = "languagePneumonicL1")]
        code: String,
    },
}

#[derive(Deserialize)]
struct LanguageResponse {
    #[serde(default)]
    payload: Option<Vec<LanguageEntry>>,
}

/// 解析语言接口响应：`{payload: [...]}`
pub fn parse_language_response(endpoint: &str, response: Value) -> FetchResult<Vec<String>> {
    let parsed: LanguageResponse = serde_json::from_value(response)
        .map_err(|e| FetchError::transport(endpoint, format!("响应格式错误: {}", e)))?;

    let codes: Vec<String> = parsed
        .payload
        .unwrap_or_default()
        .into_iter()
        .map(|entry| match entry {
            LanguageEntry::Code(code) | LanguageEntry::Detailed { code } => code,
        })
        .filter(|code| !code.trim().is_empty())
        .collect();

    Ok(codes)
}
