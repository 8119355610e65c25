use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// 程序配置
///
/// 解析顺序：默认值 → TOML 配置文件（可选）→ 环境变量 → 命令行参数
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 选区元数据目录（每个邦一个子目录，内含 state.json）
    pub metadata_dir: PathBuf,
    /// PDF 输出根目录，文件写入 `<output_root>/<stateCd>/pdfs/`
    pub output_root: PathBuf,
    /// 验证码求解服务地址
    pub captcha_url: String,
    /// 选举委员会网关地址
    pub eci_base_url: String,
    /// 每个分区请求的验证码数量
    pub captcha_batch_size: usize,
    /// 同时处理的分组数量
    pub concurrency: usize,
    /// 每个分组包含的分区数量
    pub group_size: usize,
    /// 语言优先级（靠前优先）
    pub preferred_languages: Vec<String>,
    /// 单次网络请求超时（秒）
    pub request_timeout_secs: u64,
    /// 失败台账输出文件
    pub ledger_file: PathBuf,
    /// 统计报告输出目录
    pub insights_dir: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metadata_dir: PathBuf::from("output/metadata/states"),
            output_root: PathBuf::from("output/metadata/states"),
            captcha_url: "http://localhost:8000/generate_and_solve_captchas".to_string(),
            eci_base_url: "https://gateway-voters.eci.gov.in/api/v1".to_string(),
            captcha_batch_size: 10,
            concurrency: 5,
            group_size: 10,
            preferred_languages: vec!["ENG".to_string(), "HIN".to_string()],
            request_timeout_secs: 60,
            ledger_file: PathBuf::from("output/failed_parts.json"),
            insights_dir: PathBuf::from("output/insights"),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从 TOML 文件加载配置，缺省字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 默认值 + 环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// 使用环境变量覆盖已有配置
    ///
    /// `lookup` 用于读取变量，测试中可以替换为内存表
    pub fn with_env_overrides<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            metadata_dir: lookup("METADATA_DIR").map(PathBuf::from).unwrap_or(self.metadata_dir),
            output_root: lookup("OUTPUT_ROOT").map(PathBuf::from).unwrap_or(self.output_root),
            captcha_url: lookup("CAPTCHA_URL").unwrap_or(self.captcha_url),
            eci_base_url: lookup("ECI_BASE_URL").unwrap_or(self.eci_base_url),
            captcha_batch_size: parse_var(&lookup, "NUMBER_OF_CAPTCHAS").unwrap_or(self.captcha_batch_size),
            concurrency: parse_var(&lookup, "CONCURRENCY").unwrap_or(self.concurrency),
            group_size: parse_var(&lookup, "GROUP_SIZE").unwrap_or(self.group_size),
            preferred_languages: lookup("PREFERRED_LANGUAGES")
                .map(|v| parse_language_list(&v))
                .unwrap_or(self.preferred_languages),
            request_timeout_secs: parse_var(&lookup, "REQUEST_TIMEOUT_SECS").unwrap_or(self.request_timeout_secs),
            ledger_file: lookup("LEDGER_FILE").map(PathBuf::from).unwrap_or(self.ledger_file),
            insights_dir: lookup("INSIGHTS_DIR").map(PathBuf::from).unwrap_or(self.insights_dir),
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
        }
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency 必须大于 0");
        }
        if self.group_size == 0 {
            anyhow::bail!("group_size 必须大于 0");
        }
        if self.captcha_batch_size == 0 {
            anyhow::bail!("captcha_batch_size 必须大于 0");
        }
        if self.captcha_url.trim().is_empty() {
            anyhow::bail!("captcha_url 不能为空");
        }
        if self.eci_base_url.trim().is_empty() {
            anyhow::bail!("eci_base_url 不能为空");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 语言列表接口
    pub fn languages_url(&self) -> String {
        format!(
            "{}/printing-publish/get-ac-languages",
            self.eci_base_url.trim_end_matches('/')
        )
    }

    /// 受验证码保护的 PDF 下载接口
    pub fn download_url(&self) -> String {
        format!(
            "{}/printing-publish/generate-published-geroll",
            self.eci_base_url.trim_end_matches('/')
        )
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name).and_then(|v| v.trim().parse().ok())
}

fn parse_language_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
