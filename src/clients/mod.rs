//! 客户端层（Clients）
//!
//! 封装所有与外部服务的 HTTP 交互，每个客户端实现一个能力 trait，
//! 上层只依赖 trait，测试时可以替换为内存实现。

pub mod captcha_client;
pub mod eci_client;
pub mod http;

pub use captcha_client::{CaptchaClient, CaptchaSource};
pub use eci_client::{DocumentFetcher, EciClient, LanguageSource};
pub use http::build_http_client;
