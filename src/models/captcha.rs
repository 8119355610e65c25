//! 验证码令牌与批次

use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;

/// 求解服务签发的验证码（值 + ID）
///
/// 每个令牌只能用于一次下载尝试。ID 可能是字符串也可能是数字，
/// 原样保留并原样回传给下载接口
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaptchaToken {
    pub id: Value,
    pub value: String,
}

impl CaptchaToken {
    pub fn new(id: impl Into<Value>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

/// 一批验证码，按顺序从前往后消费
#[derive(Debug, Clone, Default)]
pub struct CaptchaBatch {
    tokens: VecDeque<CaptchaToken>,
}

impl CaptchaBatch {
    pub fn new(tokens: Vec<CaptchaToken>) -> Self {
        Self {
            tokens: tokens.into(),
        }
    }

    /// 取出下一个未使用的令牌
    pub fn next_token(&mut self) -> Option<CaptchaToken> {
        self.tokens.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Iterator for CaptchaBatch {
    type Item = CaptchaToken;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
