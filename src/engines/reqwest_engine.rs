// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::engines::traits::{FetchError, Fetcher};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// 默认 User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("harvestrs/", env!("CARGO_PKG_VERSION"));

/// 基于reqwest实现的HTTP抓取引擎
#[derive(Debug, Clone)]
pub struct ReqwestEngine {
    user_agent: String,
}

impl Default for ReqwestEngine {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl ReqwestEngine {
    /// 创建新的抓取引擎
    ///
    /// # 参数
    ///
    /// * `user_agent` - 请求使用的 User-Agent
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl Fetcher for ReqwestEngine {
    /// 执行HTTP抓取
    ///
    /// # 参数
    ///
    /// * `uri` - 目标URI
    /// * `timeout` - 请求超时
    ///
    /// # 返回值
    ///
    /// * `Ok(Bytes)` - 响应体
    /// * `Err(FetchError)` - 抓取过程中出现的错误
    async fn fetch(&self, uri: &str, timeout: Duration) -> Result<Bytes, FetchError> {
        let url = Url::parse(uri).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", uri, e)))?;

        // Each request gets a fresh client for cookie isolation
        let client = reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(timeout)
            .build()?;

        let start = Instant::now();
        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::RequestFailed(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: uri.to_string(),
            });
        }

        let body = response.bytes().await?;
        debug!(
            uri,
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched"
        );
        Ok(body)
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
