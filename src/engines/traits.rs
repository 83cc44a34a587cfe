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

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum FetchError {
    /// 传输失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 非2xx响应
    #[error("Unexpected status {status} for {url}")]
    Status { status: u16, url: String },
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// URL无效
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 如果错误是可重试的则返回true，否则返回false
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::RequestFailed(e) => e.is_timeout() || e.is_connect(),
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Timeout => true,
            FetchError::InvalidUrl(_) => false,
        }
    }
}

/// HTTP 抓取接口
///
/// 超时作为参数传入，调度器本身不负责超时控制。
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// 获取URI内容，非2xx或传输失败时返回错误
    async fn fetch(&self, uri: &str, timeout: Duration) -> Result<Bytes, FetchError>;

    /// 获取引擎名称
    fn name(&self) -> &'static str;
}
