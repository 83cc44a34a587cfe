// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// 默认的 Crawl-delay 上限
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(60);

/// Robots.txt策略接口
#[async_trait]
pub trait RobotsPolicy: Send + Sync {
    /// 检查URL是否被禁止访问
    async fn disallowed(&self, url_str: &str, user_agent: &str) -> Result<bool>;
    /// 获取爬取延迟
    async fn delay(&self, url_str: &str, user_agent: &str) -> Result<Option<Duration>>;
}

/// 缓存的Robots.txt内容
#[derive(Clone)]
struct CachedRobots {
    /// 内容
    content: String,

    /// 过期时间
    expires_at: Instant,
}

/// Robots.txt检查器
///
/// 每个站点的 robots.txt 缓存在 LRU 中，条目在 `ttl` 之后失效，
/// 超过 `capacity` 时淘汰最久未使用的站点。
#[derive(Clone)]
pub struct RobotsChecker {
    /// HTTP客户端
    client: Client,

    /// 内存缓存
    cache: Arc<Mutex<LruCache<String, CachedRobots>>>,

    /// 缓存有效期
    ttl: Duration,

    /// 抓取 robots.txt 的超时
    timeout: Duration,

    /// 站点声明的 Crawl-delay 会被截断到该值
    max_delay: Duration,
}

#[async_trait]
impl RobotsPolicy for RobotsChecker {
    async fn disallowed(&self, url_str: &str, user_agent: &str) -> Result<bool> {
        let content = self.get_robots_content(url_str).await?;
        let url = Url::parse(url_str)?;
        let mut matcher = DefaultMatcher::default();
        Ok(!matcher.one_agent_allowed_by_robots(&content, user_agent, url.as_str()))
    }

    async fn delay(&self, url_str: &str, user_agent: &str) -> Result<Option<Duration>> {
        let content = self.get_robots_content(url_str).await?;
        Ok(parse_crawl_delay(&content, user_agent, self.max_delay))
    }
}

impl Default for RobotsChecker {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600), 1024)
    }
}

impl RobotsChecker {
    /// 创建新的Robots检查器实例
    ///
    /// # 参数
    ///
    /// * `ttl` - 缓存有效期
    /// * `capacity` - 最多缓存的站点数
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            client: Client::new(),
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
            timeout: Duration::from_secs(5),
            max_delay: MAX_CRAWL_DELAY,
        }
    }

    /// 设置 Crawl-delay 上限
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// 获取Robots.txt内容（带缓存）
    async fn get_robots_content(&self, url_str: &str) -> Result<String> {
        let url = Url::parse(url_str)?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid URL: {}", url_str))?;
        let scheme = url.scheme();
        let robots_url = match url.port() {
            Some(port) => format!("{}://{}:{}/robots.txt", scheme, host, port),
            None => format!("{}://{}/robots.txt", scheme, host),
        };

        {
            let mut cache = self.cache.lock();
            if let Some(cached) = cache.get(&robots_url) {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.content.clone());
                }
                cache.pop(&robots_url);
            }
        }

        let content = match self
            .client
            .get(&robots_url)
            .header("User-Agent", crate::engines::reqwest_engine::DEFAULT_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            // 404 and other client errors mean there is no usable robots.txt
            Ok(_) => String::new(),
            Err(e) => {
                tracing::warn!("Failed to fetch robots.txt from {}: {}", robots_url, e);
                String::new()
            }
        };

        self.cache.lock().put(
            robots_url,
            CachedRobots {
                content: content.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );

        Ok(content)
    }
}

/// 解析Crawl-delay指令
///
/// 优先使用与 User-Agent 匹配的分组，其次是 `*` 分组。
/// 超过 `max_delay`（包括无法表示为 `Duration` 的值）时按 `max_delay` 处理。
fn parse_crawl_delay(content: &str, user_agent: &str, max_delay: Duration) -> Option<Duration> {
    let mut current_agent_matched = false;
    let mut delay: Option<f64> = None;
    let mut specific_agent_found = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let lower_line = line.to_lowercase();
        if lower_line.starts_with("user-agent:") {
            let agent = line[11..].trim();
            if agent == "*" {
                current_agent_matched = !specific_agent_found;
            } else if user_agent.to_lowercase().contains(&agent.to_lowercase()) {
                current_agent_matched = true;
                if !specific_agent_found {
                    delay = None;
                }
                specific_agent_found = true;
            } else {
                current_agent_matched = false;
            }
        } else if lower_line.starts_with("crawl-delay:") && current_agent_matched {
            if let Ok(d) = line[12..].trim().parse::<f64>() {
                delay = Some(d);
            }
        }
    }

    delay
        .filter(|d| !d.is_nan() && *d >= 0.0)
        .map(|d| {
            Duration::try_from_secs_f64(d)
                .map(|d| d.min(max_delay))
                .unwrap_or(max_delay)
        })
}

#[cfg(test)]
#[path = "robots_test.rs"]
mod tests;
