// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::robots::{RobotsPolicy, MAX_CRAWL_DELAY};
use crate::utils::shutdown::StopSignal;
use crate::utils::throttle::HostThrottle;
use crate::utils::url_utils;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 礼貌检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// 可以抓取
    Allowed,
    /// robots.txt 禁止访问
    Disallowed,
    /// 等待限速间隔时收到停止信号，不应发出请求
    Interrupted,
}

/// 礼貌控制器
///
/// 在每次抓取前检查 robots.txt 并按主机限速。
#[derive(Clone)]
pub struct PolitenessController {
    robots: Arc<dyn RobotsPolicy>,
    throttle: HostThrottle,
    user_agent: String,
    default_delay: Duration,
    /// 超过该时长未抓取的主机不再影响限速
    host_retention: Duration,
    ignore_robots: bool,
    ignore_throttle: bool,
}

impl PolitenessController {
    /// 创建礼貌控制器
    ///
    /// # 参数
    ///
    /// * `robots` - robots.txt 策略
    /// * `throttle` - 主机限速缓存
    /// * `user_agent` - 用于匹配 robots.txt 的 User-Agent
    /// * `default_delay` - 站点未声明 Crawl-delay 时使用的间隔
    pub fn new(
        robots: Arc<dyn RobotsPolicy>,
        throttle: HostThrottle,
        user_agent: impl Into<String>,
        default_delay: Duration,
    ) -> Self {
        Self {
            robots,
            throttle,
            user_agent: user_agent.into(),
            default_delay,
            host_retention: default_delay.max(MAX_CRAWL_DELAY),
            ignore_robots: false,
            ignore_throttle: false,
        }
    }

    pub fn ignore_robots(mut self, ignore: bool) -> Self {
        self.ignore_robots = ignore;
        self
    }

    pub fn ignore_throttle(mut self, ignore: bool) -> Self {
        self.ignore_throttle = ignore;
        self
    }

    /// 设置主机记录的保留时长，应不小于任何可能生效的抓取间隔
    pub fn with_host_retention(mut self, retention: Duration) -> Self {
        self.host_retention = retention;
        self
    }

    pub fn throttle(&self) -> &HostThrottle {
        &self.throttle
    }

    /// 清理已不再影响限速的主机记录
    ///
    /// # 返回值
    ///
    /// 被清理的主机数量
    pub fn prune_idle_hosts(&self) -> usize {
        self.throttle.prune(self.host_retention, Instant::now())
    }

    /// 抓取前的礼貌检查
    ///
    /// robots.txt 禁止时直接返回 `Disallowed`；否则等待该主机剩余的间隔，
    /// 并在发出请求前记录本次抓取时间。robots.txt 读取失败时按允许处理。
    /// 等待期间收到停止信号时返回 `Interrupted`，不记录抓取时间。
    pub async fn admit(&self, uri: &str, stop: &StopSignal) -> Admission {
        if !self.ignore_robots {
            match self.robots.disallowed(uri, &self.user_agent).await {
                Ok(true) => return Admission::Disallowed,
                Ok(false) => {}
                Err(e) => warn!(uri, "Robots check failed, allowing fetch: {}", e),
            }
        }

        if self.ignore_throttle {
            return Admission::Allowed;
        }

        let host = match url_utils::host_of(uri) {
            Some(host) => host,
            None => return Admission::Allowed,
        };

        let delay = match self.robots.delay(uri, &self.user_agent).await {
            Ok(Some(delay)) => delay,
            _ => self.default_delay,
        };

        let remaining = self.throttle.remaining(&host, delay, Instant::now());
        if !remaining.is_zero() {
            debug!(host, wait_ms = remaining.as_millis() as u64, "Throttling host");
            if stop.sleep(remaining).await {
                debug!(host, "Stop requested while throttled, fetch abandoned");
                return Admission::Interrupted;
            }
        }
        self.throttle.record(&host, Instant::now());
        Admission::Allowed
    }
}

#[cfg(test)]
#[path = "politeness_test.rs"]
mod tests;
