// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 按主机记录最近一次抓取时间的限速缓存
///
/// 并发更新可能产生竞争，这里只保证"礼貌"，不保证精确间隔。
#[derive(Clone, Default, Debug)]
pub struct HostThrottle {
    last_fetch: Arc<DashMap<String, Instant>>,
}

impl HostThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 距离下一次允许抓取还需等待的时长
    pub fn remaining(&self, host: &str, delay: Duration, now: Instant) -> Duration {
        match self.last_fetch.get(host) {
            Some(last) => delay.saturating_sub(now.saturating_duration_since(*last)),
            None => Duration::ZERO,
        }
    }

    /// 记录本次抓取时间
    pub fn record(&self, host: &str, at: Instant) {
        self.last_fetch.insert(host.to_string(), at);
    }

    /// 清理早于 `older_than` 之前的记录
    ///
    /// # 返回值
    ///
    /// 被清理的主机数量
    pub fn prune(&self, older_than: Duration, now: Instant) -> usize {
        let before = self.last_fetch.len();
        self.last_fetch
            .retain(|_, last| now.saturating_duration_since(*last) < older_than);
        before - self.last_fetch.len()
    }

    pub fn len(&self) -> usize {
        self.last_fetch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_fetch.is_empty()
    }
}
