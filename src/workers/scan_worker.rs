// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ScanSettings;
use crate::domain::models::scan_queue::{ScanQueueItem, ScanStatus};
use crate::domain::repositories::scan_queue_repository::ScanQueueRepository;
use crate::utils::errors::{truncate_error, WorkerError};
use crate::utils::shutdown::StopSignal;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Utc};
use metrics::counter;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// 外部扫描服务报告的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteScanStatus {
    /// 已排队，尚未开始
    Queued,
    /// 正在扫描
    Running,
    /// 扫描完成
    Completed,
    /// 扫描失败
    Failed(String),
}

/// 外部扫描服务
#[async_trait]
pub trait ScanService: Send + Sync {
    /// 提交扫描，返回服务端句柄
    async fn submit(&self, uri: &str) -> anyhow::Result<String>;

    /// 查询扫描状态
    async fn status(&self, handle: &str) -> anyhow::Result<RemoteScanStatus>;
}

/// 扫描结果索引器
#[async_trait]
pub trait ScanIndexer: Send + Sync {
    /// 拉取扫描结果并写入包索引
    async fn index(&self, item: &ScanQueueItem) -> anyhow::Result<()>;
}

/// 扫描工作器选项
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub exit_on_empty: bool,
    pub idle_sleep: Duration,
    /// 两次轮询之间的最小间隔
    pub poll_interval: ChronoDuration,
    /// 提交后超过该时长视为超时
    pub timeout: ChronoDuration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exit_on_empty: false,
            idle_sleep: Duration::from_secs(10),
            poll_interval: ChronoDuration::seconds(60),
            timeout: ChronoDuration::hours(24),
        }
    }
}

impl From<&ScanSettings> for ScanOptions {
    fn from(settings: &ScanSettings) -> Self {
        Self {
            exit_on_empty: false,
            idle_sleep: settings.idle_sleep(),
            poll_interval: settings.poll_interval(),
            timeout: settings.timeout(),
        }
    }
}

/// 扫描统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// 处理的请求数
    pub processed: usize,
    pub submitted: usize,
    pub indexed: usize,
    /// 进入 FAILED / TIMEOUT / INDEX_FAILED 的请求数
    pub failed: usize,
}

impl fmt::Display for ScanStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Processed {} scan requests: {} submitted, {} indexed, {} failed",
            self.processed, self.submitted, self.indexed, self.failed
        )
    }
}

/// 扫描工作器
///
/// 认领扫描请求并推进其生命周期：提交、轮询、索引。
pub struct ScanWorker<R: ScanQueueRepository + ?Sized> {
    repository: Arc<R>,
    service: Arc<dyn ScanService>,
    indexer: Arc<dyn ScanIndexer>,
    options: ScanOptions,
}

impl<R: ScanQueueRepository + ?Sized> ScanWorker<R> {
    pub fn new(
        repository: Arc<R>,
        service: Arc<dyn ScanService>,
        indexer: Arc<dyn ScanIndexer>,
        options: ScanOptions,
    ) -> Self {
        Self {
            repository,
            service,
            indexer,
            options,
        }
    }

    /// 认领并推进一个扫描请求
    ///
    /// # 返回值
    ///
    /// 没有可认领的请求时返回 `Ok(None)`，否则返回推进后的请求
    pub async fn process_next(
        &self,
        stats: &mut ScanStats,
    ) -> Result<Option<ScanQueueItem>, WorkerError> {
        let poll_before: DateTime<FixedOffset> = (Utc::now() - self.options.poll_interval).into();
        let Some(item) = self.repository.claim_next(poll_before).await? else {
            return Ok(None);
        };
        let advanced = self.advance(item, stats).await;
        let saved = self.repository.complete(&advanced).await?;
        Ok(Some(saved))
    }

    #[instrument(skip(self, item, stats), fields(id = %item.id, status = %item.scan_status))]
    async fn advance(&self, mut item: ScanQueueItem, stats: &mut ScanStats) -> ScanQueueItem {
        stats.processed += 1;
        let now: DateTime<FixedOffset> = Utc::now().into();

        match item.scan_status {
            ScanStatus::New => {
                item.last_polled_at = Some(now);
                match self.service.submit(&item.uri).await {
                    Ok(handle) => {
                        item.scan_handle = Some(handle);
                        item.scan_requested_at = Some(now);
                        item.scan_error = None;
                        stats.submitted += 1;
                        transition(&mut item, ScanStatus::Submitted);
                    }
                    Err(e) => {
                        warn!("Scan submission failed: {}", e);
                        item.scan_error = Some(truncate_error(&format!("{:#}", e)));
                    }
                }
            }
            ScanStatus::Submitted | ScanStatus::InProgress => {
                item.last_polled_at = Some(now);
                let requested_at = item.scan_requested_at.unwrap_or(item.created_at);
                if now - requested_at >= self.options.timeout {
                    item.scan_error = Some(format!(
                        "Scan not completed within {} hours",
                        self.options.timeout.num_hours()
                    ));
                    stats.failed += 1;
                    transition(&mut item, ScanStatus::Timeout);
                    return item;
                }

                let Some(handle) = item.scan_handle.clone() else {
                    item.scan_error = Some("Submitted scan has no handle".to_string());
                    stats.failed += 1;
                    transition(&mut item, ScanStatus::Failed);
                    return item;
                };

                match self.service.status(&handle).await {
                    Ok(RemoteScanStatus::Queued) => {}
                    Ok(RemoteScanStatus::Running) => transition(&mut item, ScanStatus::InProgress),
                    Ok(RemoteScanStatus::Completed) => transition(&mut item, ScanStatus::Completed),
                    Ok(RemoteScanStatus::Failed(message)) => {
                        item.scan_error = Some(truncate_error(&message));
                        stats.failed += 1;
                        transition(&mut item, ScanStatus::Failed);
                    }
                    Err(e) => {
                        warn!("Scan status poll failed: {}", e);
                        item.scan_error = Some(truncate_error(&format!("{:#}", e)));
                    }
                }
            }
            ScanStatus::Completed => match self.indexer.index(&item).await {
                Ok(()) => {
                    item.index_error = None;
                    stats.indexed += 1;
                    transition(&mut item, ScanStatus::Indexed);
                }
                Err(e) => {
                    error!("Indexing scan results failed: {}", e);
                    item.index_error = Some(truncate_error(&format!("{:#}", e)));
                    stats.failed += 1;
                    transition(&mut item, ScanStatus::IndexFailed);
                }
            },
            status => warn!(%status, "Terminal scan request was claimed, leaving unchanged"),
        }

        item
    }
}

fn transition(item: &mut ScanQueueItem, next: ScanStatus) {
    if item.scan_status == next {
        return;
    }
    if !item.scan_status.can_transition_to(next) {
        warn!(from = %item.scan_status, to = %next, "Invalid scan status transition");
        return;
    }
    counter!("scan_transitions_total", "to" => next.to_string()).increment(1);
    info!(from = %item.scan_status, to = %next, "Scan status changed");
    item.scan_status = next;
}

#[async_trait]
impl<R: ScanQueueRepository + ?Sized + 'static> Worker for ScanWorker<R> {
    type Stats = ScanStats;

    async fn run(&self, stop: StopSignal) -> Result<ScanStats, WorkerError> {
        info!("Scan worker started");
        let mut stats = ScanStats::default();
        let mut idle = false;

        loop {
            if stop.is_stopped() {
                info!("Stop requested, scan worker exiting");
                break;
            }

            match self.process_next(&mut stats).await {
                Ok(Some(_)) => {
                    idle = false;
                    continue;
                }
                Ok(None) => {
                    if self.options.exit_on_empty {
                        info!("No claimable scan requests, exiting");
                        break;
                    }
                    if !idle {
                        info!("Scan queue is empty, waiting");
                        idle = true;
                    }
                }
                Err(e) => error!("Error processing scan request: {}", e),
            }

            if stop.sleep(self.options.idle_sleep).await {
                break;
            }
        }

        info!("{}", stats);
        Ok(stats)
    }

    fn name(&self) -> &str {
        "scan"
    }
}

#[cfg(test)]
#[path = "scan_worker_test.rs"]
mod tests;
