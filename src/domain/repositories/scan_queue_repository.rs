// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::RepositoryError;
use crate::domain::models::scan_queue::ScanQueueItem;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

/// 扫描队列仓库特质
#[async_trait]
pub trait ScanQueueRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScanQueueItem>, RepositoryError>;
    /// 查找某个包的扫描请求
    async fn find_by_package(
        &self,
        package_id: Uuid,
    ) -> Result<Option<ScanQueueItem>, RepositoryError>;
    /// 认领下一个扫描请求
    ///
    /// 越靠后的阶段越优先，同阶段按优先级降序。未完成的请求只有在
    /// 上次提交或轮询早于 `poll_before` 时才会被认领。
    async fn claim_next(
        &self,
        poll_before: DateTime<FixedOffset>,
    ) -> Result<Option<ScanQueueItem>, RepositoryError>;
    /// 写回扫描请求并清除认领标记
    async fn complete(&self, item: &ScanQueueItem) -> Result<ScanQueueItem, RepositoryError>;
    /// 记录总数
    async fn count(&self) -> Result<u64, RepositoryError>;
}
