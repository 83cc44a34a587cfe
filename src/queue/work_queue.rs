// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::work_item::{ChildUri, WorkItem};
use crate::domain::repositories::work_item_repository::{VisitCompletion, WorkItemRepository};
use crate::domain::repositories::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// 子URI入队结果
#[derive(Debug, Clone, PartialEq)]
pub enum ChildEnqueue {
    /// 已写入新记录
    Inserted(WorkItem),
    /// 已存在尚未访问的同URI记录，跳过
    Duplicate,
}

/// 工作项队列特质
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// 入队工作项（种子URI）
    async fn enqueue(&self, item: WorkItem) -> Result<WorkItem, QueueError>;

    /// 入队访问器产出的子URI
    ///
    /// 已访问的子URI直接写入；未访问的子URI只有在不存在尚未访问的同URI记录时才写入。
    async fn enqueue_child(
        &self,
        child: &ChildUri,
        now: DateTime<FixedOffset>,
    ) -> Result<ChildEnqueue, QueueError>;

    /// 认领下一个可访问的工作项
    async fn claim_visitable(&self) -> Result<Option<WorkItem>, QueueError>;

    /// 认领一批可映射的工作项
    ///
    /// 已认领部分后出错时返回已认领的部分，保证这些记录能被处理并释放
    async fn claim_mappable_batch(&self, limit: usize) -> Result<Vec<WorkItem>, QueueError>;

    /// 完成访问
    async fn complete_visit(
        &self,
        id: Uuid,
        completion: VisitCompletion,
    ) -> Result<WorkItem, QueueError>;

    /// 完成映射
    async fn complete_map(&self, id: Uuid, map_error: Option<String>)
        -> Result<WorkItem, QueueError>;

    /// 释放认领
    async fn release(&self, id: Uuid) -> Result<WorkItem, QueueError>;
}

/// 基于数据库的工作项队列
pub struct DatabaseWorkQueue<R: WorkItemRepository + ?Sized> {
    /// 工作项仓库
    repository: Arc<R>,
    /// 重访窗口
    revisit_window: Duration,
}

impl<R: WorkItemRepository + ?Sized> DatabaseWorkQueue<R> {
    /// 创建新的工作项队列
    ///
    /// # 参数
    ///
    /// * `repository` - 工作项仓库
    /// * `revisit_window` - 访问成功后多久可以再次访问
    pub fn new(repository: Arc<R>, revisit_window: Duration) -> Self {
        Self {
            repository,
            revisit_window,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }
}

#[async_trait]
impl<R: WorkItemRepository + ?Sized> WorkQueue for DatabaseWorkQueue<R> {
    async fn enqueue(&self, item: WorkItem) -> Result<WorkItem, QueueError> {
        Ok(self.repository.insert(&item).await?)
    }

    async fn enqueue_child(
        &self,
        child: &ChildUri,
        now: DateTime<FixedOffset>,
    ) -> Result<ChildEnqueue, QueueError> {
        if !child.visited && self.repository.exists_unvisited(&child.uri).await? {
            return Ok(ChildEnqueue::Duplicate);
        }
        let item = WorkItem::from_child(child, now);
        Ok(ChildEnqueue::Inserted(self.repository.insert(&item).await?))
    }

    async fn claim_visitable(&self) -> Result<Option<WorkItem>, QueueError> {
        let revisit_before: DateTime<FixedOffset> = (Utc::now() - self.revisit_window).into();
        Ok(self.repository.claim_next_visitable(revisit_before).await?)
    }

    async fn claim_mappable_batch(&self, limit: usize) -> Result<Vec<WorkItem>, QueueError> {
        let mut batch = Vec::with_capacity(limit);
        while batch.len() < limit {
            match self.repository.claim_next_mappable().await {
                Ok(Some(item)) => batch.push(item),
                Ok(None) => break,
                Err(e) if batch.is_empty() => return Err(e.into()),
                Err(e) => {
                    warn!(
                        claimed = batch.len(),
                        error = %e,
                        "Claim failed mid-batch, returning partial batch"
                    );
                    break;
                }
            }
        }
        Ok(batch)
    }

    async fn complete_visit(
        &self,
        id: Uuid,
        completion: VisitCompletion,
    ) -> Result<WorkItem, QueueError> {
        Ok(self.repository.finish_visit(id, completion).await?)
    }

    async fn complete_map(
        &self,
        id: Uuid,
        map_error: Option<String>,
    ) -> Result<WorkItem, QueueError> {
        Ok(self.repository.finish_map(id, map_error).await?)
    }

    async fn release(&self, id: Uuid) -> Result<WorkItem, QueueError> {
        Ok(self.repository.release(id).await?)
    }
}
