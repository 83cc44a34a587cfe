// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::RepositoryError;
use crate::domain::models::work_item::WorkItem;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

/// 访问完成时写回的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitCompletion {
    /// 抓取到的数据，`None` 时保留原值
    pub data: Option<String>,
    /// 访问错误，`None` 表示清除旧错误
    pub visit_error: Option<String>,
}

/// 工作项仓库特质
///
/// 所有写入操作都会根据当前路由表重新计算 `is_visitable` / `is_mappable`。
#[async_trait]
pub trait WorkItemRepository: Send + Sync {
    /// 插入新工作项
    async fn insert(&self, item: &WorkItem) -> Result<WorkItem, RepositoryError>;
    /// 根据ID查找工作项
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WorkItem>, RepositoryError>;
    /// 查找同一原始URI的全部记录（按创建时间升序）
    async fn find_by_uri(&self, uri: &str) -> Result<Vec<WorkItem>, RepositoryError>;
    /// 是否存在该原始URI尚未访问的记录
    async fn exists_unvisited(&self, uri: &str) -> Result<bool, RepositoryError>;
    /// 认领下一个可访问的工作项
    ///
    /// # 参数
    ///
    /// * `revisit_before` - 不晚于该时间访问过的记录可以被重访
    async fn claim_next_visitable(
        &self,
        revisit_before: DateTime<FixedOffset>,
    ) -> Result<Option<WorkItem>, RepositoryError>;
    /// 认领下一个可映射的工作项
    async fn claim_next_mappable(&self) -> Result<Option<WorkItem>, RepositoryError>;
    /// 完成访问：清除认领标记并记录访问时间
    async fn finish_visit(
        &self,
        id: Uuid,
        completion: VisitCompletion,
    ) -> Result<WorkItem, RepositoryError>;
    /// 完成映射：清除认领标记并记录映射时间
    async fn finish_map(
        &self,
        id: Uuid,
        map_error: Option<String>,
    ) -> Result<WorkItem, RepositoryError>;
    /// 释放认领但不记录结果，同时重新计算路由标记
    async fn release(&self, id: Uuid) -> Result<WorkItem, RepositoryError>;
    /// 重新计算未认领记录的路由标记
    ///
    /// # 返回值
    ///
    /// 标记发生变化的记录数量
    async fn refresh_routability(&self) -> Result<u64, RepositoryError>;
    /// 清除映射结果，使记录可以再次被映射
    async fn reset_map(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// 记录总数
    async fn count(&self) -> Result<u64, RepositoryError>;
}
