// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::RepositoryError;
use crate::domain::models::package::Package;
use crate::domain::models::scan_queue::ScanQueueItem;
use crate::domain::services::merge_policy::RelationChange;
use async_trait::async_trait;
use uuid::Uuid;

/// 包仓库特质
#[async_trait]
pub trait PackageRepository: Send + Sync {
    /// 根据ID查找包（包含参与者和依赖）
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Package>, RepositoryError>;
    /// 根据下载地址（身份键）查找包
    async fn find_by_download_url(&self, url: &str) -> Result<Option<Package>, RepositoryError>;
    /// 在同一事务中创建包、关联数据和扫描请求
    ///
    /// # 参数
    ///
    /// * `package` - 新包
    /// * `scan_priority` - 扫描请求优先级
    async fn create_with_scan_request(
        &self,
        package: &Package,
        scan_priority: i32,
    ) -> Result<(Package, ScanQueueItem), RepositoryError>;
    /// 在同一事务中写入合并结果
    ///
    /// # 参数
    ///
    /// * `package` - 合并后的包（含审计记录）
    /// * `parties` - 参与者的变更方式
    /// * `dependencies` - 依赖的变更方式
    async fn apply_merge(
        &self,
        package: &Package,
        parties: RelationChange,
        dependencies: RelationChange,
    ) -> Result<Package, RepositoryError>;
    /// 包总数
    async fn count(&self) -> Result<u64, RepositoryError>;
}
