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

use crate::domain::models::work_item::WorkItem;
use crate::domain::repositories::work_item_repository::{VisitCompletion, WorkItemRepository};
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::work_item as work_item_entity;
use crate::routing::RouteTable;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::{LockBehavior, LockType},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 工作项仓库实现
///
/// 基于SeaORM实现。认领操作使用 `FOR UPDATE SKIP LOCKED`，
/// 并发认领者既不会拿到同一行，也不会互相等待。
#[derive(Clone)]
pub struct WorkItemRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
    /// 用于计算路由标记的路由表
    routes: Arc<RouteTable>,
}

impl WorkItemRepositoryImpl {
    /// 创建新的工作项仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    /// * `routes` - 路由表
    pub fn new(db: Arc<DatabaseConnection>, routes: Arc<RouteTable>) -> Self {
        Self { db, routes }
    }

    /// 锁定并认领查询到的第一行
    async fn claim(
        &self,
        query: Select<work_item_entity::Entity>,
    ) -> Result<Option<WorkItem>, RepositoryError> {
        let txn = self.db.begin().await?;

        let candidate = query
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .one(&txn)
            .await?;

        let Some(model) = candidate else {
            txn.commit().await?;
            return Ok(None);
        };

        let mut active: work_item_entity::ActiveModel = model.into();
        active.wip_at = Set(Some(Utc::now().into()));
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        debug!(id = %updated.id, uri = %updated.uri, "Claimed work item");
        Ok(Some(updated.into()))
    }

    async fn load(&self, id: Uuid) -> Result<work_item_entity::Model, RepositoryError> {
        work_item_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// 写回并重新计算路由标记
    async fn save(&self, mut item: WorkItem) -> Result<WorkItem, RepositoryError> {
        self.routes.apply_flags(&mut item);
        let active: work_item_entity::ActiveModel = item.into();
        let updated = active.update(self.db.as_ref()).await?;
        Ok(updated.into())
    }
}

impl From<work_item_entity::Model> for WorkItem {
    fn from(model: work_item_entity::Model) -> Self {
        Self {
            id: model.id,
            uri: model.uri,
            canonical_uri: model.canonical_uri,
            source_uri: model.source_uri,
            priority: model.priority,
            wip_at: model.wip_at,
            file_name: model.file_name,
            size: model.size,
            md5: model.md5,
            sha1: model.sha1,
            sha256: model.sha256,
            last_modified_at: model.last_modified_at,
            data: model.data,
            package_identity: model.package_identity,
            last_visit_at: model.last_visit_at,
            is_visitable: model.is_visitable,
            visit_error: model.visit_error,
            last_map_at: model.last_map_at,
            is_mappable: model.is_mappable,
            map_error: model.map_error,
            mining_level: model.mining_level,
            created_at: model.created_at,
        }
    }
}

impl From<WorkItem> for work_item_entity::ActiveModel {
    fn from(item: WorkItem) -> Self {
        Self {
            id: Set(item.id),
            uri: Set(item.uri),
            canonical_uri: Set(item.canonical_uri),
            source_uri: Set(item.source_uri),
            priority: Set(item.priority),
            wip_at: Set(item.wip_at),
            file_name: Set(item.file_name),
            size: Set(item.size),
            md5: Set(item.md5),
            sha1: Set(item.sha1),
            sha256: Set(item.sha256),
            last_modified_at: Set(item.last_modified_at),
            data: Set(item.data),
            package_identity: Set(item.package_identity),
            last_visit_at: Set(item.last_visit_at),
            is_visitable: Set(item.is_visitable),
            visit_error: Set(item.visit_error),
            last_map_at: Set(item.last_map_at),
            is_mappable: Set(item.is_mappable),
            map_error: Set(item.map_error),
            mining_level: Set(item.mining_level),
            created_at: Set(item.created_at),
        }
    }
}

#[async_trait]
impl WorkItemRepository for WorkItemRepositoryImpl {
    async fn insert(&self, item: &WorkItem) -> Result<WorkItem, RepositoryError> {
        let mut item = item.clone();
        self.routes.apply_flags(&mut item);
        let active: work_item_entity::ActiveModel = item.into();
        let inserted = active.insert(self.db.as_ref()).await?;
        Ok(inserted.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WorkItem>, RepositoryError> {
        let model = work_item_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(|m| m.into()))
    }

    async fn find_by_uri(&self, uri: &str) -> Result<Vec<WorkItem>, RepositoryError> {
        let models = work_item_entity::Entity::find()
            .filter(work_item_entity::Column::Uri.eq(uri))
            .order_by_asc(work_item_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(|m| m.into()).collect())
    }

    async fn exists_unvisited(&self, uri: &str) -> Result<bool, RepositoryError> {
        let count = work_item_entity::Entity::find()
            .filter(work_item_entity::Column::Uri.eq(uri))
            .filter(work_item_entity::Column::LastVisitAt.is_null())
            .count(self.db.as_ref())
            .await?;
        Ok(count > 0)
    }

    async fn claim_next_visitable(
        &self,
        revisit_before: DateTime<FixedOffset>,
    ) -> Result<Option<WorkItem>, RepositoryError> {
        // Mappable items that were never mapped are not revisited
        let awaiting_first_map = Condition::all()
            .add(work_item_entity::Column::IsMappable.eq(true))
            .add(work_item_entity::Column::LastMapAt.is_null());

        let query = work_item_entity::Entity::find()
            .filter(work_item_entity::Column::WipAt.is_null())
            .filter(work_item_entity::Column::IsVisitable.eq(true))
            .filter(
                Condition::any()
                    .add(work_item_entity::Column::LastVisitAt.is_null())
                    .add(
                        Condition::all()
                            .add(work_item_entity::Column::LastVisitAt.lte(revisit_before))
                            .add(awaiting_first_map.not()),
                    ),
            )
            .order_by_desc(work_item_entity::Column::Priority)
            .order_by_desc(work_item_entity::Column::Uri);

        self.claim(query).await
    }

    async fn claim_next_mappable(&self) -> Result<Option<WorkItem>, RepositoryError> {
        let query = work_item_entity::Entity::find()
            .filter(work_item_entity::Column::WipAt.is_null())
            .filter(work_item_entity::Column::IsMappable.eq(true))
            .filter(work_item_entity::Column::LastVisitAt.is_not_null())
            .filter(work_item_entity::Column::VisitError.is_null())
            .filter(work_item_entity::Column::LastMapAt.is_null())
            .filter(work_item_entity::Column::MapError.is_null())
            .order_by_desc(work_item_entity::Column::Priority);

        self.claim(query).await
    }

    async fn finish_visit(
        &self,
        id: Uuid,
        completion: VisitCompletion,
    ) -> Result<WorkItem, RepositoryError> {
        let mut item: WorkItem = self.load(id).await?.into();
        item.wip_at = None;
        item.last_visit_at = Some(Utc::now().into());
        if completion.data.is_some() {
            item.data = completion.data;
        }
        item.visit_error = completion.visit_error;
        self.save(item).await
    }

    async fn finish_map(
        &self,
        id: Uuid,
        map_error: Option<String>,
    ) -> Result<WorkItem, RepositoryError> {
        let mut item: WorkItem = self.load(id).await?.into();
        item.wip_at = None;
        item.last_map_at = Some(Utc::now().into());
        item.map_error = map_error;
        self.save(item).await
    }

    async fn release(&self, id: Uuid) -> Result<WorkItem, RepositoryError> {
        let mut item: WorkItem = self.load(id).await?.into();
        item.wip_at = None;
        self.save(item).await
    }

    async fn refresh_routability(&self) -> Result<u64, RepositoryError> {
        let mut pages = work_item_entity::Entity::find()
            .filter(work_item_entity::Column::WipAt.is_null())
            .order_by_asc(work_item_entity::Column::Id)
            .paginate(self.db.as_ref(), 500);

        let mut changed = 0;
        while let Some(models) = pages.fetch_and_next().await? {
            for model in models {
                let visitable = self.routes.visit.is_routable(&model.uri);
                let mappable = self.routes.map.is_routable(&model.uri);
                if visitable == model.is_visitable && mappable == model.is_mappable {
                    continue;
                }
                let mut active: work_item_entity::ActiveModel = model.into();
                active.is_visitable = Set(visitable);
                active.is_mappable = Set(mappable);
                active.update(self.db.as_ref()).await?;
                changed += 1;
            }
        }

        Ok(changed)
    }

    async fn reset_map(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut active: work_item_entity::ActiveModel = self.load(id).await?.into();
        active.last_map_at = Set(None);
        active.map_error = Set(None);
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(work_item_entity::Entity::find()
            .count(self.db.as_ref())
            .await?)
    }
}
