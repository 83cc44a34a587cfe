// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scan_queue::{ScanQueueItem, ScanStatus};
use crate::domain::repositories::scan_queue_repository::ScanQueueRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::scan_queue as scan_queue_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::{CaseStatement, LockBehavior, LockType, SimpleExpr},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

/// 扫描队列仓库实现
#[derive(Clone)]
pub struct ScanQueueRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl ScanQueueRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

/// 把 `ScanStatus::claim_rank` 翻译为排序表达式
fn claim_rank_expr() -> SimpleExpr {
    let mut rank = CaseStatement::new();
    for status in ScanStatus::CLAIMABLE {
        if let Some(value) = status.claim_rank() {
            rank = rank.case(
                scan_queue_entity::Column::ScanStatus.eq(status.code()),
                i32::from(value),
            );
        }
    }
    rank.finally(-1).into()
}

impl TryFrom<scan_queue_entity::Model> for ScanQueueItem {
    type Error = RepositoryError;

    fn try_from(model: scan_queue_entity::Model) -> Result<Self, Self::Error> {
        let scan_status = ScanStatus::from_code(model.scan_status).ok_or_else(|| {
            RepositoryError::Corrupt(format!("unknown scan status {}", model.scan_status))
        })?;
        Ok(Self {
            id: model.id,
            uri: model.uri,
            package_id: model.package_id,
            scan_status,
            scan_requested_at: model.scan_requested_at,
            last_polled_at: model.last_polled_at,
            scan_handle: model.scan_handle,
            scan_error: model.scan_error,
            index_error: model.index_error,
            priority: model.priority,
            wip_at: model.wip_at,
            created_at: model.created_at,
        })
    }
}

impl From<ScanQueueItem> for scan_queue_entity::ActiveModel {
    fn from(item: ScanQueueItem) -> Self {
        Self {
            id: Set(item.id),
            uri: Set(item.uri),
            package_id: Set(item.package_id),
            scan_status: Set(item.scan_status.code()),
            scan_requested_at: Set(item.scan_requested_at),
            last_polled_at: Set(item.last_polled_at),
            scan_handle: Set(item.scan_handle),
            scan_error: Set(item.scan_error),
            index_error: Set(item.index_error),
            priority: Set(item.priority),
            wip_at: Set(item.wip_at),
            created_at: Set(item.created_at),
        }
    }
}

#[async_trait]
impl ScanQueueRepository for ScanQueueRepositoryImpl {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScanQueueItem>, RepositoryError> {
        scan_queue_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(ScanQueueItem::try_from)
            .transpose()
    }

    async fn find_by_package(
        &self,
        package_id: Uuid,
    ) -> Result<Option<ScanQueueItem>, RepositoryError> {
        scan_queue_entity::Entity::find()
            .filter(scan_queue_entity::Column::PackageId.eq(package_id))
            .one(self.db.as_ref())
            .await?
            .map(ScanQueueItem::try_from)
            .transpose()
    }

    async fn claim_next(
        &self,
        poll_before: DateTime<FixedOffset>,
    ) -> Result<Option<ScanQueueItem>, RepositoryError> {
        let txn = self.db.begin().await?;

        let ready = Condition::any()
            .add(scan_queue_entity::Column::ScanStatus.eq(ScanStatus::Completed.code()))
            .add(
                Condition::all()
                    .add(scan_queue_entity::Column::ScanStatus.is_in([
                        ScanStatus::New.code(),
                        ScanStatus::Submitted.code(),
                        ScanStatus::InProgress.code(),
                    ]))
                    .add(
                        Condition::any()
                            .add(scan_queue_entity::Column::LastPolledAt.is_null())
                            .add(scan_queue_entity::Column::LastPolledAt.lte(poll_before)),
                    ),
            );

        let candidate = scan_queue_entity::Entity::find()
            .filter(scan_queue_entity::Column::WipAt.is_null())
            .filter(ready)
            .order_by_desc(claim_rank_expr())
            .order_by_desc(scan_queue_entity::Column::Priority)
            .order_by_asc(scan_queue_entity::Column::CreatedAt)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .one(&txn)
            .await?;

        let Some(model) = candidate else {
            txn.commit().await?;
            return Ok(None);
        };

        let mut active: scan_queue_entity::ActiveModel = model.into();
        active.wip_at = Set(Some(Utc::now().into()));
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        ScanQueueItem::try_from(updated).map(Some)
    }

    async fn complete(&self, item: &ScanQueueItem) -> Result<ScanQueueItem, RepositoryError> {
        let mut item = item.clone();
        item.wip_at = None;
        let active: scan_queue_entity::ActiveModel = item.into();
        let updated = active.update(self.db.as_ref()).await?;
        ScanQueueItem::try_from(updated)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(scan_queue_entity::Entity::find()
            .count(self.db.as_ref())
            .await?)
    }
}
