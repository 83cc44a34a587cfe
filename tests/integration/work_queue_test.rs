// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::work_item_repo;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use harvestrs::domain::models::work_item::{ChildUri, WorkItem};
use harvestrs::domain::repositories::work_item_repository::{VisitCompletion, WorkItemRepository};
use harvestrs::domain::repositories::RepositoryError;
use harvestrs::infrastructure::repositories::work_item_repo_impl::WorkItemRepositoryImpl;
use harvestrs::queue::work_queue::{ChildEnqueue, DatabaseWorkQueue, WorkQueue};
use sea_orm::DbErr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_enqueue_child_deduplicates_unvisited_uris() {
    let (_db, repo) = work_item_repo().await;
    let queue = DatabaseWorkQueue::new(repo.clone(), Duration::hours(240));
    let now = Utc::now().into();

    let first = queue
        .enqueue_child(&ChildUri::new("http://x/child"), now)
        .await
        .unwrap();
    assert!(matches!(first, ChildEnqueue::Inserted(_)));

    let second = queue
        .enqueue_child(&ChildUri::new("http://x/child"), now)
        .await
        .unwrap();
    assert_eq!(second, ChildEnqueue::Duplicate);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_visited_child_is_recorded_as_visited() {
    let (_db, repo) = work_item_repo().await;
    let queue = DatabaseWorkQueue::new(repo.clone(), Duration::hours(240));

    let child = ChildUri::visited("http://x/doc", Some("{}".to_string())).with_source("http://x/");
    let ChildEnqueue::Inserted(item) = queue.enqueue_child(&child, Utc::now().into()).await.unwrap()
    else {
        panic!("visited child should be inserted");
    };
    assert!(item.last_visit_at.is_some());
    assert_eq!(item.data.as_deref(), Some("{}"));
    assert_eq!(item.source_uri.as_deref(), Some("http://x/"));

    // Freshly visited children go straight to mapping
    assert!(queue.claim_visitable().await.unwrap().is_none());
    let batch = queue.claim_mappable_batch(10).await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].id, item.id);
}

#[tokio::test]
async fn test_claim_mappable_batch_respects_limit() {
    let (_db, repo) = work_item_repo().await;
    let queue = DatabaseWorkQueue::new(repo.clone(), Duration::hours(240));
    for i in 0..4 {
        let mut item = WorkItem::new(format!("http://x/{}", i));
        item.last_visit_at = Some(Utc::now().into());
        queue.enqueue(item).await.unwrap();
    }

    let batch = queue.claim_mappable_batch(3).await.unwrap();
    assert_eq!(batch.len(), 3);
    assert!(batch.iter().all(|item| item.wip_at.is_some()));

    let rest = queue.claim_mappable_batch(3).await.unwrap();
    assert_eq!(rest.len(), 1);
}

#[tokio::test]
async fn test_release_returns_item_to_queue() {
    let (_db, repo) = work_item_repo().await;
    let queue = DatabaseWorkQueue::new(repo.clone(), Duration::hours(240));
    let item = queue.enqueue(WorkItem::new("http://x/again")).await.unwrap();

    let claimed = queue.claim_visitable().await.unwrap().unwrap();
    assert!(queue.claim_visitable().await.unwrap().is_none());

    let released = queue.release(claimed.id).await.unwrap();
    assert!(released.wip_at.is_none());
    assert_eq!(
        queue.claim_visitable().await.unwrap().map(|i| i.id),
        Some(item.id)
    );
}

#[tokio::test]
async fn test_zero_revisit_window_revisits_mapped_items() {
    let (_db, repo) = work_item_repo().await;
    let queue = DatabaseWorkQueue::new(repo.clone(), Duration::zero());
    let item = queue.enqueue(WorkItem::new("http://x/fresh")).await.unwrap();

    queue.claim_visitable().await.unwrap();
    queue
        .complete_visit(item.id, VisitCompletion::default())
        .await
        .unwrap();
    queue.claim_mappable_batch(1).await.unwrap();
    queue.complete_map(item.id, None).await.unwrap();

    let again = queue.claim_visitable().await.unwrap();
    assert_eq!(again.map(|i| i.id), Some(item.id));
}

/// 第 `fail_on` 次认领映射项时返回数据库错误的仓库
struct FlakyClaims {
    inner: Arc<WorkItemRepositoryImpl>,
    claims: AtomicUsize,
    fail_on: usize,
}

#[async_trait]
impl WorkItemRepository for FlakyClaims {
    async fn insert(&self, item: &WorkItem) -> Result<WorkItem, RepositoryError> {
        self.inner.insert(item).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WorkItem>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_uri(&self, uri: &str) -> Result<Vec<WorkItem>, RepositoryError> {
        self.inner.find_by_uri(uri).await
    }

    async fn exists_unvisited(&self, uri: &str) -> Result<bool, RepositoryError> {
        self.inner.exists_unvisited(uri).await
    }

    async fn claim_next_visitable(
        &self,
        revisit_before: DateTime<FixedOffset>,
    ) -> Result<Option<WorkItem>, RepositoryError> {
        self.inner.claim_next_visitable(revisit_before).await
    }

    async fn claim_next_mappable(&self) -> Result<Option<WorkItem>, RepositoryError> {
        if self.claims.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(RepositoryError::Database(DbErr::Custom(
                "connection reset".to_string(),
            )));
        }
        self.inner.claim_next_mappable().await
    }

    async fn finish_visit(
        &self,
        id: Uuid,
        completion: VisitCompletion,
    ) -> Result<WorkItem, RepositoryError> {
        self.inner.finish_visit(id, completion).await
    }

    async fn finish_map(
        &self,
        id: Uuid,
        map_error: Option<String>,
    ) -> Result<WorkItem, RepositoryError> {
        self.inner.finish_map(id, map_error).await
    }

    async fn release(&self, id: Uuid) -> Result<WorkItem, RepositoryError> {
        self.inner.release(id).await
    }

    async fn refresh_routability(&self) -> Result<u64, RepositoryError> {
        self.inner.refresh_routability().await
    }

    async fn reset_map(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.inner.reset_map(id).await
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        self.inner.count().await
    }
}

async fn visited_items(repo: &Arc<WorkItemRepositoryImpl>, uris: &[&str]) {
    let now: DateTime<FixedOffset> = Utc::now().into();
    for uri in uris {
        let mut item = WorkItem::new(*uri);
        item.last_visit_at = Some(now);
        repo.insert(&item).await.unwrap();
    }
}

#[tokio::test]
async fn test_claim_failure_mid_batch_returns_claimed_items() {
    let (_db, repo) = work_item_repo().await;
    visited_items(&repo, &["http://x/1", "http://x/2", "http://x/3"]).await;

    let flaky = Arc::new(FlakyClaims {
        inner: repo.clone(),
        claims: AtomicUsize::new(0),
        fail_on: 2,
    });
    let queue = DatabaseWorkQueue::new(flaky, Duration::hours(240));

    let batch = queue.claim_mappable_batch(3).await.unwrap();
    assert_eq!(batch.len(), 1);

    // The claimed item can still be completed by the caller
    let done = queue.complete_map(batch[0].id, None).await.unwrap();
    assert!(done.wip_at.is_none());
    assert!(done.last_map_at.is_some());
}

#[tokio::test]
async fn test_claim_failure_on_empty_batch_is_an_error() {
    let (_db, repo) = work_item_repo().await;
    visited_items(&repo, &["http://x/1"]).await;

    let flaky = Arc::new(FlakyClaims {
        inner: repo.clone(),
        claims: AtomicUsize::new(0),
        fail_on: 1,
    });
    let queue = DatabaseWorkQueue::new(flaky, Duration::hours(240));

    assert!(queue.claim_mappable_batch(3).await.is_err());
    let item = repo.claim_next_mappable().await.unwrap();
    assert!(item.is_some());
}
