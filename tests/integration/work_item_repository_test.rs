// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{routes, setup_db, work_item_repo};
use chrono::{Duration, Utc};
use harvestrs::domain::models::work_item::WorkItem;
use harvestrs::domain::repositories::work_item_repository::{VisitCompletion, WorkItemRepository};
use harvestrs::infrastructure::repositories::work_item_repo_impl::WorkItemRepositoryImpl;
use std::collections::HashSet;
use std::sync::Arc;

fn far_future() -> chrono::DateTime<chrono::FixedOffset> {
    (Utc::now() + Duration::days(365)).into()
}

/// 多个工作器并发认领时，每一项只会被认领一次
#[tokio::test]
async fn test_concurrent_claims_are_distinct() {
    let (_db, repo) = work_item_repo().await;
    for i in 0..5 {
        repo.insert(&WorkItem::new(format!("http://x/{}", i)))
            .await
            .unwrap();
    }

    let claims = (0..8).map(|_| {
        let repo = repo.clone();
        tokio::spawn(async move { repo.claim_next_visitable(Utc::now().into()).await })
    });
    let results = futures::future::join_all(claims).await;

    let claimed: Vec<_> = results
        .into_iter()
        .filter_map(|r| r.unwrap().unwrap())
        .collect();
    assert_eq!(claimed.len(), 5);
    let ids: HashSet<_> = claimed.iter().map(|item| item.id).collect();
    assert_eq!(ids.len(), 5);
    assert!(claimed.iter().all(|item| item.wip_at.is_some()));
}

#[tokio::test]
async fn test_claim_order_is_priority_then_uri() {
    let (_db, repo) = work_item_repo().await;
    repo.insert(&WorkItem::new("http://x/a")).await.unwrap();
    repo.insert(&WorkItem::new("http://x/b")).await.unwrap();
    repo.insert(&WorkItem::new("http://x/low").with_priority(-1))
        .await
        .unwrap();
    repo.insert(&WorkItem::new("http://x/high").with_priority(10))
        .await
        .unwrap();

    let mut order = Vec::new();
    while let Some(item) = repo.claim_next_visitable(Utc::now().into()).await.unwrap() {
        order.push(item.uri);
    }
    assert_eq!(
        order,
        ["http://x/high", "http://x/b", "http://x/a", "http://x/low"]
    );
}

#[tokio::test]
async fn test_revisit_window() {
    let db = setup_db().await;
    // Visitable but not mappable, so revisits are not held back by mapping
    let repo = WorkItemRepositoryImpl::new(db, routes(r"http://x/", r"http://nomatch/"));
    let item = repo.insert(&WorkItem::new("http://x/page")).await.unwrap();

    let claimed = repo.claim_next_visitable(Utc::now().into()).await.unwrap();
    assert_eq!(claimed.map(|i| i.id), Some(item.id));
    repo.finish_visit(item.id, VisitCompletion::default())
        .await
        .unwrap();

    let window_start = (Utc::now() - Duration::hours(240)).into();
    assert!(repo.claim_next_visitable(window_start).await.unwrap().is_none());

    let revisited = repo.claim_next_visitable(far_future()).await.unwrap();
    assert_eq!(revisited.map(|i| i.id), Some(item.id));
}

#[tokio::test]
async fn test_revisit_window_boundary_is_inclusive() {
    let db = setup_db().await;
    let repo = WorkItemRepositoryImpl::new(db, routes(r"http://x/", r"http://nomatch/"));
    let item = repo.insert(&WorkItem::new("http://x/edge")).await.unwrap();

    repo.claim_next_visitable(Utc::now().into()).await.unwrap();
    repo.finish_visit(item.id, VisitCompletion::default())
        .await
        .unwrap();
    let visited_at = repo
        .find_by_id(item.id)
        .await
        .unwrap()
        .unwrap()
        .last_visit_at
        .unwrap();

    assert!(repo
        .claim_next_visitable(visited_at - Duration::seconds(1))
        .await
        .unwrap()
        .is_none());
    let revisited = repo.claim_next_visitable(visited_at).await.unwrap();
    assert_eq!(revisited.map(|i| i.id), Some(item.id));
}

#[tokio::test]
async fn test_unmapped_items_are_not_revisited() {
    let (_db, repo) = work_item_repo().await;
    let item = repo.insert(&WorkItem::new("http://x/pkg")).await.unwrap();
    repo.claim_next_visitable(Utc::now().into()).await.unwrap();
    repo.finish_visit(item.id, VisitCompletion::default())
        .await
        .unwrap();

    assert!(repo
        .claim_next_visitable(far_future())
        .await
        .unwrap()
        .is_none());

    let mapped = repo.claim_next_mappable().await.unwrap().unwrap();
    assert_eq!(mapped.id, item.id);
    repo.finish_map(item.id, None).await.unwrap();

    let revisited = repo.claim_next_visitable(far_future()).await.unwrap();
    assert_eq!(revisited.map(|i| i.id), Some(item.id));
}

#[tokio::test]
async fn test_failed_visits_are_never_mapped() {
    let (_db, repo) = work_item_repo().await;
    let item = repo.insert(&WorkItem::new("http://x/broken")).await.unwrap();
    repo.claim_next_visitable(Utc::now().into()).await.unwrap();
    repo.finish_visit(
        item.id,
        VisitCompletion {
            data: None,
            visit_error: Some("HTTP 500".to_string()),
        },
    )
    .await
    .unwrap();

    assert!(repo.claim_next_mappable().await.unwrap().is_none());
}

#[tokio::test]
async fn test_finish_visit_keeps_previous_data() {
    let (_db, repo) = work_item_repo().await;
    let item = repo.insert(&WorkItem::new("http://x/data")).await.unwrap();
    repo.finish_visit(
        item.id,
        VisitCompletion {
            data: Some("first".to_string()),
            visit_error: None,
        },
    )
    .await
    .unwrap();
    let item = repo
        .finish_visit(item.id, VisitCompletion::default())
        .await
        .unwrap();
    assert_eq!(item.data.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_reset_map_makes_item_mappable_again() {
    let (_db, repo) = work_item_repo().await;
    let item = repo.insert(&WorkItem::new("http://x/remap")).await.unwrap();
    repo.finish_visit(item.id, VisitCompletion::default())
        .await
        .unwrap();
    repo.finish_map(item.id, Some("mapper crashed".to_string()))
        .await
        .unwrap();
    assert!(repo.claim_next_mappable().await.unwrap().is_none());

    repo.reset_map(item.id).await.unwrap();
    let claimed = repo.claim_next_mappable().await.unwrap().unwrap();
    assert_eq!(claimed.id, item.id);
    assert!(claimed.map_error.is_none());
}

#[tokio::test]
async fn test_refresh_routability_after_route_change() {
    let db = setup_db().await;
    let before = WorkItemRepositoryImpl::new(db.clone(), routes(r"http://old/", r"http://old/"));
    before
        .insert(&WorkItem::new("http://new/page"))
        .await
        .unwrap();
    before
        .insert(&WorkItem::new("http://old/page"))
        .await
        .unwrap();
    assert!(before
        .claim_next_visitable(Utc::now().into())
        .await
        .unwrap()
        .is_some_and(|item| item.uri == "http://old/page"));

    let after = Arc::new(WorkItemRepositoryImpl::new(
        db,
        routes(r"http://new/", r"http://nomatch/"),
    ));
    // The claimed item is skipped while in progress
    assert_eq!(after.refresh_routability().await.unwrap(), 1);

    let page = &after.find_by_uri("http://new/page").await.unwrap()[0];
    assert!(page.is_visitable);
    assert!(!page.is_mappable);

    let claimed = after.claim_next_visitable(Utc::now().into()).await.unwrap();
    assert_eq!(claimed.map(|i| i.uri), Some("http://new/page".to_string()));
}

#[tokio::test]
async fn test_routing_flags_follow_route_table() {
    let db = setup_db().await;
    let repo = WorkItemRepositoryImpl::new(db, routes(r"http://x/visit", r"http://x/map"));
    let visit = repo.insert(&WorkItem::new("http://x/visit")).await.unwrap();
    let map = repo.insert(&WorkItem::new("http://x/map")).await.unwrap();
    let neither = repo.insert(&WorkItem::new("http://y/")).await.unwrap();

    assert!(visit.is_visitable && !visit.is_mappable);
    assert!(!map.is_visitable && map.is_mappable);
    assert!(!neither.is_visitable && !neither.is_mappable);
}
