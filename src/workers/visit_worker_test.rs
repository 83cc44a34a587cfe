// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::domain::models::work_item::ChildUri;
use crate::domain::repositories::work_item_repository::WorkItemRepository;
use crate::infrastructure::repositories::work_item_repo_impl::WorkItemRepositoryImpl;
use crate::queue::work_queue::DatabaseWorkQueue;
use crate::routing::traits::VisitFuture;
use crate::routing::VisitHandler;
use crate::utils::robots::RobotsPolicy;
use crate::utils::throttle::HostThrottle;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::atomic::{AtomicUsize, Ordering};

type Queue = DatabaseWorkQueue<WorkItemRepositoryImpl>;

async fn setup_db() -> Arc<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);
    let db = Arc::new(Database::connect(opt).await.unwrap());
    Migrator::up(db.as_ref(), None).await.unwrap();
    db
}

struct StaticRobots {
    disallow: bool,
}

#[async_trait]
impl RobotsPolicy for StaticRobots {
    async fn disallowed(&self, _url: &str, _agent: &str) -> anyhow::Result<bool> {
        Ok(self.disallow)
    }

    async fn delay(&self, _url: &str, _agent: &str) -> anyhow::Result<Option<Duration>> {
        Ok(None)
    }
}

fn politeness(disallow: bool) -> PolitenessController {
    PolitenessController::new(
        Arc::new(StaticRobots { disallow }),
        HostThrottle::new(),
        "harvestrs-test",
        Duration::ZERO,
    )
}

fn routes_with<F>(pattern: &str, handler: F) -> Arc<RouteTable>
where
    F: Fn(String) -> VisitFuture + Send + Sync + 'static,
{
    let mut routes = RouteTable::new();
    routes
        .visit
        .register([pattern], VisitHandler::function("test_visitor", handler))
        .unwrap();
    Arc::new(routes)
}

struct Harness {
    repo: Arc<WorkItemRepositoryImpl>,
    worker: VisitWorker<Queue>,
}

async fn harness(routes: Arc<RouteTable>, disallow: bool, options: VisitOptions) -> Harness {
    let db = setup_db().await;
    let repo = Arc::new(WorkItemRepositoryImpl::new(db, routes.clone()));
    let queue = Arc::new(DatabaseWorkQueue::new(repo.clone(), chrono::Duration::hours(240)));
    let worker = VisitWorker::new(queue, routes, politeness(disallow), options);
    Harness { repo, worker }
}

fn single_loop() -> VisitOptions {
    VisitOptions {
        exit_on_empty: true,
        max_loops: Some(1),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_pre_visited_child_is_stored_with_payload() {
    let routes = routes_with(r"http://x/a$", |uri| {
        Box::pin(async move {
            Ok(VisitOutcome::with_children(vec![ChildUri::visited(
                "http://x/b",
                Some("P".to_string()),
            )
            .with_source(uri)]))
        })
    });
    let h = harness(routes, false, single_loop()).await;
    h.repo.insert(&WorkItem::new("http://x/a")).await.unwrap();

    let stats = h.worker.run(StopSignal::new()).await.unwrap();
    assert_eq!(stats.visited, 1);
    assert_eq!(stats.children, 1);
    assert_eq!(h.repo.count().await.unwrap(), 2);

    let a = &h.repo.find_by_uri("http://x/a").await.unwrap()[0];
    assert!(a.last_visit_at.is_some());
    assert!(a.visit_error.is_none());
    assert!(a.wip_at.is_none());

    let b = &h.repo.find_by_uri("http://x/b").await.unwrap()[0];
    assert!(b.last_visit_at.is_some());
    assert_eq!(b.data.as_deref(), Some("P"));
    assert_eq!(b.source_uri.as_deref(), Some("http://x/a"));
}

#[tokio::test]
async fn test_children_skipped_after_too_many_insert_errors() {
    // Pre-visited children share (uri, visit time), so every insert after the first fails
    let routes = routes_with(r"http://x/a$", |_uri| {
        Box::pin(async move {
            let children = (0..MAX_CHILD_ERRORS + 5)
                .map(|i| ChildUri::visited("http://x/dup", Some(i.to_string())))
                .collect();
            Ok(VisitOutcome::with_children(children))
        })
    });
    let h = harness(routes, false, single_loop()).await;
    h.repo.insert(&WorkItem::new("http://x/a")).await.unwrap();

    let stats = h.worker.run(StopSignal::new()).await.unwrap();
    assert_eq!(stats.visited, 1);
    assert_eq!(stats.children, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(h.repo.count().await.unwrap(), 2);

    let a = &h.repo.find_by_uri("http://x/a").await.unwrap()[0];
    let error = a.visit_error.as_deref().unwrap();
    assert_eq!(
        error.matches("Failed to insert child").count(),
        MAX_CHILD_ERRORS + 1
    );
    assert!(a.wip_at.is_none());
}

#[tokio::test]
async fn test_stop_while_throttled_releases_item_unvisited() {
    let routes = routes_with(r"http://x/", |_uri| {
        Box::pin(async move { Ok(VisitOutcome::with_payload("fetched".to_string())) })
    });
    let db = setup_db().await;
    let repo = Arc::new(WorkItemRepositoryImpl::new(db, routes.clone()));
    let queue = Arc::new(DatabaseWorkQueue::new(repo.clone(), chrono::Duration::hours(240)));

    let throttle = HostThrottle::new();
    throttle.record("x", std::time::Instant::now());
    let politeness = PolitenessController::new(
        Arc::new(StaticRobots { disallow: false }),
        throttle,
        "harvestrs-test",
        Duration::from_secs(60),
    );
    let worker = VisitWorker::new(queue, routes, politeness, single_loop());
    let item = repo.insert(&WorkItem::new("http://x/a")).await.unwrap();

    let stop = StopSignal::new();
    let trigger = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.stop();
    });

    let stats = tokio::time::timeout(Duration::from_secs(10), worker.run(stop))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stats.visited, 0);

    let item = repo.find_by_id(item.id).await.unwrap().unwrap();
    assert!(item.wip_at.is_none());
    assert!(item.last_visit_at.is_none());
    assert!(item.data.is_none());
}

#[tokio::test]
async fn test_idle_worker_prunes_stale_hosts() {
    let routes = routes_with(r"http://x/", |_uri| {
        Box::pin(async move { Ok(VisitOutcome::default()) })
    });
    let db = setup_db().await;
    let repo = Arc::new(WorkItemRepositoryImpl::new(db, routes.clone()));
    let queue = Arc::new(DatabaseWorkQueue::new(repo, chrono::Duration::hours(240)));

    let throttle = HostThrottle::new();
    throttle.record("stale.org", std::time::Instant::now());
    let politeness = PolitenessController::new(
        Arc::new(StaticRobots { disallow: false }),
        throttle.clone(),
        "harvestrs-test",
        Duration::ZERO,
    )
    .with_host_retention(Duration::ZERO);
    let worker = VisitWorker::new(
        queue,
        routes,
        politeness,
        VisitOptions {
            max_loops: Some(1),
            idle_sleep: Duration::from_millis(1),
            ..Default::default()
        },
    );

    worker.run(StopSignal::new()).await.unwrap();
    assert!(throttle.is_empty());
}

#[tokio::test]
async fn test_unvisited_child_is_queued_once() {
    let routes = routes_with(r"http://x/", |_uri| {
        Box::pin(async move {
            Ok(VisitOutcome::with_children(vec![
                ChildUri::new("http://x/c"),
                ChildUri::new("http://x/c"),
            ]))
        })
    });
    let h = harness(routes, false, single_loop()).await;
    h.repo.insert(&WorkItem::new("http://x/a")).await.unwrap();

    let stats = h.worker.run(StopSignal::new()).await.unwrap();
    assert_eq!(stats.children, 1);
    assert_eq!(stats.duplicates, 1);

    let c = h.repo.find_by_uri("http://x/c").await.unwrap();
    assert_eq!(c.len(), 1);
    assert!(c[0].last_visit_at.is_none());
    assert!(c[0].is_visitable);
}

#[tokio::test]
async fn test_visitor_failure_is_recorded_and_loop_continues() {
    let routes = routes_with(r"http://x/", |uri| {
        Box::pin(async move {
            if uri.ends_with("/bad") {
                Err(VisitError::Parse("unexpected token".to_string()))
            } else {
                Ok(VisitOutcome::with_payload("ok"))
            }
        })
    });
    let h = harness(
        routes,
        false,
        VisitOptions {
            exit_on_empty: true,
            ..Default::default()
        },
    )
    .await;
    h.repo
        .insert(&WorkItem::new("http://x/bad").with_priority(10))
        .await
        .unwrap();
    h.repo.insert(&WorkItem::new("http://x/good")).await.unwrap();

    let stats = h.worker.run(StopSignal::new()).await.unwrap();
    assert_eq!(stats.visited, 2);
    assert_eq!(stats.errors, 1);

    let bad = &h.repo.find_by_uri("http://x/bad").await.unwrap()[0];
    assert!(bad.visit_error.as_deref().unwrap().contains("unexpected token"));
    assert!(bad.last_visit_at.is_some());
    assert!(bad.wip_at.is_none());

    let good = &h.repo.find_by_uri("http://x/good").await.unwrap()[0];
    assert_eq!(good.data.as_deref(), Some("ok"));
    assert!(good.visit_error.is_none());
}

#[tokio::test]
async fn test_robots_disallow_skips_fetch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let routes = routes_with(r"http://x/", move |_uri| {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(VisitOutcome::default()) })
    });
    let h = harness(routes, true, single_loop()).await;
    h.repo.insert(&WorkItem::new("http://x/private")).await.unwrap();

    let stats = h.worker.run(StopSignal::new()).await.unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let item = &h.repo.find_by_uri("http://x/private").await.unwrap()[0];
    assert!(item.visit_error.as_deref().unwrap().contains("robots.txt"));
    assert!(item.last_visit_at.is_some());
}

#[tokio::test]
async fn test_unrouted_item_is_released_without_error() {
    let seeding_routes = routes_with(r"http://x/", |_uri| {
        Box::pin(async move { Ok(VisitOutcome::default()) })
    });
    let db = setup_db().await;
    let seeding_repo = WorkItemRepositoryImpl::new(db.clone(), seeding_routes);
    seeding_repo
        .insert(&WorkItem::new("http://x/orphan"))
        .await
        .unwrap();

    // The running worker no longer has the route
    let routes = Arc::new(RouteTable::new());
    let repo = Arc::new(WorkItemRepositoryImpl::new(db, routes.clone()));
    let queue = Arc::new(DatabaseWorkQueue::new(repo.clone(), chrono::Duration::hours(240)));
    let worker = VisitWorker::new(
        queue,
        routes,
        politeness(false),
        VisitOptions {
            exit_on_empty: true,
            ..Default::default()
        },
    );

    let stats = worker.run(StopSignal::new()).await.unwrap();
    assert_eq!(stats.unrouted, 1);
    assert_eq!(stats.visited, 0);

    let item = &repo.find_by_uri("http://x/orphan").await.unwrap()[0];
    assert!(item.wip_at.is_none());
    assert!(item.last_visit_at.is_none());
    assert!(item.visit_error.is_none());
    assert!(!item.is_visitable);
}

#[tokio::test]
async fn test_max_uris_caps_children() {
    let routes = routes_with(r"http://x/a$", |_uri| {
        Box::pin(async move {
            Ok(VisitOutcome::with_children(
                (0..5).map(|i| ChildUri::new(format!("http://y/{}", i))).collect(),
            ))
        })
    });
    let h = harness(
        routes,
        false,
        VisitOptions {
            exit_on_empty: true,
            max_uris: Some(2),
            ..Default::default()
        },
    )
    .await;
    h.repo.insert(&WorkItem::new("http://x/a")).await.unwrap();

    let stats = h.worker.run(StopSignal::new()).await.unwrap();
    assert_eq!(stats.children, 2);
    assert_eq!(h.repo.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_exit_on_empty_and_stop_signal() {
    let routes = Arc::new(RouteTable::new());
    let h = harness(
        routes.clone(),
        false,
        VisitOptions {
            exit_on_empty: true,
            ..Default::default()
        },
    )
    .await;
    let stats = h.worker.run(StopSignal::new()).await.unwrap();
    assert_eq!(stats.loops, 1);
    assert_eq!(stats.visited, 0);

    let h = harness(routes, false, VisitOptions::default()).await;
    let stop = StopSignal::new();
    stop.stop();
    let stats = h.worker.run(stop).await.unwrap();
    assert_eq!(stats.loops, 0);
}
