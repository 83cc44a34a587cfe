// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::setup_db;
use harvestrs::collectors::FetchConfig;
use harvestrs::domain::models::work_item::WorkItem;
use harvestrs::domain::repositories::work_item_repository::WorkItemRepository;
use harvestrs::infrastructure::repositories::work_item_repo_impl::WorkItemRepositoryImpl;
use harvestrs::routing::{default_routes, RoutingError, VisitHandler, VisitOutcome};
use std::sync::Arc;

#[tokio::test]
async fn test_default_routes_cover_npm_packuments() {
    let routes = default_routes(&FetchConfig::default()).unwrap();
    assert!(routes.visit.is_routable("https://registry.npmjs.org/left-pad"));
    assert!(routes.map.is_routable("https://registry.npmjs.org/@babel%2fcore"));
    assert!(!routes.visit.is_routable("https://example.com/left-pad"));
    assert!(!routes
        .visit
        .is_routable("https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz"));
}

#[tokio::test]
async fn test_seeded_items_get_flags_from_default_routes() {
    let db = setup_db().await;
    let repo = WorkItemRepositoryImpl::new(db, Arc::new(default_routes(&FetchConfig::default()).unwrap()));

    let npm = repo
        .insert(&WorkItem::new("https://registry.npmjs.org/left-pad"))
        .await
        .unwrap();
    assert!(npm.is_visitable);
    assert!(npm.is_mappable);

    let unknown = repo
        .insert(&WorkItem::new("https://example.com/"))
        .await
        .unwrap();
    assert!(!unknown.is_visitable);
    assert!(!unknown.is_mappable);
}

#[tokio::test]
async fn test_overlapping_routes_are_ambiguous() {
    let mut routes = default_routes(&FetchConfig::default()).unwrap();
    let result = routes.visit.register(
        [r"https?://registry\.npmjs\.org/left-pad"],
        VisitHandler::function("shadow", |_uri| {
            Box::pin(async move { Ok(VisitOutcome::default()) })
        }),
    );
    assert!(result.is_ok());
    assert!(matches!(
        routes.visit.resolve("https://registry.npmjs.org/left-pad"),
        Err(RoutingError::MultipleRoutesDefined { .. })
    ));
}
