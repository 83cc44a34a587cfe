// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use harvestrs::infrastructure::repositories::work_item_repo_impl::WorkItemRepositoryImpl;
use harvestrs::routing::traits::{MapFuture, VisitFuture};
use harvestrs::routing::{MapHandler, RouteTable, VisitHandler, VisitOutcome};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;

/// 创建已迁移的内存数据库
///
/// 单连接池保证所有操作落在同一个内存库上
pub async fn setup_db() -> Arc<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);
    let db = Arc::new(Database::connect(opt).await.unwrap());
    Migrator::up(db.as_ref(), None).await.unwrap();
    db
}

fn noop_visit(_uri: String) -> VisitFuture {
    Box::pin(async move { Ok(VisitOutcome::default()) })
}

fn noop_map(_uri: String, _item: harvestrs::domain::models::work_item::WorkItem) -> MapFuture {
    Box::pin(async move { Ok(Vec::new()) })
}

/// 对 `visit_pattern` 注册访问路由、对 `map_pattern` 注册映射路由的路由表
pub fn routes(visit_pattern: &str, map_pattern: &str) -> Arc<RouteTable> {
    let mut routes = RouteTable::new();
    routes
        .visit
        .register([visit_pattern], VisitHandler::function("noop_visitor", noop_visit))
        .unwrap();
    routes
        .map
        .register([map_pattern], MapHandler::function("noop_mapper", noop_map))
        .unwrap();
    Arc::new(routes)
}

/// 所有 `http://x/` URI 可访问且可映射的工作项仓库
pub async fn work_item_repo() -> (Arc<DatabaseConnection>, Arc<WorkItemRepositoryImpl>) {
    let db = setup_db().await;
    let repo = Arc::new(WorkItemRepositoryImpl::new(
        db.clone(),
        routes(r"http://x/", r"http://x/"),
    ));
    (db, repo)
}
