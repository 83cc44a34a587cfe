// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::collectors::{self, FetchConfig};
use crate::domain::models::work_item::WorkItem;
use crate::routing::router::RoutingError;
use crate::routing::traits::{MapRouter, VisitRouter};
use tracing::info;

/// 路由表
///
/// 访问路由和映射路由在启动时一次性构建，之后只读共享。
#[derive(Debug, Default)]
pub struct RouteTable {
    pub visit: VisitRouter,
    pub map: MapRouter,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按当前路由重新计算工作项的可访问/可映射标记
    pub fn apply_flags(&self, item: &mut WorkItem) {
        item.is_visitable = self.visit.is_routable(&item.uri);
        item.is_mappable = self.map.is_routable(&item.uri);
    }
}

/// 构建包含所有内置采集器的路由表
///
/// # 参数
///
/// * `fetch` - 采集器抓取时使用的 User-Agent 和超时
///
/// # 返回值
///
/// * `Ok(RouteTable)` - 路由表
/// * `Err(RoutingError)` - 注册冲突，属于启动期致命错误
pub fn default_routes(fetch: &FetchConfig) -> Result<RouteTable, RoutingError> {
    let mut routes = RouteTable::new();
    collectors::register_all(&mut routes, fetch)?;
    info!(
        visit_routes = routes.visit.len(),
        map_routes = routes.map.len(),
        "Route table initialized"
    );
    Ok(routes)
}
