// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 路由模块
///
/// 将URI按模式分派到唯一的访问器或映射器
pub mod registry;
pub mod router;
pub mod traits;

pub use registry::{default_routes, RouteTable};
pub use router::{Handler, Router, RoutingError};
pub use traits::{
    MapError, MapHandler, MapRouter, Mapper, VisitError, VisitHandler, VisitOutcome, VisitRouter,
    Visitor,
};
