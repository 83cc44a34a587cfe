// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::VisitSettings;
use crate::engines::reqwest_engine::DEFAULT_USER_AGENT;
use crate::routing::{RouteTable, RoutingError};
use std::time::Duration;

/// 内置采集器模块
///
/// 每个采集器提供一组访问器和映射器，并在这里注册到路由表
pub mod npm;

/// 采集器共享的抓取参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub user_agent: String,
    /// 单次抓取超时
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&VisitSettings> for FetchConfig {
    fn from(settings: &VisitSettings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            timeout: settings.fetch_timeout(),
        }
    }
}

/// 注册所有内置采集器
///
/// # 参数
///
/// * `routes` - 路由表
/// * `fetch` - 访问器使用的抓取参数
///
/// # 返回值
///
/// * `Ok(())` - 注册成功
/// * `Err(RoutingError)` - 模式冲突或无法编译
pub fn register_all(routes: &mut RouteTable, fetch: &FetchConfig) -> Result<(), RoutingError> {
    npm::register(routes, fetch)?;
    Ok(())
}
