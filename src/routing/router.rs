// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// 路由错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// 没有任何处理器匹配该URI
    #[error("No route available for: {0}")]
    NoRouteAvailable(String),

    /// 多个不同的处理器匹配该URI，属于配置错误
    #[error("Multiple routes defined for: {uri}: {handlers:?}")]
    MultipleRoutesDefined { uri: String, handlers: Vec<String> },

    /// 注册时模式字符串重复
    #[error("Route already defined for pattern: {0}")]
    RouteAlreadyDefined(String),

    /// 注册时模式无法编译
    #[error("Invalid route pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// 注册时处理器名称已属于另一个处理器
    #[error("Handler name already bound to a different handler: {0}")]
    HandlerNameConflict(String),
}

/// 路由处理器
///
/// 保存一个构造函数而不是实例，每次调用都会构造全新的实例，
/// 因此处理器内部的可变状态不会在调用之间共享。
/// 处理器名称即其身份：同名处理器的多个模式同时匹配不算歧义，
/// 因此一个名称只能绑定到同一个处理器（及其克隆）。
pub struct Handler<T: ?Sized> {
    name: String,
    factory: Arc<dyn Fn() -> Box<T> + Send + Sync>,
}

impl<T: ?Sized> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("name", &self.name).finish()
    }
}

impl<T: ?Sized> Handler<T> {
    /// 使用构造函数创建处理器
    ///
    /// # 参数
    ///
    /// * `name` - 处理器名称
    /// * `factory` - 每次调用时执行的构造函数
    pub fn from_factory<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 是否为同一个处理器或其克隆
    pub fn same_as(&self, other: &Handler<T>) -> bool {
        Arc::ptr_eq(&self.factory, &other.factory)
    }

    /// 构造一个全新的处理器实例
    pub fn instantiate(&self) -> Box<T> {
        (self.factory)()
    }
}

/// 单条路由：模式 + 处理器
struct Route<T: ?Sized> {
    pattern: String,
    matcher: Regex,
    handler: Handler<T>,
}

/// 基于模式匹配的路由器
///
/// 模式按正则表达式编译，并且锚定在URI开头匹配。
pub struct Router<T: ?Sized> {
    routes: Vec<Route<T>>,
}

impl<T: ?Sized> Default for Router<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T: ?Sized> fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| (&r.pattern, r.handler.name())))
            .finish()
    }
}

impl<T: ?Sized> Router<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个或多个模式到同一个处理器
    ///
    /// 注册是原子的：任意一个模式重复或无法编译时，不会注册任何模式。
    ///
    /// # 参数
    ///
    /// * `patterns` - 模式列表
    /// * `handler` - 处理器
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 注册成功
    /// * `Err(RoutingError::RouteAlreadyDefined)` - 模式字符串已注册
    /// * `Err(RoutingError::InvalidPattern)` - 模式无法编译
    /// * `Err(RoutingError::HandlerNameConflict)` - 名称已被另一个处理器使用
    pub fn register<I, S>(&mut self, patterns: I, handler: Handler<T>) -> Result<(), RoutingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pending: Vec<Route<T>> = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let duplicate = self.routes.iter().any(|r| r.pattern == pattern)
                || pending.iter().any(|r| r.pattern == pattern);
            if duplicate {
                return Err(RoutingError::RouteAlreadyDefined(pattern.to_string()));
            }
            let matcher = Regex::new(&format!("^(?:{})", pattern)).map_err(|e| {
                RoutingError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                }
            })?;
            pending.push(Route {
                pattern: pattern.to_string(),
                matcher,
                handler: handler.clone(),
            });
        }
        let conflict = self
            .routes
            .iter()
            .any(|r| r.handler.name() == handler.name() && !r.handler.same_as(&handler));
        if conflict {
            return Err(RoutingError::HandlerNameConflict(handler.name().to_string()));
        }
        self.routes.extend(pending);
        Ok(())
    }

    /// 解析URI对应的唯一处理器
    ///
    /// 收集所有匹配模式的不同处理器：恰好一个时返回它，
    /// 没有时返回 `NoRouteAvailable`，多个时返回 `MultipleRoutesDefined`。
    pub fn resolve(&self, uri: &str) -> Result<&Handler<T>, RoutingError> {
        let mut seen = HashSet::new();
        let mut candidates: Vec<&Handler<T>> = Vec::new();
        for route in self.routes.iter().filter(|r| r.matcher.is_match(uri)) {
            if seen.insert(route.handler.name()) {
                candidates.push(&route.handler);
            }
        }

        match candidates.len() {
            0 => Err(RoutingError::NoRouteAvailable(uri.to_string())),
            1 => Ok(candidates[0]),
            _ => Err(RoutingError::MultipleRoutesDefined {
                uri: uri.to_string(),
                handlers: candidates.iter().map(|h| h.name().to_string()).collect(),
            }),
        }
    }

    /// `resolve` 是否会成功
    pub fn is_routable(&self, uri: &str) -> bool {
        self.resolve(uri).is_ok()
    }

    /// 解析并构造一个全新的处理器实例
    pub fn handler_for(&self, uri: &str) -> Result<Box<T>, RoutingError> {
        self.resolve(uri).map(Handler::instantiate)
    }

    /// 已注册的模式（按注册顺序）
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.pattern.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
