// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::package::PackageDescription;
use crate::domain::models::work_item::{ChildUri, WorkItem};
use crate::engines::traits::FetchError;
use crate::routing::router::{Handler, Router, RoutingError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;

/// 访问错误类型
#[derive(Error, Debug)]
pub enum VisitError {
    /// 路由错误
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// 抓取失败（传输、超时、非2xx）
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// 内容解析失败
    #[error("Parse error: {0}")]
    Parse(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 映射错误类型
#[derive(Error, Debug)]
pub enum MapError {
    /// 路由错误
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// 数据格式错误
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 访问结果
///
/// 访问器可以在返回子URI和数据的同时报告一个非致命错误。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitOutcome {
    /// 发现的子URI
    pub children: Vec<ChildUri>,
    /// 抓取到的数据
    pub payload: Option<String>,
    /// 非致命错误
    pub error: Option<String>,
}

impl VisitOutcome {
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
            ..Default::default()
        }
    }

    pub fn with_children(children: Vec<ChildUri>) -> Self {
        Self {
            children,
            ..Default::default()
        }
    }
}

/// 访问器接口
///
/// 实现类型需要提供无参构造（`Default`），路由器在每次调用时构造新实例。
#[async_trait]
pub trait Visitor: Send {
    async fn visit(&mut self, uri: &str) -> Result<VisitOutcome, VisitError>;
}

/// 映射器接口
///
/// 返回的包描述在写入前会被完整收集，避免批次只被部分应用。
#[async_trait]
pub trait Mapper: Send {
    async fn map(
        &mut self,
        uri: &str,
        item: &WorkItem,
    ) -> Result<Vec<PackageDescription>, MapError>;
}

pub type VisitFuture = BoxFuture<'static, Result<VisitOutcome, VisitError>>;
pub type MapFuture = BoxFuture<'static, Result<Vec<PackageDescription>, MapError>>;

/// 函数形式的访问器
struct FnVisitor<F>(Arc<F>);

#[async_trait]
impl<F> Visitor for FnVisitor<F>
where
    F: Fn(String) -> VisitFuture + Send + Sync + 'static,
{
    async fn visit(&mut self, uri: &str) -> Result<VisitOutcome, VisitError> {
        (self.0)(uri.to_string()).await
    }
}

/// 函数形式的映射器
struct FnMapper<F>(Arc<F>);

#[async_trait]
impl<F> Mapper for FnMapper<F>
where
    F: Fn(String, WorkItem) -> MapFuture + Send + Sync + 'static,
{
    async fn map(
        &mut self,
        uri: &str,
        item: &WorkItem,
    ) -> Result<Vec<PackageDescription>, MapError> {
        (self.0)(uri.to_string(), item.clone()).await
    }
}

impl Handler<dyn Visitor> {
    /// 以普通函数注册访问器，函数被直接调用
    pub fn function<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(String) -> VisitFuture + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Handler::from_factory(name, move || Box::new(FnVisitor(f.clone())) as Box<dyn Visitor>)
    }

    /// 以有状态类型注册访问器，每次调用构造新实例
    pub fn stateful<V>() -> Self
    where
        V: Visitor + Default + 'static,
    {
        Handler::from_factory(std::any::type_name::<V>(), || {
            Box::new(V::default()) as Box<dyn Visitor>
        })
    }
}

impl Handler<dyn Mapper> {
    /// 以普通函数注册映射器
    pub fn function<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(String, WorkItem) -> MapFuture + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Handler::from_factory(name, move || Box::new(FnMapper(f.clone())) as Box<dyn Mapper>)
    }

    /// 以有状态类型注册映射器，每次调用构造新实例
    pub fn stateful<M>() -> Self
    where
        M: Mapper + Default + 'static,
    {
        Handler::from_factory(std::any::type_name::<M>(), || {
            Box::new(M::default()) as Box<dyn Mapper>
        })
    }
}

pub type VisitRouter = Router<dyn Visitor>;
pub type MapRouter = Router<dyn Mapper>;
pub type VisitHandler = Handler<dyn Visitor>;
pub type MapHandler = Handler<dyn Mapper>;

impl Router<dyn Visitor> {
    /// 解析并调用访问器
    pub async fn process(&self, uri: &str) -> Result<VisitOutcome, VisitError> {
        let mut visitor = self.handler_for(uri)?;
        visitor.visit(uri).await
    }
}

impl Router<dyn Mapper> {
    /// 解析并调用映射器
    pub async fn process(
        &self,
        uri: &str,
        item: &WorkItem,
    ) -> Result<Vec<PackageDescription>, MapError> {
        let mut mapper = self.handler_for(uri)?;
        mapper.map(uri, item).await
    }
}
