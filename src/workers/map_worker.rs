// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::package::{Package, PackageDescription};
use crate::domain::models::work_item::WorkItem;
use crate::domain::repositories::package_repository::PackageRepository;
use crate::domain::repositories::RepositoryError;
use crate::domain::services::license::LicenseNormalizer;
use crate::domain::services::merge_policy::{self, MergeError};
use crate::queue::work_queue::WorkQueue;
use crate::routing::{MapError, RouteTable, RoutingError};
use crate::utils::errors::{describe_error, join_errors, WorkerError};
use crate::utils::shutdown::StopSignal;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use metrics::counter;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// 单个包描述的存储错误
///
/// 只影响当前包描述，批次中的其他描述和其他工作项继续处理。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 缺少下载地址，无法确定包身份
    #[error("Package {0} has no download URL")]
    MissingIdentity(String),

    /// 缺少类型或名称
    #[error("Malformed package description: {0}")]
    Malformed(String),

    /// 合并时校验和不一致
    #[error("Integrity error for {url}: {source}")]
    Integrity {
        url: String,
        #[source]
        source: MergeError,
    },

    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// 存储结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
    Created,
    Updated,
}

/// 映射工作器选项
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// 队列为空时退出
    pub exit_on_empty: bool,
    /// 每轮认领的数量
    pub batch_size: usize,
    /// 队列为空时的休眠时间
    pub idle_sleep: Duration,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            exit_on_empty: false,
            batch_size: 10,
            idle_sleep: Duration::from_secs(10),
        }
    }
}

/// 映射统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapStats {
    pub mapped: usize,
    pub errors: usize,
    pub created: usize,
    pub updated: usize,
    pub unrouted: usize,
}

impl fmt::Display for MapStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Mapped {} URIs ({} with errors), created {} packages, updated {} packages, skipped {} unrouted",
            self.mapped, self.errors, self.created, self.updated, self.unrouted
        )
    }
}

/// 映射工作器
///
/// 批量认领已访问的工作项，调用映射器得到包描述，然后新建包或按合并策略更新已有包。
pub struct MapWorker<Q: WorkQueue + ?Sized, P: PackageRepository + ?Sized> {
    queue: Arc<Q>,
    packages: Arc<P>,
    routes: Arc<RouteTable>,
    license: Arc<dyn LicenseNormalizer>,
    options: MapOptions,
}

impl<Q, P> MapWorker<Q, P>
where
    Q: WorkQueue + ?Sized,
    P: PackageRepository + ?Sized,
{
    /// 创建新的映射工作器
    ///
    /// # 参数
    ///
    /// * `queue` - 工作项队列
    /// * `packages` - 包仓库
    /// * `routes` - 路由表
    /// * `license` - 许可证规范化器
    /// * `options` - 运行选项
    pub fn new(
        queue: Arc<Q>,
        packages: Arc<P>,
        routes: Arc<RouteTable>,
        license: Arc<dyn LicenseNormalizer>,
        options: MapOptions,
    ) -> Self {
        Self {
            queue,
            packages,
            routes,
            license,
            options,
        }
    }

    /// 处理一批工作项
    ///
    /// # 返回值
    ///
    /// 本批认领到的工作项数量
    pub async fn map_batch(&self, stats: &mut MapStats) -> Result<usize, WorkerError> {
        let batch = self.queue.claim_mappable_batch(self.options.batch_size).await?;
        let claimed = batch.len();
        for item in batch {
            if let Err(e) = self.map_item(item, stats).await {
                error!("Error processing map: {}", e);
            }
        }
        Ok(claimed)
    }

    #[instrument(skip(self, item, stats), fields(id = %item.id, uri = %item.uri))]
    async fn map_item(&self, item: WorkItem, stats: &mut MapStats) -> Result<(), WorkerError> {
        counter!("map_items_total").increment(1);

        let descriptions = match self.routes.map.process(&item.uri, &item).await {
            Ok(descriptions) => descriptions,
            Err(MapError::Routing(RoutingError::NoRouteAvailable(_))) => {
                warn!("No map route available, releasing item");
                stats.unrouted += 1;
                self.queue.release(item.id).await?;
                return Ok(());
            }
            Err(e) => {
                error!("Mapper failed: {}", e);
                stats.mapped += 1;
                stats.errors += 1;
                counter!("map_errors_total").increment(1);
                self.queue
                    .complete_map(item.id, join_errors(&[describe_error(&e)]))
                    .await?;
                return Ok(());
            }
        };

        let mut errors = Vec::new();
        for description in descriptions {
            match self.store_package(&item, description).await {
                Ok(Stored::Created) => stats.created += 1,
                Ok(Stored::Updated) => stats.updated += 1,
                Err(e) => {
                    warn!("Failed to store package: {}", e);
                    errors.push(describe_error(&e));
                }
            }
        }

        let map_error = join_errors(&errors);
        if map_error.is_some() {
            stats.errors += 1;
            counter!("map_errors_total").increment(1);
        }
        self.queue.complete_map(item.id, map_error).await?;
        stats.mapped += 1;
        Ok(())
    }

    /// 新建或合并一个包描述
    pub async fn store_package(
        &self,
        item: &WorkItem,
        mut description: PackageDescription,
    ) -> Result<Stored, StoreError> {
        if description.package_type.trim().is_empty() || description.name.trim().is_empty() {
            return Err(StoreError::Malformed(format!(
                "missing type or name in description from {}",
                item.uri
            )));
        }
        let identity = description
            .identity()
            .map(str::to_string)
            .ok_or_else(|| StoreError::MissingIdentity(description.purl()))?;

        self.normalize_license(&mut description);
        let level = item.mining_level;

        match self.packages.find_by_download_url(&identity).await? {
            None => {
                let mut package = Package::from_description(&identity, &description, level);
                package.append_history(format!(
                    "Created from {} at mining level {}",
                    item.uri, level
                ));
                self.packages
                    .create_with_scan_request(&package, item.priority)
                    .await?;
                counter!("packages_created_total").increment(1);
                debug!(purl = %package.purl(), "Package created");
                Ok(Stored::Created)
            }
            Some(existing) => {
                let outcome = merge_policy::merge(&existing, &description, level).map_err(
                    |source| StoreError::Integrity {
                        url: identity.clone(),
                        source,
                    },
                )?;
                let mut package = outcome.package.clone();
                package.append_history(outcome.history_message(level));
                self.packages
                    .apply_merge(&package, outcome.parties, outcome.dependencies)
                    .await?;
                counter!("packages_updated_total").increment(1);
                debug!(purl = %package.purl(), branch = %outcome.branch, "Package merged");
                Ok(Stored::Updated)
            }
        }
    }

    fn normalize_license(&self, description: &mut PackageDescription) {
        let has_expression = description
            .declared_license_expression
            .as_deref()
            .is_some_and(|e| !e.trim().is_empty());
        if has_expression {
            return;
        }
        if let Some(statement) = description.extracted_license_statement.as_deref() {
            description.declared_license_expression = self.license.normalize(statement);
        }
    }
}

#[async_trait]
impl<Q, P> Worker for MapWorker<Q, P>
where
    Q: WorkQueue + ?Sized + 'static,
    P: PackageRepository + ?Sized + 'static,
{
    type Stats = MapStats;

    async fn run(&self, stop: StopSignal) -> Result<MapStats, WorkerError> {
        info!("Map worker started");
        let mut stats = MapStats::default();
        let mut idle = false;

        loop {
            if stop.is_stopped() {
                info!("Stop requested, map worker exiting");
                break;
            }

            let claimed = match self.map_batch(&mut stats).await {
                Ok(claimed) => claimed,
                Err(e) => {
                    error!("Failed to claim mappable items: {}", e);
                    if stop.sleep(self.options.idle_sleep).await {
                        break;
                    }
                    continue;
                }
            };

            if claimed > 0 {
                idle = false;
                continue;
            }
            if self.options.exit_on_empty {
                info!("No more mappable URIs, exiting");
                break;
            }
            if !idle {
                info!("Map queue is empty, waiting for new URIs");
                idle = true;
            }
            if stop.sleep(self.options.idle_sleep).await {
                break;
            }
        }

        info!("{}", stats);
        Ok(stats)
    }

    fn name(&self) -> &str {
        "map"
    }
}

#[cfg(test)]
#[path = "map_worker_test.rs"]
mod tests;
