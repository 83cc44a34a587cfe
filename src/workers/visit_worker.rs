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

use crate::domain::models::work_item::WorkItem;
use crate::domain::repositories::work_item_repository::VisitCompletion;
use crate::queue::work_queue::{ChildEnqueue, WorkQueue};
use crate::routing::{RouteTable, RoutingError, VisitError, VisitOutcome};
use crate::utils::errors::{describe_error, join_errors, WorkerError};
use crate::utils::politeness::{Admission, PolitenessController};
use crate::utils::shutdown::StopSignal;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// 单个父URI允许的子URI写入错误数，超过后跳过剩余子URI
pub const MAX_CHILD_ERRORS: usize = 10;

/// 每隔多少次循环清理一次主机限速记录
const HOST_PRUNE_INTERVAL: usize = 1000;

/// 访问工作器选项
#[derive(Debug, Clone)]
pub struct VisitOptions {
    /// 队列为空时退出
    pub exit_on_empty: bool,
    /// 本次运行最多写入的子URI数量
    pub max_uris: Option<usize>,
    /// 最多执行的循环次数
    pub max_loops: Option<usize>,
    /// 队列为空时的休眠时间
    pub idle_sleep: Duration,
}

impl Default for VisitOptions {
    fn default() -> Self {
        Self {
            exit_on_empty: false,
            max_uris: None,
            max_loops: None,
            idle_sleep: Duration::from_secs(10),
        }
    }
}

/// 访问统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitStats {
    /// 完成访问的工作项
    pub visited: usize,
    /// 记录了访问错误的工作项
    pub errors: usize,
    /// 写入的子URI
    pub children: usize,
    /// 因已存在未访问记录而跳过的子URI
    pub duplicates: usize,
    /// 没有访问路由而释放的工作项
    pub unrouted: usize,
    /// 执行的循环次数
    pub loops: usize,
}

impl fmt::Display for VisitStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Visited {} URIs ({} with errors), inserted {} new URIs, skipped {} duplicates and {} unrouted",
            self.visited, self.errors, self.children, self.duplicates, self.unrouted
        )
    }
}

/// 访问工作器
///
/// 循环认领可访问的工作项，经过礼貌检查后调用访问器，写入子URI并完成父工作项。
pub struct VisitWorker<Q: WorkQueue + ?Sized> {
    /// 工作项队列
    queue: Arc<Q>,
    /// 路由表
    routes: Arc<RouteTable>,
    /// 礼貌控制器
    politeness: PolitenessController,
    options: VisitOptions,
}

impl<Q: WorkQueue + ?Sized> VisitWorker<Q> {
    /// 创建新的访问工作器
    ///
    /// # 参数
    ///
    /// * `queue` - 工作项队列
    /// * `routes` - 路由表
    /// * `politeness` - 礼貌控制器
    /// * `options` - 运行选项
    pub fn new(
        queue: Arc<Q>,
        routes: Arc<RouteTable>,
        politeness: PolitenessController,
        options: VisitOptions,
    ) -> Self {
        Self {
            queue,
            routes,
            politeness,
            options,
        }
    }

    fn prune_hosts(&self) {
        let pruned = self.politeness.prune_idle_hosts();
        if pruned > 0 {
            debug!(pruned, "Pruned idle hosts from throttle");
        }
    }

    fn uri_budget_exhausted(&self, stats: &VisitStats) -> bool {
        self.options
            .max_uris
            .is_some_and(|max| stats.children >= max)
    }

    /// 处理一个已认领的工作项
    #[instrument(skip(self, item, stats, stop), fields(id = %item.id, uri = %item.uri))]
    async fn visit_item(
        &self,
        item: WorkItem,
        stats: &mut VisitStats,
        stop: &StopSignal,
    ) -> Result<(), WorkerError> {
        counter!("visit_items_total").increment(1);

        match self.politeness.admit(&item.uri, stop).await {
            Admission::Allowed => {}
            Admission::Interrupted => {
                info!("Stop requested before fetch, releasing item");
                self.queue.release(item.id).await?;
                return Ok(());
            }
            Admission::Disallowed => {
                warn!("Visit disallowed by robots.txt");
                stats.visited += 1;
                stats.errors += 1;
                counter!("visit_errors_total").increment(1);
                self.queue
                    .complete_visit(
                        item.id,
                        VisitCompletion {
                            data: None,
                            visit_error: Some(format!(
                                "Visit of {} disallowed by robots.txt",
                                item.uri
                            )),
                        },
                    )
                    .await?;
                return Ok(());
            }
        }

        let outcome = match self.routes.visit.process(&item.uri).await {
            Ok(outcome) => outcome,
            Err(VisitError::Routing(RoutingError::NoRouteAvailable(_))) => {
                warn!("No visit route available, releasing item");
                stats.unrouted += 1;
                self.queue.release(item.id).await?;
                return Ok(());
            }
            Err(e) => {
                error!("Visitor failed: {}", e);
                VisitOutcome {
                    error: Some(describe_error(&e)),
                    ..Default::default()
                }
            }
        };

        let mut errors: Vec<String> = outcome.error.into_iter().collect();
        let mut child_errors = 0;
        let now = Utc::now().into();

        for child in &outcome.children {
            if child_errors > MAX_CHILD_ERRORS {
                warn!(
                    errors = child_errors,
                    "Too many child insert errors, skipping remaining children"
                );
                break;
            }
            if self.uri_budget_exhausted(stats) {
                debug!("URI budget exhausted, skipping remaining children");
                break;
            }

            match self.queue.enqueue_child(child, now).await {
                Ok(ChildEnqueue::Inserted(_)) => {
                    stats.children += 1;
                    counter!("visit_children_total").increment(1);
                }
                Ok(ChildEnqueue::Duplicate) => stats.duplicates += 1,
                Err(e) => {
                    child_errors += 1;
                    errors.push(format!("Failed to insert child {}: {}", child.uri, e));
                }
            }
        }

        let visit_error = join_errors(&errors);
        if visit_error.is_some() {
            stats.errors += 1;
            counter!("visit_errors_total").increment(1);
        }

        self.queue
            .complete_visit(
                item.id,
                VisitCompletion {
                    data: outcome.payload,
                    visit_error,
                },
            )
            .await?;
        stats.visited += 1;
        debug!(children = outcome.children.len(), "Visit finished");
        Ok(())
    }
}

#[async_trait]
impl<Q: WorkQueue + ?Sized + 'static> Worker for VisitWorker<Q> {
    type Stats = VisitStats;

    async fn run(&self, stop: StopSignal) -> Result<VisitStats, WorkerError> {
        info!("Visit worker started");
        let mut stats = VisitStats::default();
        let mut idle = false;

        loop {
            if stop.is_stopped() {
                info!("Stop requested, visit worker exiting");
                break;
            }
            if self.options.max_loops.is_some_and(|max| stats.loops >= max) {
                info!(loops = stats.loops, "Loop limit reached");
                break;
            }
            stats.loops += 1;
            if stats.loops % HOST_PRUNE_INTERVAL == 0 {
                self.prune_hosts();
            }

            let claimed = match self.queue.claim_visitable().await {
                Ok(claimed) => claimed,
                Err(e) => {
                    error!("Failed to claim visitable item: {}", e);
                    if stop.sleep(self.options.idle_sleep).await {
                        break;
                    }
                    continue;
                }
            };

            let Some(item) = claimed else {
                if self.options.exit_on_empty {
                    info!("No more visitable URIs, exiting");
                    break;
                }
                if !idle {
                    info!("Visit queue is empty, waiting for new URIs");
                    self.prune_hosts();
                    idle = true;
                }
                if stop.sleep(self.options.idle_sleep).await {
                    break;
                }
                continue;
            };
            idle = false;

            if let Err(e) = self.visit_item(item, &mut stats, &stop).await {
                error!("Error processing visit: {}", e);
            }

            if self.uri_budget_exhausted(&stats) {
                info!(children = stats.children, "URI limit reached");
                break;
            }
        }

        info!("{}", stats);
        Ok(stats)
    }

    fn name(&self) -> &str {
        "visit"
    }
}

#[cfg(test)]
#[path = "visit_worker_test.rs"]
mod tests;
