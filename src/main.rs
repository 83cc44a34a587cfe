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

use clap::{Args, Parser, Subcommand};
use harvestrs::collectors::FetchConfig;
use harvestrs::config::settings::Settings;
use harvestrs::domain::models::work_item::WorkItem;
use harvestrs::domain::repositories::work_item_repository::WorkItemRepository;
use harvestrs::domain::services::license::SpdxLicenseNormalizer;
use harvestrs::infrastructure::database::connection;
use harvestrs::infrastructure::repositories::package_repo_impl::PackageRepositoryImpl;
use harvestrs::infrastructure::repositories::work_item_repo_impl::WorkItemRepositoryImpl;
use harvestrs::queue::work_queue::{DatabaseWorkQueue, WorkQueue};
use harvestrs::routing::default_routes;
use harvestrs::utils::politeness::PolitenessController;
use harvestrs::utils::robots::RobotsChecker;
use harvestrs::utils::telemetry;
use harvestrs::utils::throttle::HostThrottle;
use harvestrs::workers::manager::WorkerManager;
use harvestrs::workers::map_worker::{MapOptions, MapWorker};
use harvestrs::workers::visit_worker::{VisitOptions, VisitWorker};
use std::sync::Arc;
use tracing::{info, warn};

/// 包元数据采集器
#[derive(Debug, Parser)]
#[command(name = "harvestrs", version, about = "Visit and map package repository URIs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Visit queued URIs, storing fetched data and discovered URIs
    RunVisit(RunVisitArgs),
    /// Map visited URIs to packages
    RunMap {
        /// Exit once no mappable URI is left
        #[arg(long)]
        exit_on_empty: bool,
    },
    /// Add seed URIs to the queue
    Seed {
        #[arg(required = true)]
        uris: Vec<String>,
        #[arg(long, default_value_t = 0)]
        priority: i32,
    },
    /// Recompute visit/map routability of unclaimed URIs
    RefreshRoutes,
}

#[derive(Debug, Args)]
struct RunVisitArgs {
    /// Exit once no visitable URI is left
    #[arg(long)]
    exit_on_empty: bool,
    /// Stop after inserting this many new URIs
    #[arg(long)]
    max_uris: Option<usize>,
    /// Stop after this many loop iterations
    #[arg(long)]
    max_loops: Option<usize>,
    /// Do not consult robots.txt
    #[arg(long)]
    ignore_robots: bool,
    /// Do not wait between requests to the same host
    #[arg(long)]
    ignore_throttle: bool,
}

/// 主函数
///
/// 加载配置、连接数据库并执行子命令
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging and metrics
    telemetry::init_telemetry(settings.telemetry.json);
    info!("Starting harvestrs...");
    if settings.metrics.enabled {
        harvestrs::infrastructure::metrics::init_metrics(&settings.metrics.listen_addr);
    }

    // 3. Connect to database and apply migrations
    let db = Arc::new(connection::connect_and_migrate(&settings.database).await?);
    info!("Database connection established");

    // 4. Build routes and repositories
    let routes = Arc::new(default_routes(&FetchConfig::from(&settings.visit))?);
    let work_items = Arc::new(WorkItemRepositoryImpl::new(db.clone(), routes.clone()));
    let queue = Arc::new(DatabaseWorkQueue::new(
        work_items.clone(),
        settings.visit.revisit_window(),
    ));

    let mut manager = WorkerManager::new();
    manager.listen_for_shutdown();

    match cli.command {
        Command::RunVisit(args) => {
            let robots = Arc::new(
                RobotsChecker::new(settings.robots.cache_ttl(), settings.robots.cache_capacity)
                    .with_max_delay(settings.robots.max_crawl_delay()),
            );
            let politeness = PolitenessController::new(
                robots,
                HostThrottle::new(),
                settings.visit.user_agent.clone(),
                settings.visit.default_crawl_delay(),
            )
            .with_host_retention(
                settings
                    .robots
                    .max_crawl_delay()
                    .max(settings.visit.default_crawl_delay()),
            )
            .ignore_robots(args.ignore_robots)
            .ignore_throttle(args.ignore_throttle);

            let worker = VisitWorker::new(
                queue,
                routes,
                politeness,
                VisitOptions {
                    exit_on_empty: args.exit_on_empty,
                    max_uris: args.max_uris,
                    max_loops: args.max_loops,
                    idle_sleep: settings.visit.idle_sleep(),
                },
            );
            let stats = manager.run(&worker).await?;
            println!("{}", stats);
        }
        Command::RunMap { exit_on_empty } => {
            let packages = Arc::new(PackageRepositoryImpl::new(db.clone()));
            let worker = MapWorker::new(
                queue,
                packages,
                routes,
                Arc::new(SpdxLicenseNormalizer),
                MapOptions {
                    exit_on_empty,
                    batch_size: settings.map.batch_size,
                    idle_sleep: settings.map.idle_sleep(),
                },
            );
            let stats = manager.run(&worker).await?;
            println!("{}", stats);
        }
        Command::Seed { uris, priority } => {
            let mut seeded = 0;
            for uri in uris {
                let item = queue
                    .enqueue(WorkItem::new(uri).with_priority(priority))
                    .await?;
                if !item.is_visitable {
                    warn!(uri = %item.uri, "Seeded URI has no visit route");
                }
                seeded += 1;
            }
            println!("Seeded {} URIs", seeded);
        }
        Command::RefreshRoutes => {
            let changed = work_items.refresh_routability().await?;
            println!("Updated routability of {} work items", changed);
        }
    }

    Ok(())
}
