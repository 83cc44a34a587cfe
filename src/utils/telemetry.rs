// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 初始化日志
///
/// `RUST_LOG` 未设置时使用 `info,harvestrs=debug`。
///
/// # 参数
///
/// * `json` - 是否输出 JSON 格式日志
pub fn init_telemetry(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,harvestrs=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    // A subscriber may already be installed in tests
    if let Err(e) = result {
        eprintln!("Telemetry already initialised: {}", e);
    }
}
