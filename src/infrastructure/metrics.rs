// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 启动 Prometheus 指标导出
///
/// # 参数
///
/// * `listen_addr` - 监听地址，例如 `0.0.0.0:9000`
pub fn init_metrics(listen_addr: &str) {
    let addr: SocketAddr = match listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", listen_addr, e);
            return;
        }
    };

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
        return;
    }

    info!("Metrics exporter listening on {}", addr);
}
