// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::WorkerError;
use crate::utils::shutdown::StopSignal;
use crate::workers::worker::Worker;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 工作管理器
///
/// 把终止信号转换为协作式停止信号；当前工作项总是允许处理完成。
#[derive(Default)]
pub struct WorkerManager {
    stop: StopSignal,
    listener: Option<JoinHandle<()>>,
}

impl WorkerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取停止信号
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// 监听关闭信号
    ///
    /// 收到 Ctrl-C 后设置停止信号，工作器在下一次循环检查时退出
    pub fn listen_for_shutdown(&mut self) {
        let stop = self.stop.clone();
        self.listener = Some(tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received, finishing current item"),
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                    return;
                }
            }
            stop.stop();
        }));
    }

    /// 运行工作器直到其退出
    ///
    /// # 参数
    ///
    /// * `worker` - 要运行的工作器
    ///
    /// # 返回值
    ///
    /// 工作器的汇总统计
    pub async fn run<W: Worker>(&mut self, worker: &W) -> Result<W::Stats, WorkerError> {
        info!(worker = worker.name(), "Starting worker");
        let result = worker.run(self.stop.clone()).await;

        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        info!(worker = worker.name(), "Worker stopped");
        result
    }
}
