// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::WorkerError;
use crate::utils::shutdown::StopSignal;
use async_trait::async_trait;
use std::fmt::Display;

/// Worker trait定义
///
/// 所有后台工作器都必须实现此trait。单个工作项的失败不会使 `run` 返回错误，
/// 只有停止信号或（按需）队列耗尽才会结束循环。
#[async_trait]
pub trait Worker: Send + Sync {
    /// 运行结束时的汇总信息
    type Stats: Display + Send;

    /// 运行工作器，直到停止信号或退出条件满足
    async fn run(&self, stop: StopSignal) -> Result<Self::Stats, WorkerError>;

    /// 获取工作器名称
    fn name(&self) -> &str;
}
