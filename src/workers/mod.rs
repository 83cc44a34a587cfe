// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 访问、映射和扫描三个工作循环，以及把终止信号转换为停止信号的管理器
pub mod manager;
pub mod map_worker;
pub mod scan_worker;
pub mod visit_worker;
pub mod worker;

pub use worker::Worker;
