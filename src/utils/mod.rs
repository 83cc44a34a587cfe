// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
/// 包括 robots.txt 检查、主机限速、URL 规范化、停止信号和遥测初始化
pub mod errors;
pub mod politeness;
pub mod robots;
pub mod shutdown;
pub mod telemetry;
pub mod throttle;
pub mod url_utils;
