// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 采集器模块
///
/// 内置的访问器和映射器插件
pub mod collectors;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// HTTP抓取接口及实现
pub mod engines;

/// 基础设施模块
///
/// 提供数据库、仓库实现和指标导出
pub mod infrastructure;

/// 队列模块
///
/// 实现工作项的认领和完成
pub mod queue;

/// 路由模块
///
/// 将URI分派到访问器和映射器
pub mod routing;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现访问、映射和扫描工作循环
pub mod workers;
