// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 测试主模块
///
/// 基于内存SQLite的集成测试：工作项仓库、队列认领语义与路由表
mod integration;
