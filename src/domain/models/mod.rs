// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 定义工作项、包和扫描请求等核心业务实体
pub mod package;
pub mod scan_queue;
pub mod work_item;
