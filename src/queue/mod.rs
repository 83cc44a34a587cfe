// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 在工作项仓库之上提供认领、入队和完成操作
pub mod work_queue;
