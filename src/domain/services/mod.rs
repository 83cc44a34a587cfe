// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含与存储无关的纯业务规则：包合并策略和许可证规范化
pub mod license;
pub mod merge_policy;
