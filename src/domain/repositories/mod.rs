// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::DbErr;
use thiserror::Error;

/// 仓库接口模块
///
/// 定义工作项、包和扫描队列的数据访问抽象
pub mod package_repository;
pub mod scan_queue_repository;
pub mod work_item_repository;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 存储的数据无法还原为领域对象
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}
