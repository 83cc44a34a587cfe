// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 持久化错误信息的最大字符数
pub const MAX_ERROR_LENGTH: usize = 5000;

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("仓库错误: {0}")]
    RepositoryError(String),

    #[error("队列错误: {0}")]
    QueueError(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}

impl From<crate::domain::repositories::RepositoryError> for WorkerError {
    fn from(err: crate::domain::repositories::RepositoryError) -> Self {
        WorkerError::RepositoryError(err.to_string())
    }
}

impl From<crate::queue::work_queue::QueueError> for WorkerError {
    fn from(err: crate::queue::work_queue::QueueError) -> Self {
        WorkerError::QueueError(err.to_string())
    }
}

/// 将错误信息截断到可存储的长度
///
/// 按字符截断，保证不会切断多字节字符。
pub fn truncate_error(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_LENGTH) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

/// 合并多条错误信息并截断
pub fn join_errors(errors: &[String]) -> Option<String> {
    if errors.is_empty() {
        None
    } else {
        Some(truncate_error(&errors.join("\n")))
    }
}

/// 带完整原因链的错误描述
pub fn describe_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str("\ncaused by: ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
