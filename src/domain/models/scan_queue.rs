// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 扫描请求
///
/// 在包首次创建时生成，与包一一对应；包更新时不会再次创建。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanQueueItem {
    pub id: Uuid,
    /// 待扫描的下载地址
    pub uri: String,
    /// 关联的包
    pub package_id: Uuid,
    pub scan_status: ScanStatus,
    pub scan_requested_at: Option<DateTime<FixedOffset>>,
    pub last_polled_at: Option<DateTime<FixedOffset>>,
    /// 外部扫描服务返回的句柄
    pub scan_handle: Option<String>,
    pub scan_error: Option<String>,
    pub index_error: Option<String>,
    pub priority: i32,
    pub wip_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
}

impl ScanQueueItem {
    /// 为新包创建扫描请求
    pub fn new(uri: impl Into<String>, package_id: Uuid, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            uri: uri.into(),
            package_id,
            scan_status: ScanStatus::New,
            scan_requested_at: None,
            last_polled_at: None,
            scan_handle: None,
            scan_error: None,
            index_error: None,
            priority,
            wip_at: None,
            created_at: Utc::now().into(),
        }
    }
}

/// 扫描状态
///
/// New → Submitted → InProgress → Completed → Indexed，
/// 提交之后的任何状态都可以进入 Failed / Timeout / IndexFailed。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    #[default]
    New,
    Submitted,
    InProgress,
    Completed,
    Indexed,
    Failed,
    Timeout,
    IndexFailed,
}

impl ScanStatus {
    /// 可以被扫描工作器认领的状态
    pub const CLAIMABLE: [ScanStatus; 4] = [
        ScanStatus::New,
        ScanStatus::Submitted,
        ScanStatus::InProgress,
        ScanStatus::Completed,
    ];

    /// 持久化编码
    pub fn code(self) -> i32 {
        match self {
            ScanStatus::New => 0,
            ScanStatus::Submitted => 1,
            ScanStatus::InProgress => 2,
            ScanStatus::Completed => 3,
            ScanStatus::Indexed => 4,
            ScanStatus::Failed => 5,
            ScanStatus::Timeout => 6,
            ScanStatus::IndexFailed => 7,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ScanStatus::New),
            1 => Some(ScanStatus::Submitted),
            2 => Some(ScanStatus::InProgress),
            3 => Some(ScanStatus::Completed),
            4 => Some(ScanStatus::Indexed),
            5 => Some(ScanStatus::Failed),
            6 => Some(ScanStatus::Timeout),
            7 => Some(ScanStatus::IndexFailed),
            _ => None,
        }
    }

    /// 是否为终止状态
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanStatus::Indexed | ScanStatus::Failed | ScanStatus::Timeout | ScanStatus::IndexFailed
        )
    }

    /// 认领顺序：越靠后的阶段越优先，以便先排空已提交的请求
    pub fn claim_rank(self) -> Option<u8> {
        match self {
            ScanStatus::Completed => Some(3),
            ScanStatus::InProgress => Some(2),
            ScanStatus::Submitted => Some(1),
            ScanStatus::New => Some(0),
            _ => None,
        }
    }

    /// 校验状态转换
    pub fn can_transition_to(self, next: ScanStatus) -> bool {
        use ScanStatus::*;
        match (self, next) {
            (New, Submitted) => true,
            (Submitted, InProgress) | (Submitted, Completed) => true,
            (InProgress, InProgress) | (InProgress, Completed) => true,
            (Completed, Indexed) => true,
            (Submitted | InProgress, Failed | Timeout) => true,
            (Completed, Failed | IndexFailed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanStatus::New => write!(f, "NEW"),
            ScanStatus::Submitted => write!(f, "SUBMITTED"),
            ScanStatus::InProgress => write!(f, "IN_PROGRESS"),
            ScanStatus::Completed => write!(f, "COMPLETED"),
            ScanStatus::Indexed => write!(f, "INDEXED"),
            ScanStatus::Failed => write!(f, "FAILED"),
            ScanStatus::Timeout => write!(f, "TIMEOUT"),
            ScanStatus::IndexFailed => write!(f, "INDEX_FAILED"),
        }
    }
}

impl FromStr for ScanStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(ScanStatus::New),
            "SUBMITTED" => Ok(ScanStatus::Submitted),
            "IN_PROGRESS" => Ok(ScanStatus::InProgress),
            "COMPLETED" => Ok(ScanStatus::Completed),
            "INDEXED" => Ok(ScanStatus::Indexed),
            "FAILED" => Ok(ScanStatus::Failed),
            "TIMEOUT" => Ok(ScanStatus::Timeout),
            "INDEX_FAILED" => Ok(ScanStatus::IndexFailed),
            _ => Err(()),
        }
    }
}
