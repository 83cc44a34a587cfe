// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::url_utils;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 工作项实体
///
/// 表示一个待访问或待映射的资源URI。同一资源可以存在多条历史记录，
/// 但 `(canonical_uri, last_visit_at)` 组合必须唯一。
/// `is_visitable` 和 `is_mappable` 由路由表在每次保存时重新计算，不允许手工设置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// 唯一标识符
    pub id: Uuid,
    /// 原始URI
    pub uri: String,
    /// 规范化URI，用于唯一性比较
    pub canonical_uri: String,
    /// 来源URI（父资源或镜像）
    pub source_uri: Option<String>,
    /// 优先级，数值越大越先处理
    pub priority: i32,
    /// 认领时间，非空表示正在被某个工作器处理
    pub wip_at: Option<DateTime<FixedOffset>>,
    pub file_name: Option<String>,
    pub size: Option<i64>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub last_modified_at: Option<DateTime<FixedOffset>>,
    /// 访问得到的原始数据
    pub data: Option<String>,
    /// 抓取时推导出的包标识
    pub package_identity: Option<String>,
    /// 最后访问时间
    pub last_visit_at: Option<DateTime<FixedOffset>>,
    /// 是否存在访问路由
    pub is_visitable: bool,
    /// 访问错误
    pub visit_error: Option<String>,
    /// 最后映射时间
    pub last_map_at: Option<DateTime<FixedOffset>>,
    /// 是否存在映射路由
    pub is_mappable: bool,
    /// 映射错误
    pub map_error: Option<String>,
    /// 数据深度指标
    pub mining_level: i32,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
}

impl WorkItem {
    /// 创建一个新的工作项
    ///
    /// # 参数
    ///
    /// * `uri` - 资源URI
    ///
    /// # 返回值
    ///
    /// 返回尚未访问、尚未映射的工作项
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self {
            id: Uuid::new_v4(),
            canonical_uri: url_utils::canonicalize(&uri),
            uri,
            source_uri: None,
            priority: 0,
            wip_at: None,
            file_name: None,
            size: None,
            md5: None,
            sha1: None,
            sha256: None,
            last_modified_at: None,
            data: None,
            package_identity: None,
            last_visit_at: None,
            is_visitable: false,
            visit_error: None,
            last_map_at: None,
            is_mappable: false,
            map_error: None,
            mining_level: 0,
            created_at: Utc::now().into(),
        }
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 从子URI构建工作项
    ///
    /// 已标记为访问过的子URI会直接记录访问结果（`last_visit_at = now`）。
    ///
    /// # 参数
    ///
    /// * `child` - 访问器产出的子URI
    /// * `now` - 当前时间
    pub fn from_child(child: &ChildUri, now: DateTime<FixedOffset>) -> Self {
        let mut item = Self::new(child.uri.clone()).with_priority(child.priority);
        item.source_uri = child.source_uri.clone();
        item.file_name = child.file_name.clone();
        item.size = child.size;
        item.md5 = child.md5.clone();
        item.sha1 = child.sha1.clone();
        item.sha256 = child.sha256.clone();
        item.last_modified_at = child.last_modified_at;
        item.package_identity = child.package_identity.clone();
        item.mining_level = child.mining_level;
        if child.visited {
            item.data = child.data.clone();
            item.last_visit_at = Some(now);
            item.visit_error = child.visit_error.clone();
        }
        item
    }

    /// 当前访问状态
    pub fn visit_state(&self) -> VisitState {
        match (self.wip_at, self.last_visit_at, &self.visit_error) {
            (Some(_), _, _) => VisitState::Wip,
            (None, None, _) => VisitState::NeverVisited,
            (None, Some(_), Some(_)) => VisitState::VisitedError,
            (None, Some(_), None) => VisitState::VisitedOk,
        }
    }

    /// 当前映射状态
    ///
    /// 认领标记由访问和映射共用，只有在访问完成后仍被认领才视为映射中。
    pub fn map_state(&self) -> MapState {
        match (self.last_map_at, &self.map_error) {
            (Some(_), Some(_)) => MapState::MappedError,
            (Some(_), None) => MapState::MappedOk,
            (None, _) if self.wip_at.is_some() && self.last_visit_at.is_some() => MapState::Wip,
            (None, _) => MapState::NeverMapped,
        }
    }

    /// 是否可映射但从未映射
    ///
    /// 处于该状态的工作项不会被自动重访。
    pub fn awaiting_first_map(&self) -> bool {
        self.is_mappable && self.last_map_at.is_none()
    }
}

/// 访问子状态机
///
/// NeverVisited → Wip → VisitedOk | VisitedError，重访时回到 Wip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    NeverVisited,
    Wip,
    VisitedOk,
    VisitedError,
}

/// 映射子状态机
///
/// NeverMapped → Wip → MappedOk | MappedError，没有自动重映射
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    NeverMapped,
    Wip,
    MappedOk,
    MappedError,
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VisitState::NeverVisited => write!(f, "never_visited"),
            VisitState::Wip => write!(f, "wip"),
            VisitState::VisitedOk => write!(f, "visited_ok"),
            VisitState::VisitedError => write!(f, "visited_error"),
        }
    }
}

impl fmt::Display for MapState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MapState::NeverMapped => write!(f, "never_mapped"),
            MapState::Wip => write!(f, "wip"),
            MapState::MappedOk => write!(f, "mapped_ok"),
            MapState::MappedError => write!(f, "mapped_error"),
        }
    }
}

/// 访问器产出的子URI
///
/// `visited = true` 表示访问器已经内联获取了数据，子工作项会以已访问状态写入。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildUri {
    pub uri: String,
    pub source_uri: Option<String>,
    pub visited: bool,
    pub data: Option<String>,
    pub priority: i32,
    pub mining_level: i32,
    pub file_name: Option<String>,
    pub size: Option<i64>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub last_modified_at: Option<DateTime<FixedOffset>>,
    pub package_identity: Option<String>,
    pub visit_error: Option<String>,
}

impl ChildUri {
    /// 创建一个需要后续访问的子URI
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    /// 创建一个已经内联访问过的子URI
    pub fn visited(uri: impl Into<String>, data: Option<String>) -> Self {
        Self {
            uri: uri.into(),
            visited: true,
            data,
            ..Default::default()
        }
    }

    /// 设置来源URI
    pub fn with_source(mut self, source_uri: impl Into<String>) -> Self {
        self.source_uri = Some(source_uri.into());
        self
    }
}

#[cfg(test)]
#[path = "work_item_test.rs"]
mod tests;
