// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::package::{DependentPackage, Package, PackageDescription, Party};
use chrono::{DateTime, FixedOffset};
use std::fmt;
use thiserror::Error;

/// 合并错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// 双方都存在且不一致的校验和，属于数据完整性错误
    #[error("Checksum mismatch on {field}: existing {existing} != new {new}")]
    ChecksumMismatch {
        field: &'static str,
        existing: String,
        new: String,
    },
}

/// 合并分支
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeBranch {
    /// 现有记录优先，只填补空字段
    ExistingWins,
    /// 新数据优先，非空字段全部覆盖
    NewWins,
}

impl fmt::Display for MergeBranch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MergeBranch::ExistingWins => write!(f, "existing wins"),
            MergeBranch::NewWins => write!(f, "new wins"),
        }
    }
}

/// 关联列表（参与者、依赖）的变更方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationChange {
    /// 不变
    Keep,
    /// 当前没有关联行，插入新行
    Insert,
    /// 删除全部旧行并替换
    Replace,
}

/// 合并结果
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// 合并后的包（关联列表为目标状态）
    pub package: Package,
    pub branch: MergeBranch,
    /// 发生变化的字段名
    pub updated_fields: Vec<&'static str>,
    pub parties: RelationChange,
    pub dependencies: RelationChange,
}

impl MergeOutcome {
    /// 审计记录文本
    pub fn history_message(&self, new_level: i32) -> String {
        if self.updated_fields.is_empty() {
            format!(
                "Merged at mining level {} ({}): no field changed",
                new_level, self.branch
            )
        } else {
            format!(
                "Merged at mining level {} ({}): updated {}",
                new_level,
                self.branch,
                self.updated_fields.join(", ")
            )
        }
    }
}

/// 按数据深度合并新描述到已有包
///
/// - `new_level < existing.mining_level`：只填补已有记录中为空的字段
/// - `new_level >= existing.mining_level`：新数据中的非空字段覆盖旧值，并更新数据深度
///
/// 两侧都非空且不一致的校验和会直接返回错误，已有记录不做任何修改。
pub fn merge(
    existing: &Package,
    incoming: &PackageDescription,
    new_level: i32,
) -> Result<MergeOutcome, MergeError> {
    check_checksum("md5", &existing.md5, &incoming.md5)?;
    check_checksum("sha1", &existing.sha1, &incoming.sha1)?;
    check_checksum("sha256", &existing.sha256, &incoming.sha256)?;
    check_checksum("sha512", &existing.sha512, &incoming.sha512)?;

    let branch = if new_level < existing.mining_level {
        MergeBranch::ExistingWins
    } else {
        MergeBranch::NewWins
    };
    let replace = branch == MergeBranch::NewWins;

    let mut package = existing.clone();
    let mut updated = Vec::new();

    macro_rules! merge_fields {
        ($($field:ident),+ $(,)?) => {
            $(
                if merge_field(&mut package.$field, &incoming.$field, replace) {
                    updated.push(stringify!($field));
                }
            )+
        };
    }

    merge_fields!(
        package_type,
        namespace,
        name,
        version,
        qualifiers,
        subpath,
        filename,
        size,
        md5,
        sha1,
        sha256,
        sha512,
        release_date,
        homepage_url,
        vcs_url,
        description,
        extracted_license_statement,
        declared_license_expression,
        copyright,
        keywords,
    );

    if replace && package.mining_level != new_level {
        package.mining_level = new_level;
        updated.push("mining_level");
    }

    let parties = merge_relation(&mut package.parties, &incoming.parties, replace);
    if parties != RelationChange::Keep {
        updated.push("parties");
    }
    let dependencies = merge_relation(&mut package.dependencies, &incoming.dependencies, replace);
    if dependencies != RelationChange::Keep {
        updated.push("dependencies");
    }

    Ok(MergeOutcome {
        package,
        branch,
        updated_fields: updated,
        parties,
        dependencies,
    })
}

fn check_checksum(
    field: &'static str,
    existing: &Option<String>,
    new: &Option<String>,
) -> Result<(), MergeError> {
    match (non_empty(existing), non_empty(new)) {
        (Some(old), Some(new)) if !old.eq_ignore_ascii_case(new) => {
            Err(MergeError::ChecksumMismatch {
                field,
                existing: old.to_string(),
                new: new.to_string(),
            })
        }
        _ => Ok(()),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// 可判空的字段值
trait FieldValue: Clone + PartialEq {
    fn is_empty_value(&self) -> bool;
}

impl FieldValue for String {
    fn is_empty_value(&self) -> bool {
        self.trim().is_empty()
    }
}

impl FieldValue for Option<String> {
    fn is_empty_value(&self) -> bool {
        non_empty(self).is_none()
    }
}

impl FieldValue for Option<i64> {
    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

impl FieldValue for Option<DateTime<FixedOffset>> {
    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

impl FieldValue for Vec<String> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

fn merge_field<T: FieldValue>(existing: &mut T, new: &T, replace: bool) -> bool {
    if new.is_empty_value() || existing == new {
        return false;
    }
    if replace || existing.is_empty_value() {
        *existing = new.clone();
        return true;
    }
    false
}

trait Relation: Clone + PartialEq {}
impl Relation for Party {}
impl Relation for DependentPackage {}

fn merge_relation<T: Relation>(existing: &mut Vec<T>, new: &[T], replace: bool) -> RelationChange {
    if new.is_empty() || existing.as_slice() == new {
        return RelationChange::Keep;
    }
    if existing.is_empty() {
        *existing = new.to_vec();
        return RelationChange::Insert;
    }
    if replace {
        *existing = new.to_vec();
        return RelationChange::Replace;
    }
    RelationChange::Keep
}

#[cfg(test)]
#[path = "merge_policy_test.rs"]
mod tests;
