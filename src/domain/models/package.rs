// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 映射器产出的包描述
///
/// 至少包含类型、名称和版本；下载地址是包的身份标识，缺失时该描述会被拒绝。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageDescription {
    #[serde(rename = "type")]
    pub package_type: String,
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub qualifiers: Option<String>,
    pub subpath: Option<String>,
    pub download_url: Option<String>,
    pub filename: Option<String>,
    pub size: Option<i64>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub sha512: Option<String>,
    pub release_date: Option<DateTime<FixedOffset>>,
    pub homepage_url: Option<String>,
    pub vcs_url: Option<String>,
    pub description: Option<String>,
    pub extracted_license_statement: Option<String>,
    pub declared_license_expression: Option<String>,
    pub copyright: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub parties: Vec<Party>,
    #[serde(default)]
    pub dependencies: Vec<DependentPackage>,
}

impl PackageDescription {
    /// 创建最小的包描述
    pub fn new(
        package_type: impl Into<String>,
        name: impl Into<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            package_type: package_type.into(),
            name: name.into(),
            version,
            ..Default::default()
        }
    }

    /// 身份键（下载地址），空字符串视为缺失
    pub fn identity(&self) -> Option<&str> {
        self.download_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// 生成 package URL 形式的展示名称
    pub fn purl(&self) -> String {
        purl(
            &self.package_type,
            self.namespace.as_deref(),
            &self.name,
            self.version.as_deref(),
        )
    }
}

/// 包参与者（作者、维护者等）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub role: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
}

/// 依赖关系
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentPackage {
    pub purl: String,
    pub extracted_requirement: Option<String>,
    pub scope: Option<String>,
    pub is_runtime: bool,
    pub is_optional: bool,
}

/// 审计记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
}

/// 已持久化的包
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub package_type: String,
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub qualifiers: Option<String>,
    pub subpath: Option<String>,
    pub download_url: String,
    pub filename: Option<String>,
    pub size: Option<i64>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub sha512: Option<String>,
    pub release_date: Option<DateTime<FixedOffset>>,
    pub homepage_url: Option<String>,
    pub vcs_url: Option<String>,
    pub description: Option<String>,
    pub extracted_license_statement: Option<String>,
    pub declared_license_expression: Option<String>,
    pub copyright: Option<String>,
    pub keywords: Vec<String>,
    pub mining_level: i32,
    pub history: Vec<HistoryEntry>,
    pub parties: Vec<Party>,
    pub dependencies: Vec<DependentPackage>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl Package {
    /// 由包描述创建新包
    ///
    /// # 参数
    ///
    /// * `download_url` - 已校验的身份键
    /// * `description` - 包描述
    /// * `mining_level` - 数据深度
    pub fn from_description(
        download_url: &str,
        description: &PackageDescription,
        mining_level: i32,
    ) -> Self {
        let now: DateTime<FixedOffset> = Utc::now().into();
        Self {
            id: Uuid::new_v4(),
            package_type: description.package_type.clone(),
            namespace: description.namespace.clone(),
            name: description.name.clone(),
            version: description.version.clone(),
            qualifiers: description.qualifiers.clone(),
            subpath: description.subpath.clone(),
            download_url: download_url.to_string(),
            filename: description.filename.clone(),
            size: description.size,
            md5: description.md5.clone(),
            sha1: description.sha1.clone(),
            sha256: description.sha256.clone(),
            sha512: description.sha512.clone(),
            release_date: description.release_date,
            homepage_url: description.homepage_url.clone(),
            vcs_url: description.vcs_url.clone(),
            description: description.description.clone(),
            extracted_license_statement: description.extracted_license_statement.clone(),
            declared_license_expression: description.declared_license_expression.clone(),
            copyright: description.copyright.clone(),
            keywords: description.keywords.clone(),
            mining_level,
            history: Vec::new(),
            parties: description.parties.clone(),
            dependencies: description.dependencies.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 追加审计记录
    pub fn append_history(&mut self, message: impl Into<String>) {
        self.history.push(HistoryEntry {
            timestamp: Utc::now().into(),
            message: message.into(),
        });
    }

    pub fn purl(&self) -> String {
        purl(
            &self.package_type,
            self.namespace.as_deref(),
            &self.name,
            self.version.as_deref(),
        )
    }
}

fn purl(package_type: &str, namespace: Option<&str>, name: &str, version: Option<&str>) -> String {
    let mut purl = format!("pkg:{}/", package_type);
    if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
        purl.push_str(ns);
        purl.push('/');
    }
    purl.push_str(name);
    if let Some(v) = version.filter(|v| !v.is_empty()) {
        purl.push('@');
        purl.push_str(v);
    }
    purl
}
