// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::collectors::FetchConfig;
use crate::domain::models::package::{DependentPackage, PackageDescription, Party};
use crate::domain::models::work_item::WorkItem;
use crate::engines::reqwest_engine::ReqwestEngine;
use crate::engines::traits::Fetcher;
use crate::routing::{
    MapError, MapHandler, Mapper, RouteTable, RoutingError, VisitError, VisitHandler,
    VisitOutcome, Visitor,
};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

/// npm registry 包元数据地址，支持 `@scope%2fname` 形式的作用域包
pub const PACKUMENT_PATTERN: &str =
    r"https?://registry\.npmjs\.org/(?:@[^/]+(?:/|%2[fF])[^/]+|[^/@][^/]*)/?$";

/// 注册 npm 访问器和映射器
///
/// 每次访问都会用 `fetch` 中的 User-Agent 和超时构建新的访问器
pub fn register(routes: &mut RouteTable, fetch: &FetchConfig) -> Result<(), RoutingError> {
    let engine = ReqwestEngine::new(fetch.user_agent.clone());
    let timeout = fetch.timeout;
    routes.visit.register(
        [PACKUMENT_PATTERN],
        VisitHandler::from_factory(std::any::type_name::<NpmVisitor>(), move || {
            Box::new(NpmVisitor::new(engine.clone(), timeout)) as Box<dyn Visitor>
        }),
    )?;
    routes
        .map
        .register([PACKUMENT_PATTERN], MapHandler::stateful::<NpmMapper>())?;
    Ok(())
}

/// 抓取 npm 包元数据（packument），不产生子URI
pub struct NpmVisitor {
    fetcher: ReqwestEngine,
    timeout: Duration,
}

impl NpmVisitor {
    pub fn new(fetcher: ReqwestEngine, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }
}

impl Default for NpmVisitor {
    fn default() -> Self {
        let fetch = FetchConfig::default();
        Self::new(ReqwestEngine::new(fetch.user_agent), fetch.timeout)
    }
}

#[async_trait]
impl Visitor for NpmVisitor {
    async fn visit(&mut self, uri: &str) -> Result<VisitOutcome, VisitError> {
        let body = self.fetcher.fetch(uri, self.timeout).await?;
        let payload =
            String::from_utf8(body.to_vec()).map_err(|e| VisitError::Parse(e.to_string()))?;
        Ok(VisitOutcome::with_payload(payload))
    }
}

/// 把 packument 映射为每个版本一个包描述
#[derive(Default)]
pub struct NpmMapper;

#[async_trait]
impl Mapper for NpmMapper {
    async fn map(
        &mut self,
        uri: &str,
        item: &WorkItem,
    ) -> Result<Vec<PackageDescription>, MapError> {
        let data = item
            .data
            .as_deref()
            .ok_or_else(|| MapError::InvalidPayload(format!("No packument stored for {}", uri)))?;
        let packument: Packument = serde_json::from_str(data)
            .map_err(|e| MapError::InvalidPayload(format!("Invalid packument: {}", e)))?;

        let packages = packument.descriptions();
        debug!(uri, versions = packages.len(), "Mapped npm packument");
        Ok(packages)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Packument {
    name: String,
    versions: BTreeMap<String, VersionManifest>,
    time: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VersionManifest {
    name: Option<String>,
    version: String,
    description: Option<String>,
    homepage: Option<String>,
    repository: Option<Value>,
    license: Option<Value>,
    licenses: Option<Value>,
    keywords: Option<Value>,
    author: Option<Value>,
    maintainers: Option<Vec<Value>>,
    dependencies: Option<BTreeMap<String, String>>,
    dev_dependencies: Option<BTreeMap<String, String>>,
    optional_dependencies: Option<BTreeMap<String, String>>,
    dist: Option<Dist>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Dist {
    tarball: Option<String>,
    shasum: Option<String>,
}

impl Packument {
    fn descriptions(&self) -> Vec<PackageDescription> {
        self.versions
            .values()
            .map(|manifest| self.describe(manifest))
            .collect()
    }

    fn describe(&self, manifest: &VersionManifest) -> PackageDescription {
        let full_name = manifest.name.as_deref().unwrap_or(&self.name);
        let (namespace, name) = split_scope(full_name);

        let mut package = PackageDescription::new("npm", name, Some(manifest.version.clone()));
        package.namespace = namespace;
        package.description = manifest.description.clone();
        package.homepage_url = manifest.homepage.clone();
        package.vcs_url = manifest.repository.as_ref().and_then(repository_url);
        if let Some(dist) = &manifest.dist {
            package.download_url = dist.tarball.clone();
            package.filename = dist
                .tarball
                .as_deref()
                .and_then(|url| url.rsplit('/').next())
                .map(str::to_string);
            package.sha1 = dist.shasum.clone();
        }
        package.release_date = self
            .time
            .get(&manifest.version)
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok());
        package.extracted_license_statement = manifest
            .license
            .as_ref()
            .and_then(license_statement)
            .or_else(|| manifest.licenses.as_ref().and_then(license_statement));
        package.keywords = manifest
            .keywords
            .as_ref()
            .map(string_list)
            .unwrap_or_default();

        if let Some(author) = manifest.author.as_ref().and_then(|a| party("author", a)) {
            package.parties.push(author);
        }
        package.parties.extend(
            manifest
                .maintainers
                .iter()
                .flatten()
                .filter_map(|m| party("maintainer", m)),
        );

        for (deps, scope, is_runtime, is_optional) in [
            (&manifest.dependencies, "dependencies", true, false),
            (&manifest.dev_dependencies, "devDependencies", false, false),
            (&manifest.optional_dependencies, "optionalDependencies", true, true),
        ] {
            if let Some(deps) = deps {
                package
                    .dependencies
                    .extend(dependencies(deps, scope, is_runtime, is_optional));
            }
        }

        package
    }
}

/// `@scope/name` → (Some("@scope"), "name")
fn split_scope(full_name: &str) -> (Option<String>, String) {
    let decoded = full_name.replace("%2f", "/").replace("%2F", "/");
    match decoded.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
        Some((scope, name)) => (Some(format!("@{}", scope)), name.to_string()),
        None => (None, decoded),
    }
}

fn repository_url(repository: &Value) -> Option<String> {
    match repository {
        Value::String(url) => Some(url.clone()),
        Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
    .filter(|url| !url.trim().is_empty())
}

fn license_statement(license: &Value) -> Option<String> {
    match license {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("type").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => {
            let names: Vec<String> = items.iter().filter_map(license_statement).collect();
            (!names.is_empty()).then(|| names.join(" OR "))
        }
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// 解析 `Name <email> (url)` 或 `{name, email, url}` 形式的参与者
fn party(role: &str, value: &Value) -> Option<Party> {
    let mut party = Party {
        role: Some(role.to_string()),
        ..Default::default()
    };
    match value {
        Value::String(s) => {
            let mut rest = s.as_str();
            if let Some((before, after)) = rest.split_once('(') {
                party.url = after
                    .trim_end()
                    .strip_suffix(')')
                    .map(|u| u.trim().to_string());
                rest = before;
            }
            if let Some((before, after)) = rest.split_once('<') {
                party.email = after.split('>').next().map(|e| e.trim().to_string());
                rest = before;
            }
            party.name = Some(rest.trim().to_string()).filter(|n| !n.is_empty());
        }
        Value::Object(map) => {
            let field = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
            party.name = field("name");
            party.email = field("email");
            party.url = field("url");
        }
        _ => return None,
    }
    (party.name.is_some() || party.email.is_some()).then_some(party)
}

fn dependencies(
    deps: &BTreeMap<String, String>,
    scope: &str,
    is_runtime: bool,
    is_optional: bool,
) -> Vec<DependentPackage> {
    deps.iter()
        .map(|(name, requirement)| {
            let (namespace, name) = split_scope(name);
            let purl = match namespace {
                Some(ns) => format!("pkg:npm/{}/{}", ns, name),
                None => format!("pkg:npm/{}", name),
            };
            DependentPackage {
                purl,
                extracted_requirement: Some(requirement.clone()),
                scope: Some(scope.to_string()),
                is_runtime,
                is_optional,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "npm_test.rs"]
mod tests;
