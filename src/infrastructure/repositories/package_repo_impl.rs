// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::package::{DependentPackage, HistoryEntry, Package, Party};
use crate::domain::models::scan_queue::ScanQueueItem;
use crate::domain::repositories::package_repository::PackageRepository;
use crate::domain::repositories::RepositoryError;
use crate::domain::services::merge_policy::RelationChange;
use crate::infrastructure::database::entities::{
    package as package_entity, package_dependency as dependency_entity,
    package_party as party_entity, scan_queue as scan_queue_entity,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

/// 包仓库实现
///
/// 包、参与者、依赖和扫描请求的写入都在单个事务中完成。
#[derive(Clone)]
pub struct PackageRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl PackageRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 加载包及其关联数据
    async fn hydrate(&self, model: package_entity::Model) -> Result<Package, RepositoryError> {
        let parties = model
            .find_related(party_entity::Entity)
            .all(self.db.as_ref())
            .await?;
        let dependencies = model
            .find_related(dependency_entity::Entity)
            .all(self.db.as_ref())
            .await?;

        let mut package = Package::try_from(model)?;
        package.parties = parties.into_iter().map(Party::from).collect();
        package.dependencies = dependencies
            .into_iter()
            .map(DependentPackage::from)
            .collect();
        Ok(package)
    }
}

impl TryFrom<package_entity::Model> for Package {
    type Error = RepositoryError;

    fn try_from(model: package_entity::Model) -> Result<Self, Self::Error> {
        let keywords: Vec<String> = serde_json::from_value(model.keywords).map_err(|e| {
            RepositoryError::Corrupt(format!("Invalid keywords for package {}: {}", model.id, e))
        })?;
        let history: Vec<HistoryEntry> = serde_json::from_value(model.history).map_err(|e| {
            RepositoryError::Corrupt(format!("Invalid history for package {}: {}", model.id, e))
        })?;

        Ok(Self {
            id: model.id,
            package_type: model.package_type,
            namespace: model.namespace,
            name: model.name,
            version: model.version,
            qualifiers: model.qualifiers,
            subpath: model.subpath,
            download_url: model.download_url,
            filename: model.filename,
            size: model.size,
            md5: model.md5,
            sha1: model.sha1,
            sha256: model.sha256,
            sha512: model.sha512,
            release_date: model.release_date,
            homepage_url: model.homepage_url,
            vcs_url: model.vcs_url,
            description: model.description,
            extracted_license_statement: model.extracted_license_statement,
            declared_license_expression: model.declared_license_expression,
            copyright: model.copyright,
            keywords,
            mining_level: model.mining_level,
            history,
            parties: Vec::new(),
            dependencies: Vec::new(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<party_entity::Model> for Party {
    fn from(model: party_entity::Model) -> Self {
        Self {
            role: model.role,
            name: model.name,
            email: model.email,
            url: model.url,
        }
    }
}

impl From<dependency_entity::Model> for DependentPackage {
    fn from(model: dependency_entity::Model) -> Self {
        Self {
            purl: model.purl,
            extracted_requirement: model.extracted_requirement,
            scope: model.scope,
            is_runtime: model.is_runtime,
            is_optional: model.is_optional,
        }
    }
}

fn to_active(package: &Package) -> Result<package_entity::ActiveModel, RepositoryError> {
    let keywords = serde_json::to_value(&package.keywords)
        .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;
    let history = serde_json::to_value(&package.history)
        .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;

    Ok(package_entity::ActiveModel {
        id: Set(package.id),
        package_type: Set(package.package_type.clone()),
        namespace: Set(package.namespace.clone()),
        name: Set(package.name.clone()),
        version: Set(package.version.clone()),
        qualifiers: Set(package.qualifiers.clone()),
        subpath: Set(package.subpath.clone()),
        download_url: Set(package.download_url.clone()),
        filename: Set(package.filename.clone()),
        size: Set(package.size),
        md5: Set(package.md5.clone()),
        sha1: Set(package.sha1.clone()),
        sha256: Set(package.sha256.clone()),
        sha512: Set(package.sha512.clone()),
        release_date: Set(package.release_date),
        homepage_url: Set(package.homepage_url.clone()),
        vcs_url: Set(package.vcs_url.clone()),
        description: Set(package.description.clone()),
        extracted_license_statement: Set(package.extracted_license_statement.clone()),
        declared_license_expression: Set(package.declared_license_expression.clone()),
        copyright: Set(package.copyright.clone()),
        keywords: Set(keywords),
        mining_level: Set(package.mining_level),
        history: Set(history),
        created_at: Set(package.created_at),
        updated_at: Set(package.updated_at),
    })
}

async fn insert_parties<C: ConnectionTrait>(
    conn: &C,
    package_id: Uuid,
    parties: &[Party],
) -> Result<(), RepositoryError> {
    for party in parties {
        party_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            package_id: Set(package_id),
            role: Set(party.role.clone()),
            name: Set(party.name.clone()),
            email: Set(party.email.clone()),
            url: Set(party.url.clone()),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

async fn insert_dependencies<C: ConnectionTrait>(
    conn: &C,
    package_id: Uuid,
    dependencies: &[DependentPackage],
) -> Result<(), RepositoryError> {
    for dependency in dependencies {
        dependency_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            package_id: Set(package_id),
            purl: Set(dependency.purl.clone()),
            extracted_requirement: Set(dependency.extracted_requirement.clone()),
            scope: Set(dependency.scope.clone()),
            is_runtime: Set(dependency.is_runtime),
            is_optional: Set(dependency.is_optional),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl PackageRepository for PackageRepositoryImpl {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Package>, RepositoryError> {
        match package_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
        {
            Some(model) => Ok(Some(self.hydrate(model).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_download_url(&self, url: &str) -> Result<Option<Package>, RepositoryError> {
        match package_entity::Entity::find()
            .filter(package_entity::Column::DownloadUrl.eq(url))
            .one(self.db.as_ref())
            .await?
        {
            Some(model) => Ok(Some(self.hydrate(model).await?)),
            None => Ok(None),
        }
    }

    async fn create_with_scan_request(
        &self,
        package: &Package,
        scan_priority: i32,
    ) -> Result<(Package, ScanQueueItem), RepositoryError> {
        let txn = self.db.begin().await?;

        to_active(package)?.insert(&txn).await?;
        insert_parties(&txn, package.id, &package.parties).await?;
        insert_dependencies(&txn, package.id, &package.dependencies).await?;

        let scan = ScanQueueItem::new(package.download_url.clone(), package.id, scan_priority);
        scan_queue_entity::ActiveModel::from(scan.clone())
            .insert(&txn)
            .await?;

        txn.commit().await?;
        Ok((package.clone(), scan))
    }

    async fn apply_merge(
        &self,
        package: &Package,
        parties: RelationChange,
        dependencies: RelationChange,
    ) -> Result<Package, RepositoryError> {
        let mut package = package.clone();
        package.updated_at = Utc::now().into();

        let txn = self.db.begin().await?;
        to_active(&package)?.update(&txn).await?;

        match parties {
            RelationChange::Keep => {}
            RelationChange::Insert => insert_parties(&txn, package.id, &package.parties).await?,
            RelationChange::Replace => {
                party_entity::Entity::delete_many()
                    .filter(party_entity::Column::PackageId.eq(package.id))
                    .exec(&txn)
                    .await?;
                insert_parties(&txn, package.id, &package.parties).await?;
            }
        }

        match dependencies {
            RelationChange::Keep => {}
            RelationChange::Insert => {
                insert_dependencies(&txn, package.id, &package.dependencies).await?
            }
            RelationChange::Replace => {
                dependency_entity::Entity::delete_many()
                    .filter(dependency_entity::Column::PackageId.eq(package.id))
                    .exec(&txn)
                    .await?;
                insert_dependencies(&txn, package.id, &package.dependencies).await?;
            }
        }

        txn.commit().await?;
        Ok(package)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(package_entity::Entity::find()
            .count(self.db.as_ref())
            .await?)
    }
}
