// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::setup_db;
use harvestrs::domain::models::package::{DependentPackage, Package, PackageDescription, Party};
use harvestrs::domain::models::scan_queue::ScanStatus;
use harvestrs::domain::repositories::package_repository::PackageRepository;
use harvestrs::domain::repositories::RepositoryError;
use harvestrs::domain::repositories::scan_queue_repository::ScanQueueRepository;
use harvestrs::domain::services::merge_policy::{self, RelationChange};
use harvestrs::infrastructure::database::entities::package as package_entity;
use harvestrs::infrastructure::repositories::package_repo_impl::PackageRepositoryImpl;
use harvestrs::infrastructure::repositories::scan_queue_repo_impl::ScanQueueRepositoryImpl;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

const URL: &str = "https://registry.npmjs.org/is-odd/-/is-odd-3.0.1.tgz";

fn description() -> PackageDescription {
    let mut description = PackageDescription::new("npm", "is-odd", Some("3.0.1".to_string()));
    description.download_url = Some(URL.to_string());
    description.keywords = vec!["odd".to_string(), "math".to_string()];
    description.parties = vec![Party {
        role: Some("maintainer".to_string()),
        name: Some("jonschlinkert".to_string()),
        ..Default::default()
    }];
    description.dependencies = vec![DependentPackage {
        purl: "pkg:npm/is-number".to_string(),
        extracted_requirement: Some("^6.0.0".to_string()),
        scope: Some("dependencies".to_string()),
        is_runtime: true,
        is_optional: false,
    }];
    description
}

#[tokio::test]
async fn test_create_persists_relations_and_scan_request() {
    let db = setup_db().await;
    let packages = PackageRepositoryImpl::new(db.clone());
    let mut package = Package::from_description(URL, &description(), 0);
    package.append_history("Created from test");

    let (created, scan) = packages.create_with_scan_request(&package, 7).await.unwrap();
    assert_eq!(scan.package_id, created.id);
    assert_eq!(scan.scan_status, ScanStatus::New);
    assert_eq!(scan.priority, 7);

    let loaded = packages.find_by_download_url(URL).await.unwrap().unwrap();
    assert_eq!(loaded.keywords, ["odd", "math"]);
    assert_eq!(loaded.parties.len(), 1);
    assert_eq!(loaded.dependencies[0].purl, "pkg:npm/is-number");
    assert_eq!(loaded.history.len(), 1);

    let scans = ScanQueueRepositoryImpl::new(db);
    let stored = scans.find_by_package(loaded.id).await.unwrap().unwrap();
    assert_eq!(stored.id, scan.id);
    assert_eq!(scans.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_apply_merge_replaces_relations() {
    let db = setup_db().await;
    let packages = PackageRepositoryImpl::new(db.clone());
    let package = Package::from_description(URL, &description(), 0);
    packages.create_with_scan_request(&package, 0).await.unwrap();
    let existing = packages.find_by_download_url(URL).await.unwrap().unwrap();

    let mut incoming = description();
    incoming.dependencies = Vec::new();
    incoming.parties = vec![
        Party {
            role: Some("author".to_string()),
            name: Some("Jon Schlinkert".to_string()),
            ..Default::default()
        },
        Party {
            role: Some("maintainer".to_string()),
            name: Some("doowb".to_string()),
            ..Default::default()
        },
    ];
    let outcome = merge_policy::merge(&existing, &incoming, 5).unwrap();
    assert_eq!(outcome.parties, RelationChange::Replace);
    assert_eq!(outcome.dependencies, RelationChange::Keep);

    packages
        .apply_merge(&outcome.package, outcome.parties, outcome.dependencies)
        .await
        .unwrap();

    let merged = packages.find_by_id(existing.id).await.unwrap().unwrap();
    assert_eq!(merged.mining_level, 5);
    assert_eq!(merged.parties.len(), 2);
    assert_eq!(merged.dependencies.len(), 1);
    assert_eq!(packages.count().await.unwrap(), 1);
    assert_eq!(ScanQueueRepositoryImpl::new(db).count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_download_url_is_rejected() {
    let db = setup_db().await;
    let packages = PackageRepositoryImpl::new(db);
    let first = Package::from_description(URL, &description(), 0);
    packages.create_with_scan_request(&first, 0).await.unwrap();

    let second = Package::from_description(URL, &description(), 0);
    assert!(packages.create_with_scan_request(&second, 0).await.is_err());
    assert_eq!(packages.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_corrupt_history_is_reported_not_dropped() {
    let db = setup_db().await;
    let packages = PackageRepositoryImpl::new(db.clone());
    let package = Package::from_description(URL, &description(), 0);
    packages.create_with_scan_request(&package, 0).await.unwrap();

    let model = package_entity::Entity::find_by_id(package.id)
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let mut active: package_entity::ActiveModel = model.into();
    active.history = Set(serde_json::json!({"not": "a list"}));
    active.update(db.as_ref()).await.unwrap();

    assert!(matches!(
        packages.find_by_download_url(URL).await,
        Err(RepositoryError::Corrupt(_))
    ));
    assert!(matches!(
        packages.find_by_id(package.id).await,
        Err(RepositoryError::Corrupt(_))
    ));
}
