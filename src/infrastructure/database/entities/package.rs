// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "packages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub package_type: String,
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub qualifiers: Option<String>,
    pub subpath: Option<String>,
    #[sea_orm(unique)]
    pub download_url: String,
    pub filename: Option<String>,
    pub size: Option<i64>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub sha512: Option<String>,
    pub release_date: Option<ChronoDateTimeWithTimeZone>,
    pub homepage_url: Option<String>,
    pub vcs_url: Option<String>,
    pub description: Option<String>,
    pub extracted_license_statement: Option<String>,
    pub declared_license_expression: Option<String>,
    pub copyright: Option<String>,
    pub keywords: Json,
    pub mining_level: i32,
    pub history: Json,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::package_party::Entity")]
    Parties,
    #[sea_orm(has_many = "super::package_dependency::Entity")]
    Dependencies,
    #[sea_orm(has_one = "super::scan_queue::Entity")]
    ScanQueue,
}

impl Related<super::package_party::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parties.def()
    }
}

impl Related<super::package_dependency::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dependencies.def()
    }
}

impl Related<super::scan_queue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScanQueue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
