// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "work_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub uri: String,
    pub canonical_uri: String,
    pub source_uri: Option<String>,
    pub priority: i32,
    pub wip_at: Option<ChronoDateTimeWithTimeZone>,
    pub file_name: Option<String>,
    pub size: Option<i64>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub last_modified_at: Option<ChronoDateTimeWithTimeZone>,
    pub data: Option<String>,
    pub package_identity: Option<String>,
    pub last_visit_at: Option<ChronoDateTimeWithTimeZone>,
    pub is_visitable: bool,
    pub visit_error: Option<String>,
    pub last_map_at: Option<ChronoDateTimeWithTimeZone>,
    pub is_mappable: bool,
    pub map_error: Option<String>,
    pub mining_level: i32,
    pub created_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
