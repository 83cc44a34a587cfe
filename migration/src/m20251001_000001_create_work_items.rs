// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WorkItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WorkItems::Uri).text().not_null())
                    .col(ColumnDef::new(WorkItems::CanonicalUri).text().not_null())
                    .col(ColumnDef::new(WorkItems::SourceUri).text())
                    .col(ColumnDef::new(WorkItems::Priority).integer().not_null().default(0))
                    .col(ColumnDef::new(WorkItems::WipAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(WorkItems::FileName).string())
                    .col(ColumnDef::new(WorkItems::Size).big_integer())
                    .col(ColumnDef::new(WorkItems::Md5).string_len(32))
                    .col(ColumnDef::new(WorkItems::Sha1).string_len(40))
                    .col(ColumnDef::new(WorkItems::Sha256).string_len(64))
                    .col(ColumnDef::new(WorkItems::LastModifiedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(WorkItems::Data).text())
                    .col(ColumnDef::new(WorkItems::PackageIdentity).text())
                    .col(ColumnDef::new(WorkItems::LastVisitAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(WorkItems::IsVisitable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(WorkItems::VisitError).text())
                    .col(ColumnDef::new(WorkItems::LastMapAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(WorkItems::IsMappable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(WorkItems::MapError).text())
                    .col(
                        ColumnDef::new(WorkItems::MiningLevel)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WorkItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // A resource may have many historical rows, never two with the same visit timestamp
        manager
            .create_index(
                Index::create()
                    .name("idx_work_items_canonical_visit")
                    .table(WorkItems::Table)
                    .col(WorkItems::CanonicalUri)
                    .col(WorkItems::LastVisitAt)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_work_items_visitable")
                    .table(WorkItems::Table)
                    .col(WorkItems::IsVisitable)
                    .col(WorkItems::Priority)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_work_items_mappable")
                    .table(WorkItems::Table)
                    .col(WorkItems::IsMappable)
                    .col(WorkItems::Priority)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_work_items_uri")
                    .table(WorkItems::Table)
                    .col(WorkItems::Uri)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WorkItems {
    Table,
    Id,
    Uri,
    CanonicalUri,
    SourceUri,
    Priority,
    WipAt,
    FileName,
    Size,
    Md5,
    Sha1,
    Sha256,
    LastModifiedAt,
    Data,
    PackageIdentity,
    LastVisitAt,
    IsVisitable,
    VisitError,
    LastMapAt,
    IsMappable,
    MapError,
    MiningLevel,
    CreatedAt,
}
