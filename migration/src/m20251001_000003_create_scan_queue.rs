// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::m20251001_000002_create_packages::Packages;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScanQueue::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScanQueue::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScanQueue::Uri).text().not_null())
                    .col(ColumnDef::new(ScanQueue::PackageId).uuid().not_null())
                    .col(
                        ColumnDef::new(ScanQueue::ScanStatus)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ScanQueue::ScanRequestedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ScanQueue::LastPolledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ScanQueue::ScanHandle).string())
                    .col(ColumnDef::new(ScanQueue::ScanError).text())
                    .col(ColumnDef::new(ScanQueue::IndexError).text())
                    .col(ColumnDef::new(ScanQueue::Priority).integer().not_null().default(0))
                    .col(ColumnDef::new(ScanQueue::WipAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ScanQueue::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scan_queue_package")
                            .from(ScanQueue::Table, ScanQueue::PackageId)
                            .to(Packages::Table, Packages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One scan request per package
        manager
            .create_index(
                Index::create()
                    .name("idx_scan_queue_package_id")
                    .table(ScanQueue::Table)
                    .col(ScanQueue::PackageId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scan_queue_status_priority")
                    .table(ScanQueue::Table)
                    .col(ScanQueue::ScanStatus)
                    .col(ScanQueue::Priority)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScanQueue::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScanQueue {
    Table,
    Id,
    Uri,
    PackageId,
    ScanStatus,
    ScanRequestedAt,
    LastPolledAt,
    ScanHandle,
    ScanError,
    IndexError,
    Priority,
    WipAt,
    CreatedAt,
}
