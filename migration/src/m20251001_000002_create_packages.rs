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
                    .table(Packages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Packages::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Packages::PackageType).string().not_null())
                    .col(ColumnDef::new(Packages::Namespace).string())
                    .col(ColumnDef::new(Packages::Name).string().not_null())
                    .col(ColumnDef::new(Packages::Version).string())
                    .col(ColumnDef::new(Packages::Qualifiers).string())
                    .col(ColumnDef::new(Packages::Subpath).string())
                    .col(ColumnDef::new(Packages::DownloadUrl).text().not_null())
                    .col(ColumnDef::new(Packages::Filename).string())
                    .col(ColumnDef::new(Packages::Size).big_integer())
                    .col(ColumnDef::new(Packages::Md5).string_len(32))
                    .col(ColumnDef::new(Packages::Sha1).string_len(40))
                    .col(ColumnDef::new(Packages::Sha256).string_len(64))
                    .col(ColumnDef::new(Packages::Sha512).string_len(128))
                    .col(ColumnDef::new(Packages::ReleaseDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Packages::HomepageUrl).text())
                    .col(ColumnDef::new(Packages::VcsUrl).text())
                    .col(ColumnDef::new(Packages::Description).text())
                    .col(ColumnDef::new(Packages::ExtractedLicenseStatement).text())
                    .col(ColumnDef::new(Packages::DeclaredLicenseExpression).text())
                    .col(ColumnDef::new(Packages::Copyright).text())
                    .col(ColumnDef::new(Packages::Keywords).json().not_null())
                    .col(
                        ColumnDef::new(Packages::MiningLevel)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Packages::History).json().not_null())
                    .col(
                        ColumnDef::new(Packages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Packages::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_packages_download_url")
                    .table(Packages::Table)
                    .col(Packages::DownloadUrl)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PackageParties::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PackageParties::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PackageParties::PackageId).uuid().not_null())
                    .col(ColumnDef::new(PackageParties::Role).string())
                    .col(ColumnDef::new(PackageParties::Name).string())
                    .col(ColumnDef::new(PackageParties::Email).string())
                    .col(ColumnDef::new(PackageParties::Url).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_package_parties_package")
                            .from(PackageParties::Table, PackageParties::PackageId)
                            .to(Packages::Table, Packages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PackageDependencies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PackageDependencies::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PackageDependencies::PackageId).uuid().not_null())
                    .col(ColumnDef::new(PackageDependencies::Purl).text().not_null())
                    .col(ColumnDef::new(PackageDependencies::ExtractedRequirement).string())
                    .col(ColumnDef::new(PackageDependencies::Scope).string())
                    .col(
                        ColumnDef::new(PackageDependencies::IsRuntime)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(PackageDependencies::IsOptional)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_package_dependencies_package")
                            .from(PackageDependencies::Table, PackageDependencies::PackageId)
                            .to(Packages::Table, Packages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_package_parties_package_id")
                    .table(PackageParties::Table)
                    .col(PackageParties::PackageId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_package_dependencies_package_id")
                    .table(PackageDependencies::Table)
                    .col(PackageDependencies::PackageId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PackageDependencies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PackageParties::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Packages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Packages {
    Table,
    Id,
    PackageType,
    Namespace,
    Name,
    Version,
    Qualifiers,
    Subpath,
    DownloadUrl,
    Filename,
    Size,
    Md5,
    Sha1,
    Sha256,
    Sha512,
    ReleaseDate,
    HomepageUrl,
    VcsUrl,
    Description,
    ExtractedLicenseStatement,
    DeclaredLicenseExpression,
    Copyright,
    Keywords,
    MiningLevel,
    History,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PackageParties {
    Table,
    Id,
    PackageId,
    Role,
    Name,
    Email,
    Url,
}

#[derive(DeriveIden)]
enum PackageDependencies {
    Table,
    Id,
    PackageId,
    Purl,
    ExtractedRequirement,
    Scope,
    IsRuntime,
    IsOptional,
}
