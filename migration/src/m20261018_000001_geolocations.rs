//! 地理位置查询历史表
//!
//! 每次上游查询成功后追加一行，按 ip / timestamp 查询历史：
//! - ip 索引（单 IP 历史）
//! - timestamp 索引（全局时间范围查询）
//! - (ip, timestamp) 复合索引（单 IP 时间范围查询、最新记录）

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Geolocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Geolocations::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Geolocations::Ip).string_len(255).not_null())
                    .col(ColumnDef::new(Geolocations::City).string_len(255).null())
                    .col(ColumnDef::new(Geolocations::Region).string_len(255).null())
                    .col(
                        ColumnDef::new(Geolocations::CountryName)
                            .string_len(255)
                            .null(),
                    )
                    .col(ColumnDef::new(Geolocations::Postal).string_len(64).null())
                    .col(ColumnDef::new(Geolocations::Latitude).string_len(64).null())
                    .col(ColumnDef::new(Geolocations::Longitude).string_len(64).null())
                    .col(ColumnDef::new(Geolocations::Timezone).string_len(128).null())
                    .col(
                        ColumnDef::new(Geolocations::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_geolocations_ip")
                    .table(Geolocations::Table)
                    .col(Geolocations::Ip)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_geolocations_timestamp")
                    .table(Geolocations::Table)
                    .col(Geolocations::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_geolocations_ip_timestamp")
                    .table(Geolocations::Table)
                    .col(Geolocations::Ip)
                    .col(Geolocations::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_geolocations_ip_timestamp")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_geolocations_timestamp").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_geolocations_ip").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Geolocations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Geolocations {
    #[sea_orm(iden = "geolocations")]
    Table,
    Id,
    Ip,
    City,
    Region,
    CountryName,
    Postal,
    Latitude,
    Longitude,
    Timezone,
    Timestamp,
}
