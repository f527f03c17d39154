use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // targets
        manager
            .create_table(
                Table::create()
                    .table(Target::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Target::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Target::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Target::Url).string().null())
                    .col(
                        ColumnDef::new(Target::ScanStatus)
                            .string()
                            .not_null()
                            .default("idle"),
                    )
                    .col(
                        ColumnDef::new(Target::IsScheduled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Target::WaitingMinutes)
                            .integer()
                            .not_null()
                            .default(60),
                    )
                    .col(ColumnDef::new(Target::NextRunTime).string().null())
                    .col(ColumnDef::new(Target::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Target::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_targets_due")
                    .table(Target::Table)
                    .col(Target::IsScheduled)
                    .col(Target::NextRunTime)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // subdomains
        manager
            .create_table(
                Table::create()
                    .table(Subdomain::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subdomain::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subdomain::TargetId).big_integer().not_null())
                    .col(ColumnDef::new(Subdomain::Url).string().not_null())
                    .col(ColumnDef::new(Subdomain::Title).string().not_null().default(""))
                    .col(
                        ColumnDef::new(Subdomain::Status)
                            .string()
                            .not_null()
                            .default("unknown"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Subdomain::Table, Subdomain::TargetId)
                            .to(Target::Table, Target::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subdomains_target_url")
                    .table(Subdomain::Table)
                    .col(Subdomain::TargetId)
                    .col(Subdomain::Url)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // scan_runs
        manager
            .create_table(
                Table::create()
                    .table(ScanRun::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScanRun::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScanRun::TargetId).big_integer().not_null())
                    .col(ColumnDef::new(ScanRun::TriggeredBy).string().not_null())
                    .col(ColumnDef::new(ScanRun::Status).string().not_null())
                    .col(ColumnDef::new(ScanRun::QueuedAt).string().not_null())
                    .col(ColumnDef::new(ScanRun::StartedAt).string().null())
                    .col(ColumnDef::new(ScanRun::FinishedAt).string().null())
                    .col(ColumnDef::new(ScanRun::Error).string().null())
                    .col(
                        ColumnDef::new(ScanRun::DiscoveredCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ScanRun::Table, ScanRun::TargetId)
                            .to(Target::Table, Target::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scan_runs_status")
                    .table(ScanRun::Table)
                    .col(ScanRun::Status)
                    .col(ScanRun::TargetId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScanRun::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subdomain::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Target::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Target {
    #[sea_orm(iden = "targets")]
    Table,
    Id,
    Name,
    Url,
    ScanStatus,
    IsScheduled,
    WaitingMinutes,
    NextRunTime,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Subdomain {
    #[sea_orm(iden = "subdomains")]
    Table,
    Id,
    TargetId,
    Url,
    Title,
    Status,
}

#[derive(DeriveIden)]
enum ScanRun {
    #[sea_orm(iden = "scan_runs")]
    Table,
    Id,
    TargetId,
    TriggeredBy,
    Status,
    QueuedAt,
    StartedAt,
    FinishedAt,
    Error,
    DiscoveredCount,
}
