use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_and_farms::Migration),
            Box::new(m20240101_000002_create_batches::Migration),
            Box::new(m20240101_000003_create_harvest_and_dispatch::Migration),
            Box::new(m20240101_000004_create_inventory::Migration),
            Box::new(m20240101_000005_create_cost_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_users_and_farms {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_and_farms"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Users::FullName).string().not_null())
                        .col(
                            ColumnDef::new(Users::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Role).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Farms::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Farms::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Farms::FarmerName).string().not_null())
                        .col(ColumnDef::new(Farms::Location).string().null())
                        .col(ColumnDef::new(Farms::ProduceType).string().null())
                        .col(ColumnDef::new(Farms::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Farms::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Farms::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FarmInspections::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FarmInspections::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(FarmInspections::FarmId).uuid().not_null())
                        .col(ColumnDef::new(FarmInspections::VendorId).uuid().not_null())
                        .col(
                            ColumnDef::new(FarmInspections::EstimatedBoxes)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FarmInspections::Notes).text().null())
                        .col(
                            ColumnDef::new(FarmInspections::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(FarmInspections::ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(FarmInspections::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(FarmInspections::RejectionReason).text().null())
                        .col(
                            ColumnDef::new(FarmInspections::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_farm_inspections_farm_id")
                                .from(FarmInspections::Table, FarmInspections::FarmId)
                                .to(Farms::Table, Farms::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_farm_inspections_vendor_id")
                                .from(FarmInspections::Table, FarmInspections::VendorId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_farm_inspections_status")
                        .table(FarmInspections::Table)
                        .col(FarmInspections::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FarmInspections::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Farms::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        FullName,
        Email,
        Role,
        IsActive,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Farms {
        Table,
        Id,
        FarmerName,
        Location,
        ProduceType,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum FarmInspections {
        Table,
        Id,
        FarmId,
        VendorId,
        EstimatedBoxes,
        Notes,
        Status,
        ApprovedBy,
        ApprovedAt,
        RejectionReason,
        CreatedAt,
    }
}

mod m20240101_000002_create_batches {
    use super::m20240101_000001_create_users_and_farms::{Farms, Users};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_batches"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Counter columns stay nullable: rows imported from the legacy
            // schema predate the dispatch counters.
            manager
                .create_table(
                    Table::create()
                        .table(Batches::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Batches::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Batches::BatchCode)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Batches::InspectionId).uuid().null())
                        .col(ColumnDef::new(Batches::FarmId).uuid().not_null())
                        .col(ColumnDef::new(Batches::VendorId).uuid().not_null())
                        .col(ColumnDef::new(Batches::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(Batches::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Batches::EstimatedBoxes).integer().not_null())
                        .col(ColumnDef::new(Batches::AllocatedBoxes).integer().null())
                        .col(ColumnDef::new(Batches::HarvestedBoxes).integer().null())
                        .col(ColumnDef::new(Batches::RemainingBoxes).integer().null())
                        .col(ColumnDef::new(Batches::ActualBoxes).integer().null())
                        .col(ColumnDef::new(Batches::DispatchedBoxes).integer().null())
                        .col(ColumnDef::new(Batches::GatePassRemaining).integer().null())
                        .col(ColumnDef::new(Batches::StartDate).date().null())
                        .col(ColumnDef::new(Batches::EndDate).date().null())
                        .col(ColumnDef::new(Batches::Notes).text().null())
                        .col(
                            ColumnDef::new(Batches::Version)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Batches::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Batches::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_batches_farm_id")
                                .from(Batches::Table, Batches::FarmId)
                                .to(Farms::Table, Farms::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_batches_vendor_id")
                                .from(Batches::Table, Batches::VendorId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batches_vendor_id")
                        .table(Batches::Table)
                        .col(Batches::VendorId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batches_status")
                        .table(Batches::Table)
                        .col(Batches::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Batches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Batches {
        Table,
        Id,
        BatchCode,
        InspectionId,
        FarmId,
        VendorId,
        CreatedBy,
        Status,
        EstimatedBoxes,
        AllocatedBoxes,
        HarvestedBoxes,
        RemainingBoxes,
        ActualBoxes,
        DispatchedBoxes,
        GatePassRemaining,
        StartDate,
        EndDate,
        Notes,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_harvest_and_dispatch {
    use super::m20240101_000002_create_batches::Batches;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_harvest_and_dispatch"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DailyHarvestReports::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DailyHarvestReports::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DailyHarvestReports::BatchId).uuid().not_null())
                        .col(
                            ColumnDef::new(DailyHarvestReports::ReportDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DailyHarvestReports::BoxesPacked)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DailyHarvestReports::BoxesWasted)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyHarvestReports::LaborCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(DailyHarvestReports::Notes).text().null())
                        .col(
                            ColumnDef::new(DailyHarvestReports::CreatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DailyHarvestReports::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_daily_harvest_reports_batch_id")
                                .from(DailyHarvestReports::Table, DailyHarvestReports::BatchId)
                                .to(Batches::Table, Batches::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_daily_harvest_reports_batch_id")
                        .table(DailyHarvestReports::Table)
                        .col(DailyHarvestReports::BatchId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(GatePasses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(GatePasses::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(GatePasses::GatePassNo)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(GatePasses::BatchId).uuid().not_null())
                        .col(ColumnDef::new(GatePasses::TruckNumber).string().not_null())
                        .col(ColumnDef::new(GatePasses::DriverName).string().not_null())
                        .col(ColumnDef::new(GatePasses::DriverPhone).string().null())
                        .col(ColumnDef::new(GatePasses::TotalBoxes).integer().not_null())
                        .col(ColumnDef::new(GatePasses::DispatchDate).date().not_null())
                        .col(ColumnDef::new(GatePasses::Notes).text().null())
                        .col(ColumnDef::new(GatePasses::ReceivedBoxes).integer().null())
                        .col(
                            ColumnDef::new(GatePasses::ReceivedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(GatePasses::ReceivedBy).uuid().null())
                        .col(ColumnDef::new(GatePasses::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(GatePasses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_gate_passes_batch_id")
                                .from(GatePasses::Table, GatePasses::BatchId)
                                .to(Batches::Table, Batches::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_gate_passes_batch_id")
                        .table(GatePasses::Table)
                        .col(GatePasses::BatchId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(GatePasses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DailyHarvestReports::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum DailyHarvestReports {
        Table,
        Id,
        BatchId,
        ReportDate,
        BoxesPacked,
        BoxesWasted,
        LaborCount,
        Notes,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum GatePasses {
        Table,
        Id,
        GatePassNo,
        BatchId,
        TruckNumber,
        DriverName,
        DriverPhone,
        TotalBoxes,
        DispatchDate,
        Notes,
        ReceivedBoxes,
        ReceivedAt,
        ReceivedBy,
        CreatedBy,
        CreatedAt,
    }
}

mod m20240101_000004_create_inventory {
    use super::m20240101_000002_create_batches::Batches;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_inventory"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::ItemCode)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(InventoryItems::ItemName).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::Category)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::UnitOfMeasure)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::UnitCost)
                                .decimal_len(16, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryStocks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryStocks::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(InventoryStocks::ItemId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(InventoryStocks::TotalQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryStocks::AvailableQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryStocks::ReservedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryStocks::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_stocks_item_id")
                                .from(InventoryStocks::Table, InventoryStocks::ItemId)
                                .to(InventoryItems::Table, InventoryItems::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryAllocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryAllocations::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(InventoryAllocations::BatchId).uuid().not_null())
                        .col(ColumnDef::new(InventoryAllocations::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(InventoryAllocations::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryAllocations::Notes).text().null())
                        .col(
                            ColumnDef::new(InventoryAllocations::AllocatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAllocations::AllocatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_allocations_batch_id")
                                .from(InventoryAllocations::Table, InventoryAllocations::BatchId)
                                .to(Batches::Table, Batches::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_allocations_item_id")
                                .from(InventoryAllocations::Table, InventoryAllocations::ItemId)
                                .to(InventoryItems::Table, InventoryItems::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_allocations_batch_id")
                        .table(InventoryAllocations::Table)
                        .col(InventoryAllocations::BatchId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryAllocations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryStocks::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryItems {
        Table,
        Id,
        ItemCode,
        ItemName,
        Category,
        UnitOfMeasure,
        UnitCost,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum InventoryStocks {
        Table,
        Id,
        ItemId,
        TotalQuantity,
        AvailableQuantity,
        ReservedQuantity,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum InventoryAllocations {
        Table,
        Id,
        BatchId,
        ItemId,
        Quantity,
        Notes,
        AllocatedBy,
        AllocatedAt,
    }
}

mod m20240101_000005_create_cost_tables {
    use super::m20240101_000002_create_batches::Batches;
    use super::m20240101_000003_create_harvest_and_dispatch::DailyHarvestReports;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_cost_tables"
        }
    }

    fn money(col: impl IntoIden) -> ColumnDef {
        ColumnDef::new(col)
            .decimal_len(16, 2)
            .not_null()
            .default(0)
            .to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TransportCosts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransportCosts::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(TransportCosts::BatchId).uuid().not_null())
                        .col(
                            ColumnDef::new(TransportCosts::CostType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(money(TransportCosts::TotalCost))
                        .col(money(TransportCosts::CostPerBox))
                        .col(ColumnDef::new(TransportCosts::VendorName).string().null())
                        .col(ColumnDef::new(TransportCosts::VehicleNumber).string().null())
                        .col(ColumnDef::new(TransportCosts::DriverName).string().null())
                        .col(
                            ColumnDef::new(TransportCosts::DistanceKm)
                                .decimal_len(10, 2)
                                .null(),
                        )
                        .col(ColumnDef::new(TransportCosts::Notes).text().null())
                        .col(ColumnDef::new(TransportCosts::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(TransportCosts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transport_costs_batch_id")
                                .from(TransportCosts::Table, TransportCosts::BatchId)
                                .to(Batches::Table, Batches::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LaborCosts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(LaborCosts::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(LaborCosts::BatchId).uuid().not_null())
                        .col(ColumnDef::new(LaborCosts::ReportId).uuid().null())
                        .col(money(LaborCosts::TotalAmount))
                        .col(money(LaborCosts::CostPerBox))
                        .col(
                            ColumnDef::new(LaborCosts::PaymentStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(LaborCosts::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(LaborCosts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_labor_costs_batch_id")
                                .from(LaborCosts::Table, LaborCosts::BatchId)
                                .to(Batches::Table, Batches::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_labor_costs_report_id")
                                .from(LaborCosts::Table, LaborCosts::ReportId)
                                .to(DailyHarvestReports::Table, DailyHarvestReports::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BatchCosts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(BatchCosts::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(BatchCosts::BatchId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(money(BatchCosts::MaterialCostTotal))
                        .col(money(BatchCosts::LaborCostTotal))
                        .col(money(BatchCosts::InwardTransportCost))
                        .col(money(BatchCosts::OutwardTransportCost))
                        .col(money(BatchCosts::MaterialCostPerBox))
                        .col(money(BatchCosts::LaborCostPerBox))
                        .col(money(BatchCosts::InwardTransportPerBox))
                        .col(money(BatchCosts::OutwardTransportPerBox))
                        .col(money(BatchCosts::TotalCost))
                        .col(money(BatchCosts::FinalCostPerBox))
                        .col(
                            ColumnDef::new(BatchCosts::BoxCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(BatchCosts::CalculatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_batch_costs_batch_id")
                                .from(BatchCosts::Table, BatchCosts::BatchId)
                                .to(Batches::Table, Batches::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BatchCosts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(LaborCosts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TransportCosts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum TransportCosts {
        Table,
        Id,
        BatchId,
        CostType,
        TotalCost,
        CostPerBox,
        VendorName,
        VehicleNumber,
        DriverName,
        DistanceKm,
        Notes,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum LaborCosts {
        Table,
        Id,
        BatchId,
        ReportId,
        TotalAmount,
        CostPerBox,
        PaymentStatus,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum BatchCosts {
        Table,
        Id,
        BatchId,
        MaterialCostTotal,
        LaborCostTotal,
        InwardTransportCost,
        OutwardTransportCost,
        MaterialCostPerBox,
        LaborCostPerBox,
        InwardTransportPerBox,
        OutwardTransportPerBox,
        TotalCost,
        FinalCostPerBox,
        BoxCount,
        CalculatedAt,
    }
}
