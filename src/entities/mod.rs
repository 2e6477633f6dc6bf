//! Database entities for the harvest, dispatch and costing tables.

pub mod batch;
pub mod batch_cost;
pub mod daily_harvest_report;
pub mod farm;
pub mod farm_inspection;
pub mod gate_pass;
pub mod inventory_allocation;
pub mod inventory_item;
pub mod inventory_stock;
pub mod labor_cost;
pub mod transport_cost;
pub mod user;

pub use batch::BatchStatus;
pub use farm::FarmStatus;
pub use farm_inspection::InspectionStatus;
pub use inventory_item::ItemCategory;
pub use labor_cost::PaymentStatus;
pub use transport_cost::TransportType;
pub use user::UserRole;
