//! HTTP handlers. They extract and deserialize, then hand over to the
//! services; no business rule lives here.

pub mod batches;
pub mod common;
pub mod costs;
pub mod farms;
pub mod gate_passes;
pub mod harvest;
pub mod health;
pub mod inspections;
pub mod inventory;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    batches::BatchService, costing::CostService, dispatch::DispatchService, farms::FarmService,
    harvest::HarvestService, inspections::InspectionService, inventory::InventoryService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer used by the HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub batches: Arc<BatchService>,
    pub harvest: Arc<HarvestService>,
    pub dispatch: Arc<DispatchService>,
    pub costs: Arc<CostService>,
    pub farms: Arc<FarmService>,
    pub inspections: Arc<InspectionService>,
    pub inventory: Arc<InventoryService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, max_retries: u32) -> Self {
        Self {
            batches: Arc::new(BatchService::new(
                db_pool.clone(),
                event_sender.clone(),
                max_retries,
            )),
            harvest: Arc::new(HarvestService::new(
                db_pool.clone(),
                event_sender.clone(),
                max_retries,
            )),
            dispatch: Arc::new(DispatchService::new(
                db_pool.clone(),
                event_sender.clone(),
                max_retries,
            )),
            costs: Arc::new(CostService::new(
                db_pool.clone(),
                event_sender.clone(),
                max_retries,
            )),
            farms: Arc::new(FarmService::new(db_pool.clone())),
            inspections: Arc::new(InspectionService::new(
                db_pool.clone(),
                event_sender.clone(),
                max_retries,
            )),
            inventory: Arc::new(InventoryService::new(db_pool, event_sender, max_retries)),
        }
    }
}
