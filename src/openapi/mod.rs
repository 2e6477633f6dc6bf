use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Harvest API",
        version = "0.1.0",
        description = r#"
# Harvest batch lifecycle and box accounting

Tracks banana export batches from farm inspection through harvest, dispatch and
delivery, and keeps a per-box cost snapshot for every batch.

## Caller identity

Mutating endpoints act on behalf of the user named in the `X-User-Id` header.
Vendors may only change the status of their own batches. Farms, inspection
decisions, transport costs, catalogue items and material allocations are for
admins and managers. Store keepers may also receive stock and sign for gate
passes.

## Errors

Every failure returns the same body:

```json
{
  "error": "Bad Request",
  "code": "HARVEST_CAPACITY_EXCEEDED",
  "message": "Limit exceeded. Only 40 boxes remaining for harvest in this batch.",
  "request_id": "6f1c...",
  "timestamp": "2024-03-01T10:00:00Z"
}
```

`409 CONCURRENT_MODIFICATION` and `409 DUPLICATE_CODE` are safe to retry.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "batches", description = "Batch lookup and status changes"),
        (name = "harvest", description = "Daily harvest reports"),
        (name = "gate-passes", description = "Dispatch and receipt of gate passes"),
        (name = "costs", description = "Cost snapshot and transport costs"),
        (name = "farms", description = "Farm registry"),
        (name = "inspections", description = "Farm inspections and batch creation"),
        (name = "inventory", description = "Material items, stock and batch allocations")
    ),
    paths(
        crate::handlers::batches::get_batch,
        crate::handlers::batches::get_batch_by_code,
        crate::handlers::batches::update_batch_status,

        crate::handlers::harvest::submit_daily_report,
        crate::handlers::harvest::list_batch_reports,
        crate::handlers::harvest::reports_on,

        crate::handlers::gate_passes::create_gate_pass,
        crate::handlers::gate_passes::receive_gate_pass,
        crate::handlers::gate_passes::get_gate_pass,
        crate::handlers::gate_passes::list_batch_gate_passes,
        crate::handlers::gate_passes::list_pending_gate_passes,
        crate::handlers::gate_passes::gate_passes_on,

        crate::handlers::costs::get_batch_cost,
        crate::handlers::costs::get_batch_cost_by_code,
        crate::handlers::costs::recalculate_costs,
        crate::handlers::costs::add_transport_cost,
        crate::handlers::costs::list_transport_costs,

        crate::handlers::farms::create_farm,
        crate::handlers::farms::list_farms,
        crate::handlers::farms::get_farm,

        crate::handlers::inspections::submit_inspection,
        crate::handlers::inspections::decide_inspection,
        crate::handlers::inspections::list_pending_inspections,
        crate::handlers::inspections::get_inspection,

        crate::handlers::inventory::create_item,
        crate::handlers::inventory::list_items,
        crate::handlers::inventory::get_item,
        crate::handlers::inventory::add_stock,
        crate::handlers::inventory::allocate_to_batch,
        crate::handlers::inventory::list_batch_allocations,
    ),
    components(
        schemas(
            crate::entities::BatchStatus,
            crate::entities::FarmStatus,
            crate::entities::InspectionStatus,
            crate::entities::UserRole,
            crate::entities::ItemCategory,
            crate::entities::PaymentStatus,
            crate::entities::TransportType,
            crate::services::batches::BatchView,
            crate::services::costing::BatchCostView,
            crate::services::inspections::InspectionDecision,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_the_batch_endpoints() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Harvest API"));
        assert!(json.contains("/api/v1/batches/{id}/status"));
        assert!(json.contains("/api/v1/batches/{id}/gate-passes"));
        assert!(json.contains("/api/v1/inspections/{id}/decision"));
        assert!(json.contains("/api/v1/farms"));
    }
}
