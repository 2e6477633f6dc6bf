//! Business services. Each mutating operation runs as one transaction and
//! publishes its events only after the commit.

pub mod batches;
pub mod box_ledger;
pub mod codes;
pub mod costing;
pub mod dispatch;
pub mod farms;
pub mod harvest;
pub mod inspections;
pub mod inventory;

use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;
use validator::ValidationError;

use crate::entities::user::{self, UserRole};
use crate::errors::ServiceError;

/// Looks up the acting user. Unknown or deactivated users cannot act.
pub(crate) async fn resolve_caller<C: ConnectionTrait>(
    conn: &C,
    caller_id: Uuid,
) -> Result<user::Model, ServiceError> {
    let caller = user::Entity::find_by_id(caller_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("User", "id", caller_id))?;

    if !caller.is_active {
        return Err(ServiceError::Forbidden(format!(
            "User {} is deactivated",
            caller.id
        )));
    }
    Ok(caller)
}

/// Looks up the acting user and rejects them unless `allowed` accepts their role.
pub(crate) async fn authorize<C: ConnectionTrait>(
    conn: &C,
    caller_id: Uuid,
    allowed: fn(UserRole) -> bool,
    action: &str,
) -> Result<user::Model, ServiceError> {
    let caller = resolve_caller(conn, caller_id).await?;
    if !allowed(caller.role) {
        return Err(ServiceError::Forbidden(format!(
            "Role {} cannot {}",
            caller.role, action
        )));
    }
    Ok(caller)
}

pub(crate) fn validate_money(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("amount must not be negative".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn stock_handling_roles() {
        assert!(UserRole::StoreKeeper.handles_stock());
        assert!(UserRole::Manager.handles_stock());
        assert!(!UserRole::StoreKeeper.is_elevated());
        assert!(!UserRole::Vendor.handles_stock());
        assert!(!UserRole::Supervisor.handles_stock());
    }

    #[test]
    fn money_must_not_be_negative() {
        assert!(validate_money(&dec!(0)).is_ok());
        assert!(validate_money(&dec!(12.50)).is_ok());
        assert!(validate_money(&dec!(-0.01)).is_err());
    }
}
