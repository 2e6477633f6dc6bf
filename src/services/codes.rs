//! Human-readable document numbers: `BATCH-20240301-0001`, `GP-20240301-0042`.
//!
//! The sequence starts at one more than the number of rows already in the
//! table and skips codes that are already taken. Two writers can still compute
//! the same code; the unique constraint on the code column turns that into
//! `ServiceError::DuplicateCode`, and the caller's unit of work is retried
//! with a fresh count.

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

use crate::errors::ServiceError;

pub const BATCH_PREFIX: &str = "BATCH";
pub const GATE_PASS_PREFIX: &str = "GP";

pub fn format_code(prefix: &str, date: NaiveDate, sequence: u64) -> String {
    format!("{}-{}-{:04}", prefix, date.format("%Y%m%d"), sequence)
}

/// Next free code for entity `E`, whose codes live in `column`.
pub async fn next_code<E, C>(
    conn: &C,
    column: E::Column,
    prefix: &str,
    date: NaiveDate,
) -> Result<String, ServiceError>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let mut sequence = E::find().count(conn).await.map_err(ServiceError::db_error)? + 1;
    loop {
        let code = format_code(prefix, date, sequence);
        let taken = E::find()
            .filter(column.eq(code.as_str()))
            .count(conn)
            .await
            .map_err(ServiceError::db_error)?;
        if taken == 0 {
            return Ok(code);
        }
        sequence += 1;
    }
}
