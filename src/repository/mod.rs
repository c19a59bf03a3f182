pub mod leases;
pub mod parties;
pub mod payments;

use crate::error::AppError;

pub(crate) fn map_db_error(error: sqlx::Error) -> AppError {
    let message = error.to_string();
    tracing::error!(db_error = %message, "Database query failed");

    // The partial unique index on (unit_id) WHERE status = 'Active' backs
    // the same rule as the in-transaction pre-check; a violation that slips
    // past the pre-check surfaces the same message.
    if message.contains("ux_leases_unit_id_active") {
        return AppError::BadRequest("This unit already has an active lease.".to_string());
    }
    if message.contains("23505")
        || message
            .to_ascii_lowercase()
            .contains("duplicate key value violates unique constraint")
    {
        return AppError::Conflict("Duplicate value violates a unique constraint.".to_string());
    }
    AppError::Dependency("Database operation failed.".to_string())
}
