//! Scoped lookups on the collaborator-owned tenant/unit/property rows, plus
//! the two occupancy fields this engine owns: `units.status` and
//! `tenants.unit_id`. Occupancy writes only ever happen inside a lease
//! transaction, so all mutating functions take a `PgConnection`.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::UnitStatus;
use crate::error::AppResult;
use crate::repository::map_db_error;

pub async fn tenant_owned(pool: &PgPool, tenant_id: Uuid, landlord_id: Uuid) -> AppResult<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM tenants WHERE id = $1 AND landlord_id = $2)",
    )
    .bind(tenant_id)
    .bind(landlord_id)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

/// Units are owned through their property.
pub async fn unit_owned(pool: &PgPool, unit_id: Uuid, landlord_id: Uuid) -> AppResult<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM units u
            JOIN properties p ON p.id = u.property_id
            WHERE u.id = $1 AND p.landlord_id = $2
        )",
    )
    .bind(unit_id)
    .bind(landlord_id)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn set_unit_status_tx(
    conn: &mut PgConnection,
    unit_id: Uuid,
    status: UnitStatus,
) -> AppResult<()> {
    sqlx::query("UPDATE units SET status = $2 WHERE id = $1")
        .bind(unit_id)
        .bind(status.as_str())
        .execute(conn)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

pub async fn assign_tenant_unit_tx(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    unit_id: Uuid,
) -> AppResult<()> {
    sqlx::query("UPDATE tenants SET unit_id = $2 WHERE id = $1")
        .bind(tenant_id)
        .bind(unit_id)
        .execute(conn)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

/// Clears the tenant's unit pointer only when it still points at `unit_id`,
/// so a pointer that already moved to another lease is left alone.
pub async fn clear_tenant_unit_if_matches_tx(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    unit_id: Uuid,
) -> AppResult<()> {
    sqlx::query("UPDATE tenants SET unit_id = NULL WHERE id = $1 AND unit_id = $2")
        .bind(tenant_id)
        .bind(unit_id)
        .execute(conn)
        .await
        .map_err(map_db_error)?;
    Ok(())
}
