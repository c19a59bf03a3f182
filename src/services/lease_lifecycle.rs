//! The lease lifecycle engine: create/update/delete, status transitions and
//! their occupancy side effects. Every mutation spans lease + unit + tenant +
//! activity in one transaction, so a failure leaves nothing half-applied.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    effective_status, plan_reassignment, plan_status_change, EffectiveStatus, LeaseStatus,
    UnitStatus, CREATION_SENTINEL,
};
use crate::error::{AppError, AppResult};
use crate::repository::leases::{
    delete_lease_tx, get_lease, get_lease_joined, insert_activity_tx, insert_lease_tx,
    list_activities, list_leases as list_lease_rows, set_status_tx,
    unit_has_other_active_lease_tx, update_lease_tx, ActivityRow, LeaseJoinedRow,
};
use crate::repository::parties::{
    assign_tenant_unit_tx, clear_tenant_unit_if_matches_tx, set_unit_status_tx, tenant_owned,
    unit_owned,
};
use crate::schemas::{LeaseActivityDto, LeaseDto, LeaseInput};

pub async fn list_leases(
    pool: &PgPool,
    landlord_id: Uuid,
    search: Option<&str>,
    status: Option<&str>,
    limit: i64,
) -> AppResult<Vec<LeaseDto>> {
    let today = Utc::now().date_naive();
    let rows = list_lease_rows(pool, landlord_id, search, status, today, limit).await?;

    let lease_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut by_lease: HashMap<Uuid, Vec<ActivityRow>> = HashMap::new();
    for activity in list_activities(pool, &lease_ids).await? {
        by_lease.entry(activity.lease_id).or_default().push(activity);
    }

    rows.into_iter()
        .map(|row| {
            let activities = by_lease.remove(&row.id).unwrap_or_default();
            to_dto(row, activities)
        })
        .collect()
}

pub async fn get_lease_dto(pool: &PgPool, lease_id: Uuid, landlord_id: Uuid) -> AppResult<LeaseDto> {
    let row = get_lease_joined(pool, lease_id, landlord_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lease not found.".to_string()))?;
    let activities = list_activities(pool, &[row.id]).await?;
    to_dto(row, activities)
}

/// New leases always start Pending; the creation activity lands in the same
/// transaction as the lease row.
pub async fn create_lease(
    pool: &PgPool,
    landlord_id: Uuid,
    input: &LeaseInput,
) -> AppResult<LeaseDto> {
    assert_parties_owned(pool, landlord_id, input).await?;

    let mut tx = begin(pool).await?;
    let lease_id = insert_lease_tx(&mut tx, landlord_id, input, LeaseStatus::Pending.as_str()).await?;
    insert_activity_tx(
        &mut tx,
        lease_id,
        CREATION_SENTINEL,
        LeaseStatus::Pending.as_str(),
        landlord_id,
    )
    .await?;
    commit(tx).await?;

    tracing::info!(lease_id = %lease_id, landlord_id = %landlord_id, "Lease created");
    get_lease_dto(pool, lease_id, landlord_id).await
}

/// Full replace of the editable fields. Status never changes here; when the
/// lease is Active, occupancy migrates with the tenant/unit reassignment.
pub async fn update_lease(
    pool: &PgPool,
    lease_id: Uuid,
    landlord_id: Uuid,
    input: &LeaseInput,
) -> AppResult<LeaseDto> {
    let lease = get_lease(pool, lease_id, landlord_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lease not found.".to_string()))?;
    assert_parties_owned(pool, landlord_id, input).await?;

    let is_active = lease.status == LeaseStatus::Active.as_str();
    let unit_changed = lease.unit_id != input.unit_id;
    let tenant_changed = lease.tenant_id != input.tenant_id;

    let mut tx = begin(pool).await?;

    if is_active && unit_changed {
        let new_unit_taken =
            unit_has_other_active_lease_tx(&mut tx, input.unit_id, Some(lease_id)).await?;
        if new_unit_taken {
            return Err(AppError::BadRequest(
                "The new unit already has an active lease.".to_string(),
            ));
        }
    }
    let old_unit_shared = if is_active && unit_changed {
        unit_has_other_active_lease_tx(&mut tx, lease.unit_id, Some(lease_id)).await?
    } else {
        false
    };

    let plan = plan_reassignment(is_active, unit_changed, tenant_changed, old_unit_shared);
    if plan.release_old_unit {
        set_unit_status_tx(&mut tx, lease.unit_id, UnitStatus::Available).await?;
    }
    if plan.clear_old_tenant {
        clear_tenant_unit_if_matches_tx(&mut tx, lease.tenant_id, lease.unit_id).await?;
    }
    if plan.occupy_new_unit {
        set_unit_status_tx(&mut tx, input.unit_id, UnitStatus::Occupied).await?;
    }
    if plan.assign_new_tenant {
        assign_tenant_unit_tx(&mut tx, input.tenant_id, input.unit_id).await?;
    }

    update_lease_tx(&mut tx, lease_id, input).await?;
    commit(tx).await?;

    tracing::info!(lease_id = %lease_id, landlord_id = %landlord_id, "Lease updated");
    get_lease_dto(pool, lease_id, landlord_id).await
}

/// Removes the lease and its payments/activities; an Active lease first
/// hands back its occupancy.
pub async fn delete_lease(pool: &PgPool, lease_id: Uuid, landlord_id: Uuid) -> AppResult<()> {
    let lease = get_lease(pool, lease_id, landlord_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lease not found.".to_string()))?;

    let mut tx = begin(pool).await?;

    if lease.status == LeaseStatus::Active.as_str() {
        let unit_shared = unit_has_other_active_lease_tx(&mut tx, lease.unit_id, Some(lease_id)).await?;
        let plan = plan_status_change(LeaseStatus::Terminated, unit_shared);
        if plan.release_unit {
            set_unit_status_tx(&mut tx, lease.unit_id, UnitStatus::Available).await?;
        }
        if plan.clear_tenant {
            clear_tenant_unit_if_matches_tx(&mut tx, lease.tenant_id, lease.unit_id).await?;
        }
    }

    delete_lease_tx(&mut tx, lease_id).await?;
    commit(tx).await?;

    tracing::info!(lease_id = %lease_id, landlord_id = %landlord_id, "Lease deleted");
    Ok(())
}

/// Transitions are keyed off the *effective* status, so an expired Active
/// lease terminates as Month-to-Month and records that in its activity.
pub async fn change_status(
    pool: &PgPool,
    lease_id: Uuid,
    landlord_id: Uuid,
    requested: &str,
) -> AppResult<LeaseDto> {
    let lease = get_lease(pool, lease_id, landlord_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lease not found.".to_string()))?;

    let current = parse_stored_status(lease.id, &lease.status)?;
    let from = effective_status(current, lease.end_date, Utc::now().date_naive());

    let target = LeaseStatus::parse(requested)
        .filter(|target| from.allows(*target))
        .ok_or_else(|| invalid_transition(from, requested))?;

    let mut tx = begin(pool).await?;

    let unit_shared = unit_has_other_active_lease_tx(&mut tx, lease.unit_id, Some(lease_id)).await?;
    if target == LeaseStatus::Active && unit_shared {
        return Err(AppError::BadRequest(
            "This unit already has an active lease.".to_string(),
        ));
    }

    set_status_tx(&mut tx, lease_id, target.as_str()).await?;

    let plan = plan_status_change(target, unit_shared);
    if plan.occupy_unit {
        set_unit_status_tx(&mut tx, lease.unit_id, UnitStatus::Occupied).await?;
    }
    if plan.assign_tenant {
        assign_tenant_unit_tx(&mut tx, lease.tenant_id, lease.unit_id).await?;
    }
    if plan.release_unit {
        set_unit_status_tx(&mut tx, lease.unit_id, UnitStatus::Available).await?;
    }
    if plan.clear_tenant {
        clear_tenant_unit_if_matches_tx(&mut tx, lease.tenant_id, lease.unit_id).await?;
    }

    insert_activity_tx(&mut tx, lease_id, from.as_str(), target.as_str(), landlord_id).await?;
    commit(tx).await?;

    tracing::info!(
        lease_id = %lease_id,
        landlord_id = %landlord_id,
        from = from.as_str(),
        to = target.as_str(),
        "Lease status changed"
    );
    get_lease_dto(pool, lease_id, landlord_id).await
}

async fn assert_parties_owned(
    pool: &PgPool,
    landlord_id: Uuid,
    input: &LeaseInput,
) -> AppResult<()> {
    if !tenant_owned(pool, input.tenant_id, landlord_id).await? {
        return Err(AppError::BadRequest(
            "Tenant not found or not owned by you.".to_string(),
        ));
    }
    if !unit_owned(pool, input.unit_id, landlord_id).await? {
        return Err(AppError::BadRequest(
            "Unit not found or not owned by you.".to_string(),
        ));
    }
    Ok(())
}

fn invalid_transition(from: EffectiveStatus, requested: &str) -> AppError {
    AppError::BadRequest(format!(
        "Cannot change status from '{}' to '{}'.",
        from.as_str(),
        requested.trim()
    ))
}

fn parse_stored_status(lease_id: Uuid, raw: &str) -> AppResult<LeaseStatus> {
    LeaseStatus::parse(raw)
        .ok_or_else(|| AppError::Internal(format!("Lease {lease_id} has unknown status '{raw}'")))
}

fn to_dto(row: LeaseJoinedRow, activities: Vec<ActivityRow>) -> AppResult<LeaseDto> {
    let stored = parse_stored_status(row.id, &row.status)?;
    let status = effective_status(stored, row.end_date, Utc::now().date_naive());

    Ok(LeaseDto {
        id: row.id,
        tenant_id: row.tenant_id,
        tenant_first_name: row.tenant_first_name,
        tenant_last_name: row.tenant_last_name,
        tenant_email: row.tenant_email,
        unit_id: row.unit_id,
        unit_number: row.unit_number,
        property_id: row.property_id,
        property_name: row.property_name,
        start_date: row.start_date,
        end_date: row.end_date,
        monthly_rent: row.monthly_rent,
        security_deposit: row.security_deposit,
        payment_frequency: row.payment_frequency,
        status: status.as_str().to_string(),
        notes: row.notes,
        created_at: row.created_at,
        activities: activities
            .into_iter()
            .map(|activity| LeaseActivityDto {
                id: activity.id,
                old_status: activity.old_status,
                new_status: activity.new_status,
                changed_at: activity.changed_at,
                changed_by_user_id: activity.changed_by_user_id,
            })
            .collect(),
    })
}

async fn begin(pool: &PgPool) -> AppResult<sqlx::Transaction<'_, sqlx::Postgres>> {
    pool.begin()
        .await
        .map_err(|e| AppError::Dependency(format!("txn begin: {e}")))
}

async fn commit(tx: sqlx::Transaction<'_, sqlx::Postgres>) -> AppResult<()> {
    tx.commit()
        .await
        .map_err(|e| AppError::Dependency(format!("txn commit: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use super::{invalid_transition, parse_stored_status, to_dto};
    use crate::domain::EffectiveStatus;
    use crate::error::AppError;
    use crate::repository::leases::{ActivityRow, LeaseJoinedRow};

    fn joined_row(status: &str, end_date: NaiveDate) -> LeaseJoinedRow {
        LeaseJoinedRow {
            id: Uuid::new_v4(),
            landlord_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            unit_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("date"),
            end_date,
            monthly_rent: 1500.0,
            security_deposit: 1500.0,
            payment_frequency: "Monthly".to_string(),
            status: status.to_string(),
            notes: None,
            created_at: Utc::now(),
            tenant_first_name: "Ana".to_string(),
            tenant_last_name: "Silva".to_string(),
            tenant_email: "ana@example.com".to_string(),
            unit_number: "10B".to_string(),
            property_id: Uuid::new_v4(),
            property_name: "Edificio Centro".to_string(),
        }
    }

    #[test]
    fn dto_reports_month_to_month_past_end_date() {
        let yesterday = Utc::now().date_naive().pred_opt().expect("date");
        let dto = to_dto(joined_row("Active", yesterday), Vec::new()).expect("dto");
        assert_eq!(dto.status, "Month-to-Month");

        let tomorrow = Utc::now().date_naive().succ_opt().expect("date");
        let dto = to_dto(joined_row("Active", tomorrow), Vec::new()).expect("dto");
        assert_eq!(dto.status, "Active");
    }

    #[test]
    fn dto_keeps_activity_order_and_fields() {
        let lease = joined_row("Pending", NaiveDate::from_ymd_opt(2026, 12, 31).expect("date"));
        let activity = ActivityRow {
            id: Uuid::new_v4(),
            lease_id: lease.id,
            old_status: "—".to_string(),
            new_status: "Pending".to_string(),
            changed_at: Utc::now(),
            changed_by_user_id: lease.landlord_id,
        };
        let dto = to_dto(lease, vec![activity.clone()]).expect("dto");
        assert_eq!(dto.activities.len(), 1);
        assert_eq!(dto.activities[0].old_status, "—");
        assert_eq!(dto.activities[0].new_status, "Pending");
        assert_eq!(dto.activities[0].id, activity.id);
    }

    #[test]
    fn unknown_stored_status_is_an_internal_error() {
        assert!(matches!(
            parse_stored_status(Uuid::nil(), "Cancelled"),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn invalid_transition_message_names_both_states() {
        let error = invalid_transition(EffectiveStatus::MonthToMonth, "Pending");
        let AppError::BadRequest(message) = error else {
            panic!("expected BadRequest");
        };
        assert_eq!(
            message,
            "Cannot change status from 'Month-to-Month' to 'Pending'."
        );
    }
}
