//! Payment recorder: appends payments against owned leases and allocates
//! per-landlord daily receipt numbers. Never touches lease or occupancy
//! state, and never blocks on lease status.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{receipt_number, PaymentStatus};
use crate::error::{AppError, AppResult};
use crate::repository::leases::lease_owned;
use crate::repository::payments::{
    delete_payment as delete_payment_row, get_payment_joined, insert_payment_tx, list_payments,
    next_receipt_seq_tx, update_payment as update_payment_row, PaymentJoinedRow,
};
use crate::schemas::{PaymentDto, PaymentInput};

pub async fn get_payments(
    pool: &PgPool,
    landlord_id: Uuid,
    lease_id: Option<Uuid>,
    status: Option<&str>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    limit: i64,
) -> AppResult<Vec<PaymentDto>> {
    let rows = list_payments(pool, landlord_id, lease_id, status, from, to, limit).await?;
    Ok(rows.into_iter().map(to_dto).collect())
}

pub async fn get_payment(pool: &PgPool, payment_id: Uuid, landlord_id: Uuid) -> AppResult<PaymentDto> {
    get_payment_joined(pool, payment_id, landlord_id)
        .await?
        .map(to_dto)
        .ok_or_else(|| AppError::NotFound("Payment not found.".to_string()))
}

/// An unowned lease yields an empty list, not an error.
pub async fn get_payments_by_lease(
    pool: &PgPool,
    lease_id: Uuid,
    landlord_id: Uuid,
) -> AppResult<Vec<PaymentDto>> {
    if !lease_owned(pool, lease_id, landlord_id).await? {
        return Ok(Vec::new());
    }
    get_payments(pool, landlord_id, Some(lease_id), None, None, None, 500).await
}

/// Records a payment regardless of lease status. The receipt number is drawn
/// from the counter inside the same transaction as the insert.
pub async fn create_payment(
    pool: &PgPool,
    landlord_id: Uuid,
    input: &PaymentInput,
) -> AppResult<PaymentDto> {
    assert_known_status(&input.status)?;
    assert_lease_owned(pool, input.lease_id, landlord_id).await?;

    let today = Utc::now().date_naive();

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::Dependency(format!("txn begin: {e}")))?;
    let seq = next_receipt_seq_tx(&mut tx, landlord_id, today).await?;
    let receipt = receipt_number(today, seq);
    let payment_id = insert_payment_tx(&mut tx, landlord_id, input, &receipt).await?;
    tx.commit()
        .await
        .map_err(|e| AppError::Dependency(format!("txn commit: {e}")))?;

    tracing::info!(
        payment_id = %payment_id,
        landlord_id = %landlord_id,
        receipt_number = %receipt,
        "Payment recorded"
    );
    get_payment(pool, payment_id, landlord_id).await
}

/// Replaces everything except the receipt number.
pub async fn update_payment(
    pool: &PgPool,
    payment_id: Uuid,
    landlord_id: Uuid,
    input: &PaymentInput,
) -> AppResult<PaymentDto> {
    assert_known_status(&input.status)?;
    assert_lease_owned(pool, input.lease_id, landlord_id).await?;

    if !update_payment_row(pool, payment_id, landlord_id, input).await? {
        return Err(AppError::NotFound("Payment not found.".to_string()));
    }
    get_payment(pool, payment_id, landlord_id).await
}

pub async fn delete_payment(pool: &PgPool, payment_id: Uuid, landlord_id: Uuid) -> AppResult<()> {
    if !delete_payment_row(pool, payment_id, landlord_id).await? {
        return Err(AppError::NotFound("Payment not found.".to_string()));
    }
    tracing::info!(payment_id = %payment_id, landlord_id = %landlord_id, "Payment deleted");
    Ok(())
}

async fn assert_lease_owned(pool: &PgPool, lease_id: Uuid, landlord_id: Uuid) -> AppResult<()> {
    if !lease_owned(pool, lease_id, landlord_id).await? {
        return Err(AppError::BadRequest(
            "Lease not found or not owned by you.".to_string(),
        ));
    }
    Ok(())
}

fn assert_known_status(raw: &str) -> AppResult<()> {
    PaymentStatus::parse(raw).map(|_| ()).ok_or_else(|| {
        AppError::UnprocessableEntity(format!("Unknown payment status '{}'.", raw.trim()))
    })
}

fn to_dto(row: PaymentJoinedRow) -> PaymentDto {
    PaymentDto {
        id: row.id,
        lease_id: row.lease_id,
        tenant_id: row.tenant_id,
        tenant_first_name: row.tenant_first_name,
        tenant_last_name: row.tenant_last_name,
        unit_id: row.unit_id,
        unit_number: row.unit_number,
        property_name: row.property_name,
        amount_paid: row.amount_paid,
        payment_date: row.payment_date,
        payment_method: row.payment_method,
        status: row.status,
        period_month: row.period_month,
        period_year: row.period_year,
        late_fee: row.late_fee,
        notes: row.notes,
        receipt_number: row.receipt_number,
        created_at: row.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::assert_known_status;
    use crate::error::AppError;

    #[test]
    fn write_statuses_are_a_closed_set() {
        for status in ["Paid", "Partial", "Late", "Pending"] {
            assert!(assert_known_status(status).is_ok(), "{status}");
        }
        assert!(matches!(
            assert_known_status("Overdue"),
            Err(AppError::UnprocessableEntity(_))
        ));
    }
}
