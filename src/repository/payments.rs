//! Payment persistence and the per-landlord-per-day receipt counter.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::AppResult;
use crate::repository::map_db_error;
use crate::schemas::PaymentInput;

/// Payment joined with the lease's tenant/unit/property display fields.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentJoinedRow {
    pub id: Uuid,
    pub lease_id: Uuid,
    pub tenant_id: Uuid,
    pub tenant_first_name: String,
    pub tenant_last_name: String,
    pub unit_id: Uuid,
    pub unit_number: String,
    pub property_name: String,
    pub amount_paid: f64,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub status: String,
    pub period_month: i32,
    pub period_year: i32,
    pub late_fee: f64,
    pub notes: Option<String>,
    pub receipt_number: String,
    pub created_at: DateTime<Utc>,
}

const PAYMENT_JOIN_SELECT: &str = "\
SELECT py.id, py.lease_id, l.tenant_id, \
t.first_name AS tenant_first_name, t.last_name AS tenant_last_name, \
l.unit_id, u.unit_number, p.name AS property_name, \
py.amount_paid::float8 AS amount_paid, py.payment_date, py.payment_method, \
py.status, py.period_month, py.period_year, \
py.late_fee::float8 AS late_fee, py.notes, py.receipt_number, py.created_at \
FROM payments py \
JOIN leases l ON l.id = py.lease_id \
JOIN tenants t ON t.id = l.tenant_id \
JOIN units u ON u.id = l.unit_id \
JOIN properties p ON p.id = u.property_id";

pub async fn get_payment_joined(
    pool: &PgPool,
    payment_id: Uuid,
    landlord_id: Uuid,
) -> AppResult<Option<PaymentJoinedRow>> {
    sqlx::query_as::<_, PaymentJoinedRow>(&format!(
        "{PAYMENT_JOIN_SELECT} WHERE py.id = $1 AND py.landlord_id = $2"
    ))
    .bind(payment_id)
    .bind(landlord_id)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)
}

fn build_list_query(
    landlord_id: Uuid,
    lease_id: Option<Uuid>,
    status: Option<&str>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    limit: i64,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(PAYMENT_JOIN_SELECT);
    query.push(" WHERE py.landlord_id = ").push_bind(landlord_id);

    if let Some(lease_id) = lease_id {
        query.push(" AND py.lease_id = ").push_bind(lease_id);
    }
    if let Some(status) = status.map(str::trim).filter(|value| !value.is_empty()) {
        query.push(" AND py.status = ").push_bind(status.to_string());
    }
    // Date range is inclusive on both ends.
    if let Some(from) = from {
        query.push(" AND py.payment_date >= ").push_bind(from);
    }
    if let Some(to) = to {
        query.push(" AND py.payment_date <= ").push_bind(to);
    }

    query
        .push(" ORDER BY py.payment_date DESC, py.created_at DESC LIMIT ")
        .push_bind(limit);
    query
}

pub async fn list_payments(
    pool: &PgPool,
    landlord_id: Uuid,
    lease_id: Option<Uuid>,
    status: Option<&str>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    limit: i64,
) -> AppResult<Vec<PaymentJoinedRow>> {
    build_list_query(landlord_id, lease_id, status, from, to, limit)
        .build_query_as::<PaymentJoinedRow>()
        .fetch_all(pool)
        .await
        .map_err(map_db_error)
}

/// Allocates the next daily sequence for a landlord. The UPSERT is a single
/// atomic statement, so two concurrent payments cannot draw the same number.
pub async fn next_receipt_seq_tx(
    conn: &mut PgConnection,
    landlord_id: Uuid,
    receipt_date: NaiveDate,
) -> AppResult<i64> {
    sqlx::query_scalar::<_, i32>(
        "INSERT INTO receipt_counters (landlord_id, receipt_date, last_seq) \
         VALUES ($1, $2, 1) \
         ON CONFLICT (landlord_id, receipt_date) \
         DO UPDATE SET last_seq = receipt_counters.last_seq + 1 \
         RETURNING last_seq",
    )
    .bind(landlord_id)
    .bind(receipt_date)
    .fetch_one(conn)
    .await
    .map(i64::from)
    .map_err(map_db_error)
}

pub async fn insert_payment_tx(
    conn: &mut PgConnection,
    landlord_id: Uuid,
    input: &PaymentInput,
    receipt_number: &str,
) -> AppResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO payments (lease_id, landlord_id, amount_paid, payment_date, \
         payment_method, status, period_month, period_year, late_fee, notes, receipt_number) \
         VALUES ($1, $2, ($3)::numeric, $4, $5, $6, $7, $8, ($9)::numeric, $10, $11) \
         RETURNING id",
    )
    .bind(input.lease_id)
    .bind(landlord_id)
    .bind(input.amount_paid)
    .bind(input.payment_date)
    .bind(&input.payment_method)
    .bind(&input.status)
    .bind(input.period_month)
    .bind(input.period_year)
    .bind(input.late_fee)
    .bind(&input.notes)
    .fetch_one(conn)
    .await
    .map_err(map_db_error)
}

/// Updates everything except `receipt_number`, which is fixed at creation.
/// Returns false when no owned payment matched.
pub async fn update_payment(
    pool: &PgPool,
    payment_id: Uuid,
    landlord_id: Uuid,
    input: &PaymentInput,
) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE payments SET lease_id = $3, amount_paid = ($4)::numeric, payment_date = $5, \
         payment_method = $6, status = $7, period_month = $8, period_year = $9, \
         late_fee = ($10)::numeric, notes = $11 \
         WHERE id = $1 AND landlord_id = $2",
    )
    .bind(payment_id)
    .bind(landlord_id)
    .bind(input.lease_id)
    .bind(input.amount_paid)
    .bind(input.payment_date)
    .bind(&input.payment_method)
    .bind(&input.status)
    .bind(input.period_month)
    .bind(input.period_year)
    .bind(input.late_fee)
    .bind(&input.notes)
    .execute(pool)
    .await
    .map_err(map_db_error)?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_payment(
    pool: &PgPool,
    payment_id: Uuid,
    landlord_id: Uuid,
) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM payments WHERE id = $1 AND landlord_id = $2")
        .bind(payment_id)
        .bind(landlord_id)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::build_list_query;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn list_query_applies_all_filters() {
        let mut query = build_list_query(
            Uuid::nil(),
            Some(Uuid::nil()),
            Some("Paid"),
            Some(date(2026, 1, 1)),
            Some(date(2026, 1, 31)),
            100,
        );
        let sql = query.sql();
        assert!(sql.contains("py.lease_id = "), "got: {sql}");
        assert!(sql.contains("py.status = "), "got: {sql}");
        assert!(sql.contains("py.payment_date >= "), "got: {sql}");
        assert!(sql.contains("py.payment_date <= "), "got: {sql}");
        assert!(
            sql.contains("ORDER BY py.payment_date DESC, py.created_at DESC"),
            "got: {sql}"
        );
    }

    #[test]
    fn unfiltered_list_only_scopes_by_landlord() {
        let mut query = build_list_query(Uuid::nil(), None, None, None, None, 100);
        let sql = query.sql();
        assert!(sql.contains("py.landlord_id = "), "got: {sql}");
        assert!(!sql.contains("py.lease_id = "), "got: {sql}");
        assert!(!sql.contains("py.status = "), "got: {sql}");
        assert!(!sql.contains("payment_date >="), "got: {sql}");
    }
}
