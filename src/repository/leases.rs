//! Lease and activity persistence. All lease writes take a `PgConnection`
//! so the service can span lease + unit + tenant + activity in a single
//! transaction; reads go straight to the pool.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::AppResult;
use crate::repository::map_db_error;
use crate::schemas::LeaseInput;

#[derive(Debug, Clone, FromRow)]
pub struct LeaseRow {
    pub id: Uuid,
    pub landlord_id: Uuid,
    pub tenant_id: Uuid,
    pub unit_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: f64,
    pub security_deposit: f64,
    pub payment_frequency: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Lease joined with the display names the DTO carries.
#[derive(Debug, Clone, FromRow)]
pub struct LeaseJoinedRow {
    pub id: Uuid,
    pub landlord_id: Uuid,
    pub tenant_id: Uuid,
    pub unit_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: f64,
    pub security_deposit: f64,
    pub payment_frequency: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tenant_first_name: String,
    pub tenant_last_name: String,
    pub tenant_email: String,
    pub unit_number: String,
    pub property_id: Uuid,
    pub property_name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    pub id: Uuid,
    pub lease_id: Uuid,
    pub old_status: String,
    pub new_status: String,
    pub changed_at: DateTime<Utc>,
    pub changed_by_user_id: Uuid,
}

const LEASE_COLUMNS: &str = "\
l.id, l.landlord_id, l.tenant_id, l.unit_id, l.start_date, l.end_date, \
l.monthly_rent::float8 AS monthly_rent, \
l.security_deposit::float8 AS security_deposit, \
l.payment_frequency, l.status, l.notes, l.created_at";

const LEASE_JOIN_SELECT: &str = "\
SELECT l.id, l.landlord_id, l.tenant_id, l.unit_id, l.start_date, l.end_date, \
l.monthly_rent::float8 AS monthly_rent, \
l.security_deposit::float8 AS security_deposit, \
l.payment_frequency, l.status, l.notes, l.created_at, \
t.first_name AS tenant_first_name, t.last_name AS tenant_last_name, \
t.email AS tenant_email, \
u.unit_number, u.property_id, p.name AS property_name \
FROM leases l \
JOIN tenants t ON t.id = l.tenant_id \
JOIN units u ON u.id = l.unit_id \
JOIN properties p ON p.id = u.property_id";

pub async fn get_lease(
    pool: &PgPool,
    lease_id: Uuid,
    landlord_id: Uuid,
) -> AppResult<Option<LeaseRow>> {
    sqlx::query_as::<_, LeaseRow>(&format!(
        "SELECT {LEASE_COLUMNS} FROM leases l WHERE l.id = $1 AND l.landlord_id = $2"
    ))
    .bind(lease_id)
    .bind(landlord_id)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)
}

pub async fn lease_owned(pool: &PgPool, lease_id: Uuid, landlord_id: Uuid) -> AppResult<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM leases WHERE id = $1 AND landlord_id = $2)",
    )
    .bind(lease_id)
    .bind(landlord_id)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn get_lease_joined(
    pool: &PgPool,
    lease_id: Uuid,
    landlord_id: Uuid,
) -> AppResult<Option<LeaseJoinedRow>> {
    sqlx::query_as::<_, LeaseJoinedRow>(&format!(
        "{LEASE_JOIN_SELECT} WHERE l.id = $1 AND l.landlord_id = $2"
    ))
    .bind(lease_id)
    .bind(landlord_id)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)
}

/// Builds the filtered list query. Factored out so the predicate SQL can be
/// asserted without a live database.
fn build_list_query(
    landlord_id: Uuid,
    search: Option<&str>,
    status: Option<&str>,
    today: NaiveDate,
    limit: i64,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(LEASE_JOIN_SELECT);
    query.push(" WHERE l.landlord_id = ").push_bind(landlord_id);

    if let Some(status) = status.map(str::trim).filter(|value| !value.is_empty()) {
        match status {
            // Month-to-Month is derived, so the filter re-derives it from
            // the stored columns instead of matching a stored literal.
            "Month-to-Month" => {
                query
                    .push(" AND l.status = 'Active' AND l.end_date < ")
                    .push_bind(today);
            }
            "Active" => {
                query
                    .push(" AND l.status = 'Active' AND l.end_date >= ")
                    .push_bind(today);
            }
            other => {
                query.push(" AND l.status = ").push_bind(other.to_string());
            }
        }
    }

    if let Some(term) = search.map(str::trim).filter(|value| !value.is_empty()) {
        let pattern = format!("%{term}%");
        query
            .push(" AND (t.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.unit_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    // The id tiebreak keeps repeated reads stable under equal timestamps.
    query
        .push(" ORDER BY l.created_at DESC, l.id DESC LIMIT ")
        .push_bind(limit);
    query
}

pub async fn list_leases(
    pool: &PgPool,
    landlord_id: Uuid,
    search: Option<&str>,
    status: Option<&str>,
    today: NaiveDate,
    limit: i64,
) -> AppResult<Vec<LeaseJoinedRow>> {
    build_list_query(landlord_id, search, status, today, limit)
        .build_query_as::<LeaseJoinedRow>()
        .fetch_all(pool)
        .await
        .map_err(map_db_error)
}

pub async fn insert_lease_tx(
    conn: &mut PgConnection,
    landlord_id: Uuid,
    input: &LeaseInput,
    status: &str,
) -> AppResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO leases (landlord_id, tenant_id, unit_id, start_date, end_date, \
         monthly_rent, security_deposit, payment_frequency, status, notes) \
         VALUES ($1, $2, $3, $4, $5, ($6)::numeric, ($7)::numeric, $8, $9, $10) \
         RETURNING id",
    )
    .bind(landlord_id)
    .bind(input.tenant_id)
    .bind(input.unit_id)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.monthly_rent)
    .bind(input.security_deposit)
    .bind(&input.payment_frequency)
    .bind(status)
    .bind(&input.notes)
    .fetch_one(conn)
    .await
    .map_err(map_db_error)
}

/// Full replace of the editable fields. Status is deliberately absent; only
/// a status change writes it.
pub async fn update_lease_tx(
    conn: &mut PgConnection,
    lease_id: Uuid,
    input: &LeaseInput,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE leases SET tenant_id = $2, unit_id = $3, start_date = $4, end_date = $5, \
         monthly_rent = ($6)::numeric, security_deposit = ($7)::numeric, \
         payment_frequency = $8, notes = $9 \
         WHERE id = $1",
    )
    .bind(lease_id)
    .bind(input.tenant_id)
    .bind(input.unit_id)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.monthly_rent)
    .bind(input.security_deposit)
    .bind(&input.payment_frequency)
    .bind(&input.notes)
    .execute(conn)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

pub async fn set_status_tx(
    conn: &mut PgConnection,
    lease_id: Uuid,
    status: &str,
) -> AppResult<()> {
    sqlx::query("UPDATE leases SET status = $2 WHERE id = $1")
        .bind(lease_id)
        .bind(status)
        .execute(conn)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

/// Payments and activities go with the lease via FK cascade.
pub async fn delete_lease_tx(conn: &mut PgConnection, lease_id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM leases WHERE id = $1")
        .bind(lease_id)
        .execute(conn)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

/// Whether an Active lease other than `exclude_lease` references the unit.
pub async fn unit_has_other_active_lease_tx(
    conn: &mut PgConnection,
    unit_id: Uuid,
    exclude_lease: Option<Uuid>,
) -> AppResult<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM leases
            WHERE unit_id = $1 AND status = 'Active'
              AND ($2::uuid IS NULL OR id <> $2)
        )",
    )
    .bind(unit_id)
    .bind(exclude_lease)
    .fetch_one(conn)
    .await
    .map_err(map_db_error)
}

pub async fn insert_activity_tx(
    conn: &mut PgConnection,
    lease_id: Uuid,
    old_status: &str,
    new_status: &str,
    changed_by_user_id: Uuid,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO lease_activities (lease_id, old_status, new_status, changed_by_user_id) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(lease_id)
    .bind(old_status)
    .bind(new_status)
    .bind(changed_by_user_id)
    .execute(conn)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

/// Activities for a batch of leases, newest first.
pub async fn list_activities(pool: &PgPool, lease_ids: &[Uuid]) -> AppResult<Vec<ActivityRow>> {
    if lease_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, ActivityRow>(
        "SELECT id, lease_id, old_status, new_status, changed_at, changed_by_user_id \
         FROM lease_activities \
         WHERE lease_id = ANY($1) \
         ORDER BY changed_at DESC, id DESC",
    )
    .bind(lease_ids)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::build_list_query;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).expect("valid date")
    }

    #[test]
    fn month_to_month_filter_rederives_from_stored_columns() {
        let mut query = build_list_query(Uuid::nil(), None, Some("Month-to-Month"), today(), 100);
        let sql = query.sql();
        assert!(
            sql.contains("l.status = 'Active' AND l.end_date < "),
            "got: {sql}"
        );
    }

    #[test]
    fn active_filter_excludes_past_end_dates() {
        let mut query = build_list_query(Uuid::nil(), None, Some("Active"), today(), 100);
        let sql = query.sql();
        assert!(
            sql.contains("l.status = 'Active' AND l.end_date >= "),
            "got: {sql}"
        );
    }

    #[test]
    fn other_status_values_match_literally() {
        let mut query = build_list_query(Uuid::nil(), None, Some("Terminated"), today(), 100);
        let sql = query.sql();
        assert!(sql.contains(" AND l.status = $"), "got: {sql}");
        assert!(!sql.contains("l.end_date <"), "got: {sql}");
        assert!(!sql.contains("l.end_date >="), "got: {sql}");
    }

    #[test]
    fn search_matches_names_unit_and_property() {
        let mut query = build_list_query(Uuid::nil(), Some("smith"), None, today(), 100);
        let sql = query.sql();
        assert!(sql.contains("t.first_name ILIKE "), "got: {sql}");
        assert!(sql.contains("t.last_name ILIKE "), "got: {sql}");
        assert!(sql.contains("u.unit_number ILIKE "), "got: {sql}");
        assert!(sql.contains("p.name ILIKE "), "got: {sql}");
    }

    #[test]
    fn blank_filters_are_ignored_and_order_is_stable() {
        let mut query = build_list_query(Uuid::nil(), Some("   "), Some(""), today(), 100);
        let sql = query.sql();
        assert!(!sql.contains("ILIKE"), "got: {sql}");
        assert!(sql.contains("ORDER BY l.created_at DESC, l.id DESC"), "got: {sql}");
    }
}
