use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, 500)
}

fn default_limit_100() -> i64 {
    100
}

fn default_frequency_monthly() -> String {
    "Monthly".to_string()
}

fn default_method_e_transfer() -> String {
    "E-Transfer".to_string()
}

fn default_payment_status_pending() -> String {
    "Pending".to_string()
}

fn default_late_fee_zero() -> f64 {
    0.0
}

// ---------------------------------------------------------------------------
// Lease inputs
// ---------------------------------------------------------------------------

/// Body of both `POST /leases` and `PUT /leases/{id}` (full replace; status
/// is never part of it).
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LeaseInput {
    pub tenant_id: Uuid,
    pub unit_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 0.0))]
    pub monthly_rent: f64,
    #[validate(range(min = 0.0))]
    pub security_deposit: f64,
    #[serde(default = "default_frequency_monthly")]
    #[validate(length(min = 1, max = 50))]
    pub payment_frequency: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeLeaseStatusInput {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeasesQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    #[serde(default = "default_limit_100")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeasePath {
    pub lease_id: Uuid,
}

// ---------------------------------------------------------------------------
// Payment inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PaymentInput {
    pub lease_id: Uuid,
    #[validate(range(min = 0.0))]
    pub amount_paid: f64,
    pub payment_date: NaiveDate,
    #[serde(default = "default_method_e_transfer")]
    #[validate(length(min = 1, max = 50))]
    pub payment_method: String,
    #[serde(default = "default_payment_status_pending")]
    pub status: String,
    #[validate(range(min = 1, max = 12))]
    pub period_month: i32,
    #[validate(range(min = 2000, max = 2100))]
    pub period_year: i32,
    #[serde(default = "default_late_fee_zero")]
    #[validate(range(min = 0.0))]
    pub late_fee: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsQuery {
    pub lease_id: Option<Uuid>,
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(default = "default_limit_100")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentPath {
    pub payment_id: Uuid,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

/// Lease as the API returns it: `status` is the *effective* status and the
/// joined tenant/unit/property names are resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct LeaseDto {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tenant_first_name: String,
    pub tenant_last_name: String,
    pub tenant_email: String,
    pub unit_id: Uuid,
    pub unit_number: String,
    pub property_id: Uuid,
    pub property_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: f64,
    pub security_deposit: f64,
    pub payment_frequency: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub activities: Vec<LeaseActivityDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaseActivityDto {
    pub id: Uuid,
    pub old_status: String,
    pub new_status: String,
    pub changed_at: DateTime<Utc>,
    pub changed_by_user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentDto {
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

#[cfg(test)]
mod tests {
    use super::{clamp_limit, validate_input, LeaseInput, PaymentInput};

    #[test]
    fn lease_input_defaults_payment_frequency() {
        let input: LeaseInput = serde_json::from_value(serde_json::json!({
            "tenant_id": "550e8400-e29b-41d4-a716-446655440000",
            "unit_id": "550e8400-e29b-41d4-a716-446655440001",
            "start_date": "2026-01-01",
            "end_date": "2026-12-31",
            "monthly_rent": 1500.0,
            "security_deposit": 1500.0
        }))
        .expect("valid lease input");
        assert_eq!(input.payment_frequency, "Monthly");
        assert!(input.notes.is_none());
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn negative_rent_fails_validation() {
        let input: LeaseInput = serde_json::from_value(serde_json::json!({
            "tenant_id": "550e8400-e29b-41d4-a716-446655440000",
            "unit_id": "550e8400-e29b-41d4-a716-446655440001",
            "start_date": "2026-01-01",
            "end_date": "2026-12-31",
            "monthly_rent": -10.0,
            "security_deposit": 0.0
        }))
        .expect("deserializes");
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn payment_input_defaults_and_period_bounds() {
        let input: PaymentInput = serde_json::from_value(serde_json::json!({
            "lease_id": "550e8400-e29b-41d4-a716-446655440000",
            "amount_paid": 1500.0,
            "payment_date": "2026-02-01",
            "period_month": 2,
            "period_year": 2026
        }))
        .expect("valid payment input");
        assert_eq!(input.payment_method, "E-Transfer");
        assert_eq!(input.status, "Pending");
        assert_eq!(input.late_fee, 0.0);
        assert!(validate_input(&input).is_ok());

        let out_of_range = PaymentInput {
            period_month: 13,
            ..input
        };
        assert!(validate_input(&out_of_range).is_err());
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(100), 100);
        assert_eq!(clamp_limit(10_000), 500);
    }
}
