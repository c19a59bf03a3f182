use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::{
    auth::require_landlord,
    error::{AppError, AppResult},
    schemas::{clamp_limit, validate_input, PaymentInput, PaymentPath, PaymentsQuery},
    services::payments,
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/payments",
            axum::routing::get(list_payments).post(create_payment),
        )
        .route(
            "/payments/{payment_id}",
            axum::routing::get(get_payment)
                .put(update_payment)
                .delete(delete_payment),
        )
}

async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = db_pool(&state)?;

    let rows = payments::get_payments(
        pool,
        landlord_id,
        query.lease_id,
        query.status.as_deref(),
        query.from,
        query.to,
        clamp_limit(query.limit),
    )
    .await?;

    Ok(Json(json!({ "data": rows })))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = db_pool(&state)?;

    let payment = payments::get_payment(pool, path.payment_id, landlord_id).await?;
    Ok(Json(payment))
}

async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PaymentInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = db_pool(&state)?;

    let payment = payments::create_payment(pool, landlord_id, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(payment)))
}

async fn update_payment(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
    headers: HeaderMap,
    Json(payload): Json<PaymentInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = db_pool(&state)?;

    let payment = payments::update_payment(pool, path.payment_id, landlord_id, &payload).await?;
    Ok(Json(payment))
}

async fn delete_payment(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = db_pool(&state)?;

    payments::delete_payment(pool, path.payment_id, landlord_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

fn db_pool(state: &AppState) -> AppResult<&sqlx::PgPool> {
    state.db_pool.as_ref().ok_or_else(|| {
        AppError::Dependency("Database is not configured. Set DATABASE_URL.".to_string())
    })
}
