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
    schemas::{
        clamp_limit, validate_input, ChangeLeaseStatusInput, LeaseInput, LeasePath, LeasesQuery,
    },
    services::{lease_lifecycle, payments},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/leases",
            axum::routing::get(list_leases).post(create_lease),
        )
        .route(
            "/leases/{lease_id}",
            axum::routing::get(get_lease)
                .put(update_lease)
                .delete(delete_lease),
        )
        .route(
            "/leases/{lease_id}/status",
            axum::routing::post(change_lease_status),
        )
        .route(
            "/leases/{lease_id}/payments",
            axum::routing::get(list_lease_payments),
        )
}

async fn list_leases(
    State(state): State<AppState>,
    Query(query): Query<LeasesQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = db_pool(&state)?;

    let leases = lease_lifecycle::list_leases(
        pool,
        landlord_id,
        query.search.as_deref(),
        query.status.as_deref(),
        clamp_limit(query.limit),
    )
    .await?;

    Ok(Json(json!({ "data": leases })))
}

async fn get_lease(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = db_pool(&state)?;

    let lease = lease_lifecycle::get_lease_dto(pool, path.lease_id, landlord_id).await?;
    Ok(Json(lease))
}

async fn create_lease(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LeaseInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = db_pool(&state)?;

    let lease = lease_lifecycle::create_lease(pool, landlord_id, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(lease)))
}

async fn update_lease(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
    headers: HeaderMap,
    Json(payload): Json<LeaseInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = db_pool(&state)?;

    let lease = lease_lifecycle::update_lease(pool, path.lease_id, landlord_id, &payload).await?;
    Ok(Json(lease))
}

async fn delete_lease(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = db_pool(&state)?;

    lease_lifecycle::delete_lease(pool, path.lease_id, landlord_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn change_lease_status(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
    headers: HeaderMap,
    Json(payload): Json<ChangeLeaseStatusInput>,
) -> AppResult<impl IntoResponse> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = db_pool(&state)?;

    let lease =
        lease_lifecycle::change_status(pool, path.lease_id, landlord_id, &payload.status).await?;
    Ok(Json(lease))
}

async fn list_lease_payments(
    State(state): State<AppState>,
    Path(path): Path<LeasePath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = db_pool(&state)?;

    let rows = payments::get_payments_by_lease(pool, path.lease_id, landlord_id).await?;
    Ok(Json(json!({ "data": rows })))
}

fn db_pool(state: &AppState) -> AppResult<&sqlx::PgPool> {
    state.db_pool.as_ref().ok_or_else(|| {
        AppError::Dependency("Database is not configured. Set DATABASE_URL.".to_string())
    })
}
