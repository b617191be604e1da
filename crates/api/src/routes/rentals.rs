//! Rental endpoints: booking, lookup, cancel and finish.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CarId, RentalId};
use saga::{BookingIntent, BookingView, RentalView};
use serde::Deserialize;

use crate::AppState;
use crate::auth::BearerToken;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCarRequest {
    pub car_uid: CarId,
    pub date_from: String,
    pub date_to: String,
}

fn rental_uid(path: Result<Path<RentalId>, PathRejection>) -> Result<RentalId, ApiError> {
    let Path(rental_uid) = path.map_err(|e| {
        ApiError::BadRequest(format!("invalid rental uid: {}", e.body_text()))
    })?;
    Ok(rental_uid)
}

/// POST /api/v1/rental — books a car for the given period.
#[tracing::instrument(skip(state, token, payload))]
pub async fn book(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    payload: Result<Json<BookCarRequest>, JsonRejection>,
) -> Result<Json<BookingView>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        ApiError::BadRequest(format!("cannot unmarshal request body: {}", e.body_text()))
    })?;

    let view = state
        .coordinator
        .book_car(BookingIntent {
            car_uid: req.car_uid,
            date_from: req.date_from,
            date_to: req.date_to,
            credentials: token.credentials(),
        })
        .await?;
    Ok(Json(view))
}

/// GET /api/v1/rental — the caller's rentals.
#[tracing::instrument(skip(state, token))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
) -> Result<Json<Vec<RentalView>>, ApiError> {
    let views = state.coordinator.list_rentals(&token.credentials()).await?;
    Ok(Json(views))
}

/// GET /api/v1/rental/{rentalUid}
#[tracing::instrument(skip(state, token))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    path: Result<Path<RentalId>, PathRejection>,
) -> Result<Json<RentalView>, ApiError> {
    let view = state
        .coordinator
        .get_rental(rental_uid(path)?, &token.credentials())
        .await?;
    Ok(Json(view))
}

/// DELETE /api/v1/rental/{rentalUid} — cancels the rental.
#[tracing::instrument(skip(state, token))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    path: Result<Path<RentalId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    state
        .coordinator
        .cancel_rental(rental_uid(path)?, &token.credentials())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/rental/{rentalUid}/finish — finishes the rental.
#[tracing::instrument(skip(state, token))]
pub async fn finish(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    path: Result<Path<RentalId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    state
        .coordinator
        .finish_rental(rental_uid(path)?, &token.credentials())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
