//! Car catalogue endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use common::CarPage;
use serde::Deserialize;

use crate::AppState;
use crate::auth::BearerToken;
use crate::error::ApiError;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCarsParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub show_all: Option<bool>,
}

/// GET /api/v1/cars — pages are 1-based.
#[tracing::instrument(skip(state, token))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    token: BearerToken,
    Query(params): Query<ListCarsParams>,
) -> Result<Json<CarPage>, ApiError> {
    let page = state
        .coordinator
        .list_cars(
            params.page.unwrap_or(DEFAULT_PAGE),
            params.size.unwrap_or(DEFAULT_PAGE_SIZE),
            params.show_all.unwrap_or(false),
            &token.credentials(),
        )
        .await?;
    Ok(Json(page))
}
