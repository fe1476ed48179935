//! Identity endpoints.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use tally_auth::AccessClaims;
use tally_core::models::identity::{Identity, UpdateIdentity};
use tally_core::repository::IdentityRepository;

use crate::api::error::ApiError;
use crate::api::parse_uuid;
use crate::api::types::DataResponse;
use crate::app::AppState;

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<Json<DataResponse<Identity>>, ApiError> {
    let identity = state.auth.identities().get_by_id(claims.user.uuid).await?;
    Ok(Json(DataResponse::new(identity)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<DataResponse<Identity>>, ApiError> {
    let id = parse_uuid(&uuid)?;
    let identity = state.auth.identities().get_by_id(id).await?;
    Ok(Json(DataResponse::new(identity)))
}

/// Update name parts only.
pub async fn update_user(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    payload: Result<Json<UpdateIdentity>, JsonRejection>,
) -> Result<Json<DataResponse<Identity>>, ApiError> {
    let id = parse_uuid(&uuid)?;
    let Json(body) = payload?;
    let identity = state.auth.identities().update(id, body).await?;
    Ok(Json(DataResponse::new(identity)))
}

/// Update the caller's own name parts.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    payload: Result<Json<UpdateIdentity>, JsonRejection>,
) -> Result<Json<DataResponse<Identity>>, ApiError> {
    let Json(body) = payload?;
    let identity = state.auth.identities().update(claims.user.uuid, body).await?;
    Ok(Json(DataResponse::new(identity)))
}
