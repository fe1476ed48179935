//! Resource, role and group endpoints.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tally_access::{GroupInput, RoleInput};
use tally_core::models::group::{Group, GroupSummary};
use tally_core::models::resource::Resource;
use tally_core::models::role::{Role, RoleSummary};

use crate::api::error::ApiError;
use crate::api::types::{DataResponse, PageQuery, PageResponse};
use crate::api::{page_response, parse_page, parse_uuid};
use crate::app::AppState;

pub async fn list_resources(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<Resource>>>, ApiError> {
    Ok(Json(DataResponse::new(state.graph.list_resources().await?)))
}

// -- roles -----------------------------------------------------------------

pub async fn list_roles(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<RoleSummary>>, ApiError> {
    let page = parse_page(&query)?;
    Ok(Json(page_response(state.graph.list_roles(page).await?)))
}

pub async fn create_role(
    State(state): State<AppState>,
    payload: Result<Json<RoleInput>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<Role>>), ApiError> {
    let Json(body) = payload?;
    let role = state.graph.create_role(body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(role))))
}

pub async fn get_role(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<DataResponse<Role>>, ApiError> {
    let id = parse_uuid(&uuid)?;
    Ok(Json(DataResponse::new(state.graph.get_role(id).await?)))
}

pub async fn update_role(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    payload: Result<Json<RoleInput>, JsonRejection>,
) -> Result<Json<DataResponse<Role>>, ApiError> {
    let id = parse_uuid(&uuid)?;
    let Json(body) = payload?;
    Ok(Json(DataResponse::new(state.graph.update_role(id, body).await?)))
}

pub async fn delete_role(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_uuid(&uuid)?;
    state.graph.delete_role(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- groups ----------------------------------------------------------------

pub async fn list_groups(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<GroupSummary>>, ApiError> {
    let page = parse_page(&query)?;
    Ok(Json(page_response(state.graph.list_groups(page).await?)))
}

pub async fn create_group(
    State(state): State<AppState>,
    payload: Result<Json<GroupInput>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<Group>>), ApiError> {
    let Json(body) = payload?;
    let group = state.graph.create_group(body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(group))))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<DataResponse<Group>>, ApiError> {
    let id = parse_uuid(&uuid)?;
    Ok(Json(DataResponse::new(state.graph.get_group(id).await?)))
}

pub async fn update_group(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    payload: Result<Json<GroupInput>, JsonRejection>,
) -> Result<Json<DataResponse<Group>>, ApiError> {
    let id = parse_uuid(&uuid)?;
    let Json(body) = payload?;
    Ok(Json(DataResponse::new(state.graph.update_group(id, body).await?)))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_uuid(&uuid)?;
    state.graph.delete_group(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
