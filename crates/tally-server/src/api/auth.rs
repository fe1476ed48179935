//! Sign-in, sign-up, token refresh and password endpoints.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::response::IntoResponse;
use tally_auth::{AccessClaims, SignUpInput};

use crate::api::error::ApiError;
use crate::api::types::{
    ChangePasswordRequest, DataResponse, SignInRequest, SignUpRequest, TokensResponse,
};
use crate::app::AppState;

pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<DataResponse<TokensResponse>>, ApiError> {
    let Json(body) = payload?;
    let out = state.auth.sign_in(&body.email, &body.password).await?;
    Ok(Json(DataResponse::new(out.tokens.into())))
}

pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<Json<DataResponse<TokensResponse>>, ApiError> {
    let Json(body) = payload?;
    let out = state
        .auth
        .sign_up(SignUpInput {
            name: body.name,
            second_name: body.second_name,
            patronymic: body.patronymic,
            email: body.email,
            password: body.password,
        })
        .await?;
    Ok(Json(DataResponse::new(out.tokens.into())))
}

/// The refresh token travels in the `Authorization` header.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DataResponse<TokensResponse>>, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let out = state.auth.refresh(header).await?;
    Ok(Json(DataResponse::new(out.tokens.into())))
}

pub async fn public_key(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "application/x-pem-file")],
        state.auth.codec().public_key_pem().to_string(),
    )
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<DataResponse<&'static str>>, ApiError> {
    let Json(body) = payload?;
    state
        .auth
        .change_password(claims.user.uuid, &body.password)
        .await?;
    Ok(Json(DataResponse::new("password changed")))
}
