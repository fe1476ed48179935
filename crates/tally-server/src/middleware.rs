//! Route layers that run the authorization gate in front of handlers.
//!
//! Verified claims are stored in the request extensions, where handlers
//! pick them up with `Extension<AccessClaims>`.

use axum::extract::{MatchedPath, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tally_auth::{AccessClaims, GateRequest};

use crate::api::error::ApiError;
use crate::app::AppState;

fn authorization(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// Authenticate only: any valid access token passes.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = authorization(&request);
    let claims = state.gate.authenticate(header.as_deref())?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Authenticate, then require a grant on the matched route's resource key.
pub async fn authorize(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = authorization(&request);
    let template = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned());
    let method = request.method().as_str().to_owned();
    let path = request.uri().path().to_owned();
    let claims = request.extensions().get::<AccessClaims>().cloned();

    let claims = state
        .gate
        .authorize(GateRequest {
            authorization: header.as_deref(),
            method: &method,
            route_template: template.as_deref(),
            path: &path,
            claims,
        })
        .await?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
