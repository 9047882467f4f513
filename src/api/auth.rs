use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::models::{Account, Role};

/// The account resolved from the request's bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Account);

/// Username of the authenticated caller, attached to the response so the
/// request logging span can pick it up.
#[derive(Debug, Clone)]
pub struct RequestUser(pub String);

/// Resolves `Authorization: Bearer <token>` to an account and stores it in
/// the request extensions as [`CurrentUser`].
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authenticate(&state, request, next, None).await
}

/// Like [`auth_middleware`], but the account must also hold the admin role.
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authenticate(&state, request, next, Some(Role::Admin)).await
}

async fn authenticate(
    state: &AppState,
    mut request: Request,
    next: Next,
    role: Option<Role>,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let account = match role {
        Some(role) => state.auth_service().require_role(&token, role).await?,
        None => state.auth_service().current_account(&token).await?,
    };

    let username = account.username.clone();
    request.extensions_mut().insert(CurrentUser(account));

    let mut response = next.run(request).await;
    response.extensions_mut().insert(RequestUser(username));
    Ok(response)
}

/// Extract the token from an `Authorization: Bearer` header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
