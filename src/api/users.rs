use axum::{
    Extension, Form, Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{Pagination, validate_id};
use super::{
    AccountDto, ApiError, ApiResponse, AppState, LoginForm, OkResponse, RegisterRequest,
    TokenResponse, UpdateAccountRequest, UpdateSelfRequest,
};

/// POST /users
/// Create an account together with its member profile
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let account = state.auth_service().register(payload.into()).await?;
    Ok(Json(ApiResponse::success(account.into())))
}

/// POST /users/token
/// Exchange form-encoded credentials for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let login = state
        .auth_service()
        .authenticate(&form.username, &form.password)
        .await?;

    tracing::info!(username = %form.username, "User logged in");

    Ok(Json(ApiResponse::success(login.into())))
}

/// GET /users/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let account = state.auth_service().get_account(&account.id).await?;
    Ok(Json(ApiResponse::success(account.into())))
}

/// PUT /users/profile
/// Update the caller's own account. The role cannot be changed here.
pub async fn update_current_user(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Json(payload): Json<UpdateSelfRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let updated = state
        .auth_service()
        .update_account(&account.id, payload.into())
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

/// PUT /users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let id = validate_id(&id)?;
    let updated = state
        .auth_service()
        .update_account(id, payload.into())
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

/// GET /users/admin/all
/// Every account with its member profile (admin only)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Pagination>,
) -> Result<Json<ApiResponse<Vec<AccountDto>>>, ApiError> {
    let (offset, limit) = page.validated()?;
    let accounts = state.auth_service().list_accounts(offset, limit).await?;

    Ok(Json(ApiResponse::success(
        accounts.into_iter().map(AccountDto::from).collect(),
    )))
}

/// DELETE /users/{id}
/// Removes the account and its member profile
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OkResponse>>, ApiError> {
    let id = validate_id(&id)?;
    state.auth_service().delete_account(id).await?;

    tracing::info!(user_id = %id, "Deleted account");

    Ok(Json(ApiResponse::success(OkResponse { ok: true })))
}
