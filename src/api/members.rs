use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{Pagination, validate_id};
use super::{
    ApiError, ApiResponse, AppState, CreateMemberRequest, MemberWithUserDto, OkResponse,
    UpdateMemberRequest,
};
use crate::services::MemberLookup;

type MemberResponse = Result<Json<ApiResponse<MemberWithUserDto>>, ApiError>;

pub async fn create_member(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateMemberRequest>,
) -> MemberResponse {
    let (user_id, member) = payload.into_parts();
    let user_id = validate_id(&user_id)?;

    let created = state.member_service().create_member(user_id, member).await?;
    Ok(Json(ApiResponse::success(created.into())))
}

pub async fn list_members(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Pagination>,
) -> Result<Json<ApiResponse<Vec<MemberWithUserDto>>>, ApiError> {
    let (offset, limit) = page.validated()?;
    let members = state.member_service().list_members(offset, limit).await?;

    Ok(Json(ApiResponse::success(
        members.into_iter().map(MemberWithUserDto::from).collect(),
    )))
}

pub async fn get_member(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> MemberResponse {
    let lookup = MemberLookup::Id(validate_id(&id)?.to_string());
    let member = state.member_service().get_member(&lookup).await?;
    Ok(Json(ApiResponse::success(member.into())))
}

pub async fn get_member_by_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> MemberResponse {
    let lookup = MemberLookup::Owner(validate_id(&user_id)?.to_string());
    let member = state.member_service().get_member(&lookup).await?;
    Ok(Json(ApiResponse::success(member.into())))
}

pub async fn update_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMemberRequest>,
) -> MemberResponse {
    let lookup = MemberLookup::Id(validate_id(&id)?.to_string());
    apply_update(&state, &lookup, payload).await
}

pub async fn update_member_by_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateMemberRequest>,
) -> MemberResponse {
    let lookup = MemberLookup::Owner(validate_id(&user_id)?.to_string());
    apply_update(&state, &lookup, payload).await
}

/// PUT /members/profile
/// Same update as the by-owner route, with the owner taken from the token.
pub async fn update_own_member(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Json(payload): Json<UpdateMemberRequest>,
) -> MemberResponse {
    let lookup = MemberLookup::Owner(account.id);
    apply_update(&state, &lookup, payload).await
}

async fn apply_update(
    state: &AppState,
    lookup: &MemberLookup,
    payload: UpdateMemberRequest,
) -> MemberResponse {
    let updated = state
        .member_service()
        .update_member(lookup, payload.into())
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

pub async fn delete_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OkResponse>>, ApiError> {
    state
        .member_service()
        .delete_member(validate_id(&id)?)
        .await?;
    Ok(Json(ApiResponse::success(OkResponse { ok: true })))
}
