use axum::{
    Extension, Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, AvatarResponse};
use crate::services::{AvatarService, AvatarUpload};

const FILE_FIELD: &str = "file";

/// POST /upload/avatar
/// Store an image and set it as the caller's avatar
pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<AvatarResponse>>, ApiError> {
    let avatars = state.avatar_service();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(avatars, &e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        AvatarService::check_content_type(&content_type)?;
        let file_name = field.file_name().map(ToString::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(avatars, &e))?
        {
            avatars.check_size(bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }

        let upload = AvatarUpload {
            content_type,
            file_name,
            bytes,
        };
        let avatar_url = avatars.attach(&account, upload).await?;

        return Ok(Json(ApiResponse::success(AvatarResponse {
            message: "Avatar uploaded successfully".to_string(),
            avatar_url,
        })));
    }

    Err(ApiError::validation("Missing 'file' field"))
}

fn multipart_error(avatars: &AvatarService, err: &MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return avatars.too_large().into();
    }
    ApiError::validation(err.body_text())
}
