use super::ApiResult;
use crate::auth::extract::CurrentSession;
use crate::db::{self, SharedGateway};
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

// GET /profiles
pub async fn get_profiles(
    CurrentSession(_): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
) -> ApiResult {
    let profiles = db::profiles::get_profiles(&*gateway).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Retrieved {} profiles", profiles.len()),
            "profiles": profiles
        })),
    ))
}
