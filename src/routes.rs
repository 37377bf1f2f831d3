use crate::auth::{AuthError, SharedAuthenticator};
use crate::db::models::UnknownVariant;
use crate::db::{GatewayError, SharedGateway};
use crate::forms::FormError;
use crate::rules::TransitionError;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, warn};
use serde_json::{json, Value};
use thiserror::Error;

pub mod dashboard;
pub mod machines;
pub mod map;
pub mod orders;
pub mod profiles;
pub mod session;

/// Every failure a handler can end with. Each one ends the request; nothing is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Filter(#[from] UnknownVariant),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Gateway(GatewayError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Form(_) | ApiError::Filter(_) => StatusCode::BAD_REQUEST,
            ApiError::Transition(_) => StatusCode::CONFLICT,
            ApiError::Auth(AuthError::Unauthorized) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::AlreadyRegistered(_)) => StatusCode::CONFLICT,
            ApiError::Auth(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Rejecting request: {}", self);
        }
        (
            status,
            Json(json!({
                "message": self.to_string(),
                "errorCode": status.as_u16()
            })),
        )
            .into_response()
    }
}

pub type ApiResult = Result<(StatusCode, Json<Value>), ApiError>;

/// All routes, with the gateway and authenticator installed as extensions.
pub fn router(gateway: SharedGateway, auth: SharedAuthenticator) -> Router {
    Router::new()
        .route("/auth/sign-in", post(session::sign_in))
        .route("/auth/sign-up", post(session::sign_up))
        .route("/auth/sign-out", post(session::sign_out))
        .route("/auth/me", get(session::me))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route(
            "/machines",
            get(machines::get_machines).post(machines::post_machine),
        )
        .route(
            "/machines/:id",
            get(machines::get_machine)
                .patch(machines::patch_machine)
                .delete(machines::delete_machine),
        )
        .route(
            "/machines/:id/movements",
            get(machines::get_movements).post(machines::post_movement),
        )
        .route(
            "/machines/:id/collections",
            get(machines::get_collections).post(machines::post_collection),
        )
        .route("/orders", get(orders::get_orders).post(orders::post_order))
        .route("/orders/:id", axum::routing::patch(orders::patch_order))
        .route("/map", get(map::get_map))
        .route("/profiles", get(profiles::get_profiles))
        .layer(Extension(gateway))
        .layer(Extension(auth))
}
