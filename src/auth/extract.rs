use super::{AuthError, Session, SharedAuthenticator};
use axum::async_trait;
use axum::extract::{FromRequest, RequestParts};
use axum::http::StatusCode;
use axum::Json;
use log::{error, warn};
use serde_json::{json, Value};

/// The caller's session, resolved from the `Authorization` header.
/// Handlers that take this never run for anonymous requests.
pub struct CurrentSession(pub Session);

type Rejection = (StatusCode, Json<Value>);

fn reject(status: StatusCode, message: &str) -> Rejection {
    (
        status,
        Json(json!({
            "message": message,
            "errorCode": status.as_u16()
        })),
    )
}

#[async_trait]
impl<B> FromRequest<B> for CurrentSession
where
    B: Send,
{
    type Rejection = Rejection;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        // Grab the "Authorization" header from the request
        let token = req
            .headers()
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(|h| h.trim_start_matches("Bearer").trim().to_owned())
            .filter(|token| !token.is_empty());

        let token = match token {
            Some(token) => token,
            None => return Err(reject(StatusCode::UNAUTHORIZED, "missing auth header")),
        };

        let auth = match req.extensions().get::<SharedAuthenticator>() {
            Some(auth) => auth.clone(),
            None => {
                error!("No authenticator installed on the router");
                return Err(reject(StatusCode::INTERNAL_SERVER_ERROR, "auth unavailable"));
            }
        };

        match auth.current_user(&token).await {
            Ok(Some(session)) => Ok(Self(session)),
            Ok(None) | Err(AuthError::Unauthorized) => {
                Err(reject(StatusCode::UNAUTHORIZED, "token invalid or expired"))
            }
            Err(e) => {
                warn!("Could not resolve session: {}", e);
                Err(reject(StatusCode::BAD_GATEWAY, "auth backend unavailable"))
            }
        }
    }
}
