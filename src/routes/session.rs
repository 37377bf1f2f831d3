use super::ApiResult;
use crate::auth::extract::CurrentSession;
use crate::auth::{AuthError, SharedAuthenticator};
use crate::db::models::{NewProfile, Role};
use crate::db::{self, SharedGateway};
use crate::forms;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use log::{info, warn};
use serde_json::{json, Value};

/// Stand-in name for a profile created at sign-in, when sign-up never got to write one.
fn name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_owned()
}

// POST /auth/sign-in
pub async fn sign_in(
    Extension(auth): Extension<SharedAuthenticator>,
    Extension(gateway): Extension<SharedGateway>,
    Json(body): Json<Value>,
) -> ApiResult {
    let request = forms::sign_in_from(&body)?;
    let session = auth.sign_in(&request.email, &request.password).await?;
    let profile = match db::profiles::get_profile(&*gateway, session.user_id).await? {
        Some(profile) => profile,
        None => {
            warn!("{} has no profile, creating a default one", session.email);
            db::profiles::create_profile(
                &*gateway,
                &NewProfile {
                    id: session.user_id,
                    email: session.email.clone(),
                    name: name_from_email(&session.email),
                    role: Role::Operator,
                },
            )
            .await?
        }
    };
    info!("{} signed in", session.email);

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Signed in as {}", session.email),
            "session": session,
            "profile": profile
        })),
    ))
}

// POST /auth/sign-up
pub async fn sign_up(
    Extension(auth): Extension<SharedAuthenticator>,
    Extension(gateway): Extension<SharedGateway>,
    Json(body): Json<Value>,
) -> ApiResult {
    let request = forms::sign_up_from(&body)?;
    let session = match auth
        .sign_up(&request.email, &request.password, &request.name, request.role)
        .await
    {
        Ok(session) => session,
        Err(AuthError::AlreadyRegistered(email)) => {
            // The account may be left over from a sign-up whose profile insert failed.
            let session = auth
                .sign_in(&request.email, &request.password)
                .await
                .map_err(|_| AuthError::AlreadyRegistered(email.clone()))?;
            if db::profiles::get_profile(&*gateway, session.user_id)
                .await?
                .is_some()
            {
                auth.sign_out(&session.access_token).await?;
                return Err(AuthError::AlreadyRegistered(email).into());
            }
            info!("Finishing interrupted sign-up for {}", email);
            session
        }
        Err(e) => return Err(e.into()),
    };
    let profile = db::profiles::ensure_profile(
        &*gateway,
        &NewProfile {
            id: session.user_id,
            email: session.email.clone(),
            name: request.name,
            role: request.role,
        },
    )
    .await?;
    info!("{} signed up as {}", profile.email, profile.role);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Account created for {}", profile.email),
            "session": session,
            "profile": profile
        })),
    ))
}

// POST /auth/sign-out
pub async fn sign_out(
    CurrentSession(session): CurrentSession,
    Extension(auth): Extension<SharedAuthenticator>,
) -> ApiResult {
    auth.sign_out(&session.access_token).await?;
    info!("{} signed out", session.email);

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Signed out {}", session.email)
        })),
    ))
}

// GET /auth/me
pub async fn me(
    CurrentSession(session): CurrentSession,
    Extension(gateway): Extension<SharedGateway>,
) -> ApiResult {
    let profile = db::profiles::get_profile(&*gateway, session.user_id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Retrieved user {}", session.email),
            "user": {
                "id": session.user_id,
                "email": session.email
            },
            "profile": profile
        })),
    ))
}
