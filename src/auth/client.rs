use super::{AuthError, Authenticator, Session};
use crate::db::models::Role;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the hosted backend's auth REST endpoints.
#[derive(Clone)]
pub struct BackendAuthClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct BackendUser {
    id: Uuid,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: BackendUser,
}

#[derive(Debug, Deserialize)]
struct SignUpResponse {
    access_token: Option<String>,
    user: Option<BackendUser>,
    id: Option<Uuid>,
    email: Option<String>,
}

fn bearer(token: &str) -> String {
    if token.starts_with("Bearer") {
        token.to_string()
    } else {
        format!("Bearer {token}")
    }
}

impl BackendAuthClient {
    #[must_use]
    pub fn new(base_url: &str, api_key: &str) -> Self {
        BackendAuthClient {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
        }
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.api_key).timeout(TIMEOUT)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }
}

/// Client errors mean the credentials or token were refused.
fn check(response: Response) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status.is_client_error() {
        Err(AuthError::Unauthorized)
    } else {
        Err(AuthError::Unknown(format!("status {status}")))
    }
}

#[async_trait]
impl Authenticator for BackendAuthClient {
    async fn current_user(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let response = self
            .request(self.http_client.get(self.url("user")))
            .header("Authorization", bearer(token))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED || response.status() == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        let user = check(response)?.json::<BackendUser>().await?;
        Ok(Some(Session {
            user_id: user.id,
            email: user.email.unwrap_or_default(),
            access_token: token.trim_start_matches("Bearer").trim().to_owned(),
        }))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .request(self.http_client.post(self.url("token?grant_type=password")))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let token = check(response)?.json::<TokenResponse>().await?;
        Ok(Session {
            user_id: token.user.id,
            email: token.user.email.unwrap_or_else(|| email.to_owned()),
            access_token: token.access_token,
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<Session, AuthError> {
        let response = self
            .request(self.http_client.post(self.url("signup")))
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "name": name, "role": role }
            }))
            .send()
            .await?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(AuthError::AlreadyRegistered(email.to_owned()));
        }
        let body = check(response)?.json::<SignUpResponse>().await?;
        // With email confirmation enabled the backend answers with a bare user and no token.
        let (id, user_email) = match body.user {
            Some(user) => (Some(user.id), user.email),
            None => (body.id, body.email),
        };
        let user_id = id.ok_or_else(|| AuthError::Unknown(String::from("sign-up response without user id")))?;
        Ok(Session {
            user_id,
            email: user_email.unwrap_or_else(|| email.to_owned()),
            access_token: body.access_token.unwrap_or_default(),
        })
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let response = self
            .request(self.http_client.post(self.url("logout")))
            .header("Authorization", bearer(token))
            .send()
            .await?;
        check(response)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_added_once() {
        assert_eq!(bearer("abc"), "Bearer abc");
        assert_eq!(bearer("Bearer abc"), "Bearer abc");
    }

    #[test]
    fn urls_ignore_trailing_slash() {
        let client = BackendAuthClient::new("https://project.example.co/", "anon");
        assert_eq!(client.url("user"), "https://project.example.co/auth/v1/user");
    }
}
