//! Session tokens for the food backend.
//!
//! The backend trusts Supabase-issued JWTs. A token is requested before
//! every lookup; failures surface as [`LookupError::Auth`], which the
//! dispatcher treats like any other transient fault.
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tracing::debug;

use crate::error::LookupError;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, LookupError>;
}

/// A preconfigured bearer token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken([REDACTED])")
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, LookupError> {
        if self.0.trim().is_empty() {
            return Err(LookupError::Auth("no access token configured".into()));
        }
        Ok(self.0.clone())
    }
}

/// Password-grant sign-in against Supabase GoTrue.
#[derive(Clone)]
pub struct SupabaseAuth {
    http: Client,
    base_url: Url,
    anon_key: String,
    email: String,
    password: String,
}

impl fmt::Debug for SupabaseAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseAuth")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GoTrueError {
    #[serde(default, alias = "error_description", alias = "msg")]
    message: Option<String>,
}

impl SupabaseAuth {
    pub fn new(
        http: Client,
        base_url: Url,
        anon_key: String,
        email: String,
        password: String,
    ) -> Self {
        Self {
            http,
            base_url,
            anon_key,
            email,
            password,
        }
    }

    pub fn build_request(&self) -> Result<reqwest::Request, LookupError> {
        let mut endpoint = self
            .base_url
            .join("auth/v1/token")
            .map_err(|e| LookupError::Auth(format!("invalid Supabase URL: {}", e)))?;
        endpoint.set_query(Some("grant_type=password"));
        self.http
            .post(endpoint)
            .header("apikey", &self.anon_key)
            .header("Content-Type", "application/json")
            .json(&json!({ "email": self.email, "password": self.password }))
            .build()
            .map_err(|e| LookupError::Auth(format!("failed to build sign-in request: {}", e)))
    }
}

#[async_trait]
impl TokenProvider for SupabaseAuth {
    async fn access_token(&self) -> Result<String, LookupError> {
        let request = self.build_request()?;
        debug!(url=%request.url(), "requesting session token");
        let res = self
            .http
            .execute(request)
            .await
            .map_err(|e| LookupError::Auth(format!("failed to reach Supabase: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoTrueError>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(LookupError::Auth(format!("sign-in failed {}: {}", status, message)));
        }

        let payload: TokenResponse = res
            .json()
            .await
            .map_err(|e| LookupError::Auth(format!("invalid sign-in response: {}", e)))?;
        Ok(payload.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_request_targets_password_grant() {
        let auth = SupabaseAuth::new(
            Client::new(),
            Url::parse("https://project.supabase.co/").unwrap(),
            "anon-key".into(),
            "user@example.com".into(),
            "hunter2".into(),
        );
        let request = auth.build_request().unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().path(), "/auth/v1/token");
        assert_eq!(request.url().query(), Some("grant_type=password"));
        assert_eq!(
            request
                .headers()
                .get("apikey")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "anon-key"
        );
        let body: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["email"], "user@example.com");
        assert_eq!(body["password"], "hunter2");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let token = StaticToken::new("secret");
        assert!(!format!("{:?}", token).contains("secret"));
    }

    #[tokio::test]
    async fn empty_static_token_is_an_auth_error() {
        let err = StaticToken::new("  ").access_token().await.unwrap_err();
        assert!(matches!(err, LookupError::Auth(_)));
    }
}
