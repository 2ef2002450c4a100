//! Login collaborator: exchanges credentials for an identity and tokens.

use crate::error::{AuthResult, LoginError};
use crate::identity::Identity;
use async_trait::async_trait;
use portal_config_and_utils::Config;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Credentials as typed on the login form.
#[derive(Clone)]
pub struct Credentials {
    pub username_or_email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username_or_email", &self.username_or_email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login payload.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: Identity,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("user", &self.user.id)
            .field("refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait LoginClient: Send + Sync {
    async fn login(
        &self,
        credentials: &Credentials,
        device_id: Option<&str>,
    ) -> Result<LoginResponse, LoginError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    username_or_email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_id: Option<&'a str>,
}

/// JSON-over-HTTP login against `<api_base_url>/auth/login`.
pub struct HttpLoginClient {
    http_client: Client,
    login_url: Url,
}

impl HttpLoginClient {
    pub fn new(api_base_url: &Url, timeout: Duration) -> AuthResult<Self> {
        let login_url = Self::login_url_for(api_base_url)?;
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            login_url,
        })
    }

    pub fn from_config(config: &Config) -> AuthResult<Self> {
        Self::new(
            &config.api_base_url()?,
            Duration::from_secs(config.login_timeout_secs),
        )
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    fn login_url_for(base: &Url) -> AuthResult<Url> {
        let base = base.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/auth/login", base))?)
    }
}

#[async_trait]
impl LoginClient for HttpLoginClient {
    async fn login(
        &self,
        credentials: &Credentials,
        device_id: Option<&str>,
    ) -> Result<LoginResponse, LoginError> {
        debug!(
            url = %self.login_url,
            username = %credentials.username_or_email,
            "Attempting login"
        );

        let response = self
            .http_client
            .post(self.login_url.clone())
            .json(&LoginRequest {
                username_or_email: &credentials.username_or_email,
                password: &credentials.password,
                device_id,
            })
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(LoginError::InvalidCredentials(status.as_u16()));
            }
            s if !s.is_success() => {
                return Err(LoginError::Http(format!("unexpected status {}", s)));
            }
            _ => {}
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| LoginError::MalformedResponse(e.to_string()))
    }
}
