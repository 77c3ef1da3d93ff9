//! Account endpoints

use fleetdesk_core::User;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{ApiClient, ApiError, Result};

const LOGIN_PATH: &str = "account/login";
const MY_ACCOUNT_PATH: &str = "account/my-account";

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(alias = "token", alias = "access_token")]
    pub access_token: String,

    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Clone)]
pub struct AuthApi {
    client: Arc<ApiClient>,
}

impl AuthApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Exchange credentials for a bearer token
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        debug!("Logging in as {}", credentials.email);
        let response: LoginResponse = self.client.post_json(LOGIN_PATH, credentials).await?;
        if response.access_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Login response carried an empty token".to_string(),
            ));
        }
        info!("Login succeeded for {}", credentials.email);
        Ok(response)
    }

    /// Profile of the user the current token belongs to
    ///
    /// Accepts either the bare user object or one wrapped as `{ "user": ... }`.
    pub async fn my_account(&self) -> Result<User> {
        let value: Value = self.client.get_json(MY_ACCOUNT_PATH, None).await?;
        let user = match value {
            Value::Object(mut map) if map.get("user").is_some_and(Value::is_object) => {
                map.remove("user").unwrap_or_default()
            }
            other => other,
        };
        serde_json::from_value(user)
            .map_err(|e| ApiError::InvalidResponse(format!("Unexpected account shape: {}", e)))
    }
}
