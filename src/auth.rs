//! Authentication header construction

use crate::errors::{OllamaError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Authentication scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    #[default]
    None,
    Bearer,
    Basic,
}

/// Credentials for servers sitting behind an authenticating proxy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub kind: AuthKind,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthConfig {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Bearer,
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Basic,
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Value of the `Authorization` header, if any.
    ///
    /// Fails when a scheme is selected without the credentials it needs.
    pub fn authorization(&self) -> Result<Option<String>> {
        match self.kind {
            AuthKind::None => Ok(None),
            AuthKind::Bearer => {
                let token = non_empty(&self.token).ok_or_else(|| {
                    OllamaError::Auth(
                        "Bearer token is required when using token authentication".to_string(),
                    )
                })?;
                Ok(Some(format!("Bearer {}", token)))
            }
            AuthKind::Basic => match (non_empty(&self.username), non_empty(&self.password)) {
                (Some(user), Some(pass)) => {
                    let encoded = STANDARD.encode(format!("{}:{}", user, pass));
                    Ok(Some(format!("Basic {}", encoded)))
                }
                _ => Err(OllamaError::Auth(
                    "Username and password are required when using basic authentication"
                        .to_string(),
                )),
            },
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
