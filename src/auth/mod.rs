//! Bearer-token credential for the remote contents API.
//!
//! The token never appears in `Debug` output or logs.

use reqwest::header::{HeaderValue, InvalidHeaderValue};

/// Prefix of the authorization header value.
pub const BEARER_PREFIX: &str = "Bearer ";

/// A user-supplied access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().trim().to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Build the `Authorization` header value, marked sensitive.
    pub fn authorization_header(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&format!("{}{}", BEARER_PREFIX, self.token))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &redact(&self.token))
            .finish()
    }
}

/// Keep only enough of the token to tell credentials apart.
fn redact(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}
