//! Basic-auth credentials for the API and downloads hosts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use url::Url;

#[derive(Debug, thiserror::Error)]
#[error("credentials must be in 'user:apikey' format")]
pub struct CredentialsFormatError;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    api_key: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            api_key: api_key.into(),
        }
    }

    /// Parse `user:apikey`. Exactly one `:` is accepted.
    pub fn parse(raw: &str) -> Result<Self, CredentialsFormatError> {
        let mut parts = raw.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(user), Some(api_key), None) => Ok(Self::new(user, api_key)),
            _ => Err(CredentialsFormatError),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Value for the `Authorization` header.
    pub fn basic_header_value(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.user, self.api_key));
        format!("Basic {}", token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Hosts that receive the `Authorization` header. Requests to any other host go out bare.
#[derive(Debug, Clone)]
pub(crate) struct AuthenticatedHosts {
    hosts: Vec<String>,
}

impl AuthenticatedHosts {
    pub(crate) fn from_endpoints(endpoints: &[&Url]) -> Self {
        let mut hosts: Vec<String> = endpoints
            .iter()
            .filter_map(|u| u.host_str())
            .map(|h| h.to_ascii_lowercase())
            .collect();
        hosts.dedup();
        Self { hosts }
    }

    pub(crate) fn contains(&self, url: &Url) -> bool {
        url.host_str()
            .map(|h| self.hosts.iter().any(|known| known.eq_ignore_ascii_case(h)))
            .unwrap_or(false)
    }
}
