//! Tenant tokens.
//!
//! A tenant token is an HS256 JWT signed with a search API key. The engine
//! applies its `searchRules` on top of the key's own permissions, which lets a
//! backend hand out scoped search access without creating keys.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// API key used to sign tenant tokens.
pub struct SigningKey {
    /// Key uid, sent as the `apiKeyUid` claim.
    pub uid: String,
    /// Key value, used as the HMAC secret.
    pub key: SecretString,
}

impl SigningKey {
    /// Creates a signing key.
    #[must_use]
    pub fn new(uid: impl Into<String>, key: SecretString) -> Self {
        Self {
            uid: uid.into(),
            key,
        }
    }
}

/// Claims carried by a tenant token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantClaims {
    /// Per-index search rules, e.g. `{"movies": {"filter": "user = 1"}}`.
    pub search_rules: serde_json::Value,
    /// Uid of the signing key.
    pub api_key_uid: String,
    /// Expiry in Unix seconds. Absent for tokens that never expire.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exp: Option<i64>,
}

/// Parses an RFC 3339 expiry such as `2030-01-01T00:00:00Z`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the date cannot be parsed.
pub fn parse_expiry(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("invalid expiry date `{value}`: {e}")))
}

/// Signs a tenant token.
///
/// `expires_at` is truncated to whole seconds.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `search_rules` is neither an object nor
/// an array, and [`Error::OperationFailed`] if signing fails.
pub fn create_tenant_token(
    search_rules: serde_json::Value,
    api_key: &SigningKey,
    expires_at: Option<DateTime<Utc>>,
) -> Result<String> {
    if !(search_rules.is_object() || search_rules.is_array()) {
        return Err(Error::InvalidInput(
            "search rules must be a JSON object or array".to_string(),
        ));
    }
    if expires_at.is_some_and(|exp| exp <= Utc::now()) {
        tracing::warn!(api_key_uid = %api_key.uid, "tenant token expiry is in the past");
    }

    let claims = TenantClaims {
        search_rules,
        api_key_uid: api_key.uid.clone(),
        exp: expires_at.map(|dt| dt.timestamp()),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(api_key.key.expose_secret().as_bytes()),
    )
    .map_err(|e| Error::operation("create_tenant_token", e))
}
