//! Payer Authentication
//!
//! Validates JWTs from an external identity provider and maps the token
//! subject to the account that validation fees are charged to.
//! The server does NOT issue tokens - only validates them.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::ledger::AccountId;

/// Identity provider settings.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    /// Expected issuer claim ("iss"). If None, any issuer accepted.
    pub issuer: Option<String>,
    /// Expected audience claim ("aud"). If None, audience is not checked.
    pub audience: Option<String>,
    /// RS256 public key in PEM format.
    pub public_key_pem: Option<String>,
    /// HS256 shared secret.
    pub secret: Option<String>,
    /// Skip expiry validation (local testing only).
    pub skip_expiry: bool,
}

impl AuthConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            issuer: non_empty("AUTH_ISSUER"),
            audience: non_empty("AUTH_AUDIENCE"),
            public_key_pem: non_empty("AUTH_PUBLIC_KEY_PEM"),
            secret: non_empty("AUTH_SECRET"),
            skip_expiry: non_empty("AUTH_SKIP_EXPIRY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Check if a verification key is configured.
    pub fn is_configured(&self) -> bool {
        self.public_key_pem.is_some() || self.secret.is_some()
    }

    /// Reject issuer/audience constraints that have no key to enforce them.
    pub fn check(&self) -> Result<(), ConfigError> {
        if !self.is_configured() && (self.issuer.is_some() || self.audience.is_some()) {
            return Err(ConfigError::InvalidValue {
                key: "AUTH_SECRET",
                reason: "issuer/audience set without AUTH_SECRET or AUTH_PUBLIC_KEY_PEM".into(),
            });
        }
        Ok(())
    }
}

/// Claims read from the provider's token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject - the user id at the provider.
    pub sub: String,
    /// Expiry timestamp (Unix seconds).
    #[serde(default)]
    pub exp: u64,
    /// Issued at timestamp.
    #[serde(default)]
    pub iat: u64,
    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience (string or array).
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
}

impl TokenClaims {
    /// Payer account for this subject.
    pub fn account_id(&self) -> AccountId {
        AccountId::derive(&self.sub)
    }
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No verification key configured.
    #[error("authentication not configured")]
    NotConfigured,
    /// Token format is invalid.
    #[error("invalid token format")]
    InvalidFormat,
    /// Signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,
    /// Token has expired.
    #[error("token expired")]
    Expired,
    /// Issuer claim doesn't match.
    #[error("invalid issuer")]
    InvalidIssuer,
    /// Audience claim doesn't match.
    #[error("invalid audience")]
    InvalidAudience,
    /// Required claim is missing.
    #[error("missing required claim: {0}")]
    MissingClaim(String),
    /// Any other decoding failure.
    #[error("decode error: {0}")]
    DecodeError(String),
}

/// Validate a token and return its claims.
pub fn validate_token(token: &str, config: &AuthConfig) -> Result<TokenClaims, AuthError> {
    let (key, algorithm) = match (&config.public_key_pem, &config.secret) {
        (Some(pem), _) => (
            DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| AuthError::DecodeError(format!("invalid public key: {}", e)))?,
            Algorithm::RS256,
        ),
        (None, Some(secret)) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
        (None, None) => return Err(AuthError::NotConfigured),
    };

    let mut validation = Validation::new(algorithm);
    validation.required_spec_claims = HashSet::new();
    validation.validate_exp = !config.skip_expiry;
    match &config.issuer {
        Some(issuer) => validation.set_issuer(&[issuer]),
        None => validation.iss = None,
    }
    match &config.audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let claims = decode::<TokenClaims>(token, &key, &validation)
        .map_err(map_jwt_error)?
        .claims;

    if claims.sub.is_empty() {
        return Err(AuthError::MissingClaim("sub".into()));
    }

    // `exp` is optional in the claim set, so the library skips it when absent.
    if !config.skip_expiry && claims.exp > 0 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        if now > claims.exp {
            return Err(AuthError::Expired);
        }
    }

    Ok(claims)
}

/// Validate a token and return the payer account it authorizes.
pub fn authenticate(token: &str, config: &AuthConfig) -> Result<AccountId, AuthError> {
    validate_token(token, config).map(|claims| claims.account_id())
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) => AuthError::InvalidFormat,
        _ => AuthError::DecodeError(err.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "path-validator-test-secret-0123456789";

    fn sign(claims: &TokenClaims, secret: &str) -> String {
        let key = EncodingKey::from_secret(secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &key).unwrap()
    }

    fn claims_for(sub: &str) -> TokenClaims {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        TokenClaims {
            sub: sub.into(),
            exp: now + 3600,
            iat: now,
            iss: Some("test-issuer".into()),
            aud: Some(serde_json::json!("path-validator")),
        }
    }

    fn secret_config() -> AuthConfig {
        AuthConfig {
            secret: Some(SECRET.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_token_maps_to_account() {
        let token = sign(&claims_for("runner-1"), SECRET);
        let account = authenticate(&token, &secret_config()).unwrap();
        assert_eq!(account, AccountId::derive("runner-1"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut claims = claims_for("runner-1");
        claims.exp = 1;
        let token = sign(&claims, SECRET);
        assert!(matches!(validate_token(&token, &secret_config()), Err(AuthError::Expired)));

        let lenient = AuthConfig { skip_expiry: true, ..secret_config() };
        assert!(validate_token(&token, &lenient).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = sign(&claims_for("runner-1"), "some-other-secret-0123456789abcdef");
        assert!(matches!(
            validate_token(&token, &secret_config()),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_missing_sub_rejected() {
        let token = sign(&claims_for(""), SECRET);
        assert!(matches!(
            validate_token(&token, &secret_config()),
            Err(AuthError::MissingClaim(_))
        ));
    }

    #[test]
    fn test_issuer_and_audience() {
        let token = sign(&claims_for("runner-1"), SECRET);

        let wrong_issuer = AuthConfig { issuer: Some("elsewhere".into()), ..secret_config() };
        assert!(matches!(validate_token(&token, &wrong_issuer), Err(AuthError::InvalidIssuer)));

        let wrong_audience = AuthConfig { audience: Some("other-app".into()), ..secret_config() };
        assert!(matches!(validate_token(&token, &wrong_audience), Err(AuthError::InvalidAudience)));

        let exact = AuthConfig {
            issuer: Some("test-issuer".into()),
            audience: Some("path-validator".into()),
            ..secret_config()
        };
        assert!(validate_token(&token, &exact).is_ok());
    }

    #[test]
    fn test_garbage_token() {
        assert!(validate_token("not-a-jwt", &secret_config()).is_err());
    }

    #[test]
    fn test_not_configured() {
        assert!(matches!(
            validate_token("a.b.c", &AuthConfig::default()),
            Err(AuthError::NotConfigured)
        ));
    }

    #[test]
    fn test_config_from_vars() {
        let config = AuthConfig::from_vars(|key| match key {
            "AUTH_SECRET" => Some(SECRET.into()),
            "AUTH_ISSUER" => Some(String::new()),
            "AUTH_SKIP_EXPIRY" => Some("1".into()),
            _ => None,
        });
        assert!(config.is_configured());
        assert!(config.issuer.is_none());
        assert!(config.skip_expiry);
        assert!(config.check().is_ok());

        let half = AuthConfig { issuer: Some("x".into()), ..Default::default() };
        assert!(half.check().is_err());
    }
}
