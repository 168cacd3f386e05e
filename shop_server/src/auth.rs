//! Session tokens.
//!
//! Signing in happens elsewhere. The server only needs to check that a bearer token is an HS256 JWT signed with the
//! shared session secret, and that its registered `exp` claim has not passed. The shopper's id and role travel as
//! custom claims.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::{DateTime, Duration, Utc};
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    prelude::*,
    ValidationError,
};
use log::*;
use serde::{Deserialize, Serialize};
use shop_common::Secret;
use shop_engine::db_types::Role;

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: String,
    pub role: Role,
}

impl SessionClaims {
    pub fn new<S: Into<String>>(user_id: S, role: Role) -> Self {
        Self { user_id: user_id.into(), role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The session middleware stores verified claims in the request extensions. Handlers ask for them by type.
impl FromRequest for SessionClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<SessionClaims>().cloned().ok_or_else(|| {
            warn!("🔐️ A handler asked for session claims, but none were found in the request");
            ServerError::AuthenticationError(AuthError::MissingToken)
        });
        ready(claims)
    }
}

// Expiry is exact. No leeway is granted.
fn time_options() -> TimeOptions<fn() -> DateTime<Utc>> {
    TimeOptions::new(Duration::zero(), Utc::now as fn() -> DateTime<Utc>)
}

#[derive(Clone)]
pub struct TokenIssuer {
    secret: Secret<String>,
    valid_for: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { secret: config.session_secret.clone(), valid_for: config.session_duration }
    }

    fn key(&self) -> Hs256Key {
        Hs256Key::new(self.secret.reveal().as_bytes())
    }

    /// Issues a session token that is valid for the configured session duration.
    pub fn issue_token(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        self.issue_token_valid_for(claims, self.valid_for)
    }

    /// Signs the given claims. Nothing is checked; the caller vouches for the identity in the claims.
    pub fn issue_token_valid_for(&self, claims: &SessionClaims, valid_for: Duration) -> Result<String, AuthError> {
        let header = Header::empty().with_token_type("JWT");
        let claims = Claims::new(claims.clone()).set_duration_and_issuance(&time_options(), valid_for);
        Hs256.token(&header, &claims, &self.key()).map_err(|e| AuthError::ValidationError(format!("{e}")))
    }

    /// Checks the signature and expiry of a session token and returns its claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let untrusted = UntrustedToken::new(token.trim()).map_err(|e| AuthError::PoorlyFormattedToken(format!("{e}")))?;
        let key = self.key();
        let token = Hs256
            .validator::<SessionClaims>(&key)
            .validate(&untrusted)
            .map_err(|e| AuthError::ValidationError(format!("{e}")))?;
        let claims = token.claims();
        match claims.validate_expiration(&time_options()) {
            Ok(_) => {},
            Err(ValidationError::Expired) => {
                debug!("🔐️ Session for {} expired at {:?}", claims.custom.user_id, claims.expiration);
                return Err(AuthError::Expired);
            },
            Err(e) => return Err(AuthError::ValidationError(format!("{e}"))),
        }
        Ok(claims.custom.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&AuthConfig::new("a-test-secret-that-is-long-enough"))
    }

    #[test]
    fn issue_and_verify() {
        let claims = SessionClaims::new("alice", Role::User);
        let token = issuer().issue_token(&claims).unwrap();
        assert_eq!(token.split('.').count(), 3);
        let verified = issuer().verify(&token).unwrap();
        assert_eq!(verified, claims);
        assert!(!verified.is_admin());
    }

    #[test]
    fn registered_expiry_claim() {
        let token = issuer().issue_token(&SessionClaims::new("alice", Role::User)).unwrap();
        let untrusted = UntrustedToken::new(&token).unwrap();
        assert_eq!(untrusted.algorithm(), "HS256");
        let claims = untrusted.deserialize_claims_unchecked::<serde_json::Value>().unwrap();
        let expiry = claims.expiration.unwrap();
        assert!(expiry > Utc::now() + Duration::hours(23));
        assert_eq!(claims.custom["user_id"], "alice");
        assert_eq!(claims.custom["role"], "User");
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let token = issuer().issue_token(&SessionClaims::new("alice", Role::User)).unwrap();
        let forged = issuer().issue_token(&SessionClaims::new("alice", Role::Admin)).unwrap();
        let parts = token.split('.').collect::<Vec<_>>();
        let forged_parts = forged.split('.').collect::<Vec<_>>();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);
        let err = issuer().verify(&spliced).unwrap_err();
        assert!(matches!(err, AuthError::ValidationError(_)));
    }

    #[test]
    fn other_secrets_are_rejected() {
        let other = TokenIssuer::new(&AuthConfig::new("somebody-elses-secret-entirely"));
        let token = other.issue_token(&SessionClaims::new("bob", Role::Admin)).unwrap();
        assert!(matches!(issuer().verify(&token), Err(AuthError::ValidationError(_))));
    }

    #[test]
    fn expired_sessions() {
        let claims = SessionClaims::new("carol", Role::User);
        let token = issuer().issue_token_valid_for(&claims, Duration::minutes(-5)).unwrap();
        assert!(matches!(issuer().verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn malformed_tokens() {
        assert!(matches!(issuer().verify("no-dot-here"), Err(AuthError::PoorlyFormattedToken(_))));
        assert!(matches!(issuer().verify("abc.***.def"), Err(AuthError::PoorlyFormattedToken(_))));
    }
}
