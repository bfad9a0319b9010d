//! HS256 JWT verification.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
use uuid::Uuid;

use quill_core::ports::{AuthError, TokenClaims, TokenService};

const DEFAULT_SECRET: &str = "change-me-in-production";
const DEFAULT_ISSUER: &str = "quill-api";

/// JWT settings, read from `JWT_SECRET` and `JWT_ISSUER`.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}

impl JwtConfig {
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_SECRET.to_string());

        if secret == DEFAULT_SECRET {
            let is_production = std::env::var("RUST_ENV")
                .map(|v| v == "production" || v == "prod")
                .unwrap_or(false);

            if is_production {
                tracing::error!("Default JWT secret in production. Set JWT_SECRET.");
            } else {
                tracing::warn!("Using default JWT secret");
            }
        }

        Self {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
        }
    }
}

/// Claims Quill reads; `exp` and `iss` are checked by [`Validation`].
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    roles: Vec<String>,
}

pub struct JwtTokenService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::default();
        validation.set_issuer(&[&config.issuer]);

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    pub fn from_env() -> Self {
        Self::new(JwtConfig::from_env())
    }
}

impl TokenService for JwtTokenService {
    fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(TokenClaims {
            user_id,
            roles: data.claims.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use quill_core::ports::ADMIN_ROLE;
    use serde_json::json;

    const SECRET: &str = "test-secret-key";

    fn service() -> JwtTokenService {
        JwtTokenService::new(JwtConfig {
            secret: SECRET.to_string(),
            issuer: "quill-test".to_string(),
        })
    }

    fn mint(sub: &str, roles: &[&str], issuer: &str, valid_for: TimeDelta) -> String {
        let now = Utc::now();
        let claims = json!({
            "sub": sub,
            "roles": roles,
            "iss": issuer,
            "iat": now.timestamp(),
            "exp": (now + valid_for).timestamp(),
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_admin_token_yields_privileged_viewer() {
        let user_id = Uuid::new_v4();
        let token = mint(&user_id.to_string(), &[ADMIN_ROLE], "quill-test", TimeDelta::hours(1));

        let viewer = service().validate_token(&token).unwrap().viewer();

        assert!(viewer.is_admin);
        assert_eq!(viewer.user_id, user_id);
    }

    #[test]
    fn test_reader_token_is_not_admin() {
        let token = mint(
            &Uuid::new_v4().to_string(),
            &["reader"],
            "quill-test",
            TimeDelta::hours(1),
        );

        assert!(!service().validate_token(&token).unwrap().is_admin());
    }

    #[test]
    fn test_missing_roles_claim_means_no_roles() {
        let now = Utc::now();
        let claims = json!({
            "sub": Uuid::new_v4().to_string(),
            "iss": "quill-test",
            "exp": (now + TimeDelta::hours(1)).timestamp(),
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(service().validate_token(&token).unwrap().roles.is_empty());
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let result = service().validate_token("not-a-jwt");
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token() {
        let token = mint(
            &Uuid::new_v4().to_string(),
            &[],
            "quill-test",
            TimeDelta::hours(-2),
        );

        assert!(matches!(
            service().validate_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_foreign_issuer_is_rejected() {
        let token = mint(
            &Uuid::new_v4().to_string(),
            &[ADMIN_ROLE],
            "someone-else",
            TimeDelta::hours(1),
        );

        assert!(service().validate_token(&token).is_err());
    }

    #[test]
    fn test_non_uuid_subject_is_invalid() {
        let token = mint("42", &[], "quill-test", TimeDelta::hours(1));

        assert!(matches!(
            service().validate_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
