// src/services/auth_service.rs
use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::CurrentUser,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Checks a password against the stored bcrypt hash.
pub async fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Verifying bcrypt hash...");
        bcrypt::verify(&password, &stored_hash)
    })
    .await
    .map_err(|e| {
        tracing::error!("spawn_blocking task failed (verify_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("bcrypt failed to verify password: {:?}", e);
        AppError::PasswordHashingError
    })
}

/// Produces a bcrypt hash for a new password.
pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Generating bcrypt hash...");
        bcrypt::hash(&password, bcrypt::DEFAULT_COST)
    })
    .await
    .map_err(|e| {
        tracing::error!("spawn_blocking task failed (hash_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("bcrypt failed to hash password: {:?}", e);
        AppError::PasswordHashingError
    })
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,      // user id
    pub email: String, // email at issue time, informational only
    pub iat: i64,
    pub exp: i64,
}

/// Signs an HS256 access token for the user.
pub fn issue_token(user: &CurrentUser, config: &AuthConfig) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let exp = i64::try_from(config.jwt_expiry.as_secs())
        .ok()
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| AppError::TokenSigningError("token lifetime out of range".to_string()))?;
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        iat: now,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::TokenSigningError(e.to_string()))
}

/// Verifies signature and expiry. Does not check that the user still exists.
pub fn decode_token(token: &str, config: &AuthConfig) -> AppResult<Claims> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                tracing::debug!("Rejected expired token");
            } else {
                tracing::debug!("Rejected token: {}", e);
            }
            AppError::InvalidToken
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            jwt_expiry: Duration::from_secs(3600),
        }
    }

    fn user() -> CurrentUser {
        CurrentUser {
            id: 42,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role: "Owner".into(),
        }
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("correct horse").await.unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash).await.unwrap());
        assert!(!verify_password("wrong horse", &hash).await.unwrap());
    }

    #[test]
    fn issued_token_decodes_with_same_secret() {
        let cfg = config("test-secret");
        let token = issue_token(&user(), &cfg).unwrap();
        let claims = decode_token(&token, &cfg).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn token_with_other_secret_is_rejected() {
        let token = issue_token(&user(), &config("one")).unwrap();
        assert!(matches!(decode_token(&token, &config("two")), Err(AppError::InvalidToken)));
        assert!(matches!(decode_token("not-a-jwt", &config("one")), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let cfg = config("test-secret");
        let past = Utc::now().timestamp() - 7200;
        let claims = Claims {
            sub: 1,
            email: "old@example.com".into(),
            iat: past,
            exp: past + 60,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap();
        assert!(matches!(decode_token(&token, &cfg), Err(AppError::InvalidToken)));
    }

    #[test]
    fn out_of_range_lifetime_fails_to_sign() {
        let cfg = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiry: Duration::from_secs(u64::MAX),
        };
        assert!(matches!(issue_token(&user(), &cfg), Err(AppError::TokenSigningError(_))));
    }
}
