use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{AlgorithmType, Header, SignWithKey, Token, Verified, VerifyWithKey};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::data_structs::user::UserRecord;

pub const SESSION_TTL_SECONDS: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid signing key: {0}")]
    Key(String),
    #[error("token error: {0}")]
    Jwt(#[from] jwt::Error),
    #[error("token expired")]
    Expired,
}

/// Claims carried by the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn for_user(user: &UserRecord, issued_at: DateTime<Utc>) -> Self {
        SessionClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(SESSION_TTL_SECONDS)).timestamp(),
        }
    }
}

#[derive(Clone)]
pub struct JWTSecretKey {
    secret_key: String,
}

impl std::fmt::Debug for JWTSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JWTSecretKey").finish_non_exhaustive()
    }
}

impl JWTSecretKey {

    pub fn new(secret_key: String) -> JWTSecretKey {
        return JWTSecretKey {
            secret_key
        };
    }

    /// A random key for runs without a configured secret. Tokens signed with
    /// it do not survive a restart.
    pub fn ephemeral() -> JWTSecretKey {
        let secret: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        return JWTSecretKey::new(secret);
    }

    fn key(&self) -> Result<Hmac<Sha256>, TokenError> {
        Hmac::new_from_slice(self.secret_key.as_bytes()).map_err(|e| TokenError::Key(e.to_string()))
    }

    pub fn sign_claims(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        let key = self.key()?;
        let header = Header {
            algorithm: AlgorithmType::Hs256,
            ..Default::default()
        };
        let token = Token::new(header, claims).sign_with_key(&key)?;
        Ok(token.as_str().to_string())
    }

    /// Checks the signature and the expiry. There is no revocation list, so
    /// any unexpired token with a valid signature is accepted.
    pub fn verify(&self, str_token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let key = self.key()?;
        let token: Token<Header, SessionClaims, Verified> = str_token.verify_with_key(&key)?;
        let claims = token.claims().clone();
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structs::user::ConnectionStatus;

    fn alice() -> UserRecord {
        UserRecord {
            id: "user-1".to_string(),
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            name: "Alice".to_string(),
            password_hash: None,
            auth: ConnectionStatus::Disconnected,
            auth_last_at: None,
            credits: 150,
        }
    }

    #[test]
    fn signed_token_round_trips_within_seven_days() {
        let key = JWTSecretKey::new("test-secret".to_string());
        let now = Utc::now();
        let claims = SessionClaims::for_user(&alice(), now);
        assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECONDS);

        let token = key.sign_claims(&claims).unwrap();
        let verified = key.verify(&token, now + Duration::days(6)).unwrap();
        assert_eq!(verified.sub, "user-1");
        assert_eq!(verified.email, "alice@example.com");
        assert_eq!(verified.username, "alice");
    }

    #[test]
    fn expired_token_is_rejected() {
        let key = JWTSecretKey::new("test-secret".to_string());
        let now = Utc::now();
        let token = key.sign_claims(&SessionClaims::for_user(&alice(), now)).unwrap();
        let later = now + Duration::seconds(SESSION_TTL_SECONDS);
        assert!(matches!(key.verify(&token, later), Err(TokenError::Expired)));
    }

    #[test]
    fn token_from_another_key_is_rejected() {
        let now = Utc::now();
        let token = JWTSecretKey::new("one".to_string())
            .sign_claims(&SessionClaims::for_user(&alice(), now))
            .unwrap();
        assert!(JWTSecretKey::new("two".to_string()).verify(&token, now).is_err());
        assert!(JWTSecretKey::ephemeral().verify("not-a-token", now).is_err());
    }
}
