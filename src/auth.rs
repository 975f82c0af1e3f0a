//! Credential check and session token issuance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::credential_store::{CredentialStore, StoreError};
use crate::data_structs::requests::login_request::LoginRequest;
use crate::data_structs::user::PublicProfile;
use crate::encrypted_signing::{JWTSecretKey, SessionClaims, TokenError};

/// Why a login was refused. Logged, never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    UnknownIdentifier,
    NoPasswordSet,
    PasswordMismatch,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Identifier and password are required")]
    BadRequest,
    #[error("Invalid credentials")]
    InvalidCredentials(CredentialFailure),
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// A successful login: the profile to return and the token to set.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: PublicProfile,
    pub token: String,
    pub claims: SessionClaims,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    jwt_secret: JWTSecretKey,
}

impl AuthService {

    pub fn new(store: Arc<dyn CredentialStore>, jwt_secret: JWTSecretKey) -> Self {
        AuthService { store, jwt_secret }
    }

    pub async fn authenticate(&self, request: &LoginRequest) -> Result<AuthenticatedSession, AuthError> {
        self.authenticate_at(request, Utc::now()).await
    }

    /// Reads once, and writes the connected status only after the password
    /// has been verified.
    pub async fn authenticate_at(&self, request: &LoginRequest, now: DateTime<Utc>) -> Result<AuthenticatedSession, AuthError> {
        let (identifier, password) = request.credentials().ok_or(AuthError::BadRequest)?;

        let user = self.store.find_by_identifier(identifier).await?
            .ok_or(AuthError::InvalidCredentials(CredentialFailure::UnknownIdentifier))?;

        let password_hash = user.password_hash.clone()
            .ok_or(AuthError::InvalidCredentials(CredentialFailure::NoPasswordSet))?;

        if !verify_password(password.to_string(), password_hash).await? {
            return Err(AuthError::InvalidCredentials(CredentialFailure::PasswordMismatch));
        }

        let claims = SessionClaims::for_user(&user, now);
        let token = self.jwt_secret.sign_claims(&claims)?;

        self.store.mark_connected(&user.id, now).await?;
        log::info!("user {} connected", user.id);

        Ok(AuthenticatedSession {
            user: user.public_profile(),
            token,
            claims,
        })
    }

    /// Resolves a session token to the current profile.
    pub async fn profile(&self, token: &str, now: DateTime<Utc>) -> Result<PublicProfile, AuthError> {
        let claims = self.jwt_secret.verify(token, now).map_err(|e| {
            log::debug!("rejected session token: {e}");
            AuthError::NotAuthenticated
        })?;
        let user = self.store.find_by_id(&claims.sub).await?
            .ok_or(AuthError::NotAuthenticated)?;
        Ok(user.public_profile())
    }

    /// Marks the token's user disconnected. Returns `false` when the token
    /// does not verify; the cookie is cleared either way by the caller.
    pub async fn logout(&self, token: &str, now: DateTime<Utc>) -> Result<bool, AuthError> {
        let claims = match self.jwt_secret.verify(token, now) {
            Ok(claims) => claims,
            Err(_) => return Ok(false),
        };
        match self.store.mark_disconnected(&claims.sub).await {
            Ok(()) => Ok(true),
            Err(StoreError::UserNotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

// bcrypt runs on the blocking pool
async fn verify_password(password: String, password_hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .map_err(|e| AuthError::Internal(e.to_string()))
}
