use serde::Deserialize;

/// Body of `POST /api/auth/login`. Both fields are optional on the wire so a
/// missing field reaches the handler and is answered with the 400 body.
#[derive(Debug, Default)]
#[derive(Deserialize)]
pub struct LoginRequest {
    pub identifier: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn new(identifier: &str, password: &str) -> Self {
        LoginRequest {
            identifier: Some(identifier.to_string()),
            password: Some(password.to_string()),
        }
    }

    /// Returns both fields when present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let identifier = self.identifier.as_deref().filter(|s| !s.is_empty())?;
        let password = self.password.as_deref().filter(|s| !s.is_empty())?;
        Some((identifier, password))
    }
}
