use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Disconnected,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "DISCONNECTED",
            ConnectionStatus::Connected => "CONNECTED",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DISCONNECTED" => Ok(ConnectionStatus::Disconnected),
            "CONNECTED" => Ok(ConnectionStatus::Connected),
            other => Err(format!("unknown connection status {other}")),
        }
    }
}

/// A row of the `users` table. Owned by the credential store; the password
/// hash never leaves the server.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub username: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub auth: ConnectionStatus,
    pub auth_last_at: Option<DateTime<Utc>>,
    pub credits: i64,
}

impl UserRecord {
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.email == identifier || self.username == identifier
    }

    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            credits: self.credits,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub username: String,
    pub credits: i64,
}
