//! User model for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Third-party ride-hailing service a user can link an access token for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    Uber,
    Ola,
    MeruCabs,
    Rapido,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Uber,
        Provider::Ola,
        Provider::MeruCabs,
        Provider::Rapido,
    ];

    /// Wire name, as sent by clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Uber => "UBER",
            Provider::Ola => "OLA",
            Provider::MeruCabs => "MERUCABS",
            Provider::Rapido => "RAPIDO",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown provider '{}': expected one of UBER, OLA, MERUCABS, RAPIDO",
                    s
                )
            })
    }
}

/// User account stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user ID (also used as document ID)
    pub id: String,
    pub email: String,
    pub name: String,
    /// Ten-digit phone number, unique across users
    pub phone_number: String,
    /// Linked provider access tokens
    #[serde(default)]
    pub uber_access_token: Option<String>,
    #[serde(default)]
    pub ola_access_token: Option<String>,
    #[serde(default)]
    pub merucabs_access_token: Option<String>,
    #[serde(default)]
    pub rapido_access_token: Option<String>,
    /// When the account was created (RFC 3339)
    pub created_at: String,
    /// Last modification (RFC 3339)
    pub updated_at: String,
}

impl User {
    /// New account with a fresh random ID and no linked providers.
    pub fn new(email: String, name: String, phone_number: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            name,
            phone_number,
            uber_access_token: None,
            ola_access_token: None,
            merucabs_access_token: None,
            rapido_access_token: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn token_slot_mut(&mut self, provider: Provider) -> &mut Option<String> {
        match provider {
            Provider::Uber => &mut self.uber_access_token,
            Provider::Ola => &mut self.ola_access_token,
            Provider::MeruCabs => &mut self.merucabs_access_token,
            Provider::Rapido => &mut self.rapido_access_token,
        }
    }

    /// Linked access token for a provider, if any.
    pub fn access_token(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Uber => self.uber_access_token.as_deref(),
            Provider::Ola => self.ola_access_token.as_deref(),
            Provider::MeruCabs => self.merucabs_access_token.as_deref(),
            Provider::Rapido => self.rapido_access_token.as_deref(),
        }
    }

    /// Link (or replace) the access token for a provider.
    pub fn set_access_token(&mut self, provider: Provider, token: String) {
        *self.token_slot_mut(provider) = Some(token);
        self.touch();
    }

    /// Clear the access token for a provider.
    pub fn unlink_access_token(&mut self, provider: Provider) {
        *self.token_slot_mut(provider) = None;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}
