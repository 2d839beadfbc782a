use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marketplace role carried in the user's metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
    Tenant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Agent => "agent",
            Role::Tenant => "tenant",
        }
    }

    /// Role given to a mock sign-in: picked from a literal "admin"/"agent"
    /// in the email address, tenant otherwise.
    pub fn from_email(email: &str) -> Role {
        if email.contains("admin") {
            Role::Admin
        } else if email.contains("agent") {
            Role::Agent
        } else {
            Role::Tenant
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "agent" => Ok(Role::Agent),
            "tenant" => Ok(Role::Tenant),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Profile fields stored in the auth user's metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Kept as free text: the backend does not constrain it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// An authenticated principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "user_metadata", default)]
    pub metadata: UserMetadata,
}

impl User {
    /// Role derived from metadata. A missing or unrecognised role reads as tenant.
    pub fn role(&self) -> Role {
        self.metadata
            .role
            .as_deref()
            .and_then(|r| r.parse().ok())
            .unwrap_or(Role::Tenant)
    }

    pub fn display_name(&self) -> String {
        if let Some(name) = self.metadata.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        let full = [&self.metadata.first_name, &self.metadata.last_name]
            .iter()
            .filter_map(|part| part.as_deref())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.trim().is_empty() {
            return full.trim().to_string();
        }
        self.email.clone().unwrap_or_else(|| self.id.clone())
    }
}

/// Live session handed out by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

/// Row of the `profiles` table, keyed by auth user id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Profile row for a freshly signed-up user
    pub fn for_new_user(user: &User, now: DateTime<Utc>) -> Self {
        let meta = &user.metadata;
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            role: Some(user.role().to_string()),
            name: meta.name.clone(),
            first_name: meta.first_name.clone(),
            last_name: meta.last_name.clone(),
            company: meta.company.clone(),
            phone: meta.phone.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}
