//! The signed-in user's identity record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Named permission bundle attached to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub role_name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Fields the portal does not interpret, kept as received.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Role {
    pub fn new(role_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            permissions: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission || p == "*")
    }
}

/// User record as returned by the login endpoint and persisted under `user`.
///
/// Unknown fields round-trip untouched through `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Forces the credential-setup step before normal access.
    #[serde(default)]
    pub first_login: bool,
    pub role: Role,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Why a stored or received identity cannot back a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityDefect {
    MissingId,
    MissingRoleName,
}

impl std::fmt::Display for IdentityDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityDefect::MissingId => f.write_str("identity has no id"),
            IdentityDefect::MissingRoleName => f.write_str("identity has no role.roleName"),
        }
    }
}

impl Identity {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
            first_login: false,
            role,
            extra: Map::new(),
        }
    }

    pub fn role_name(&self) -> &str {
        &self.role.role_name
    }

    /// Name to show in the UI: display name, then email, then id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }

    pub fn validate(&self) -> Result<(), IdentityDefect> {
        if self.id.trim().is_empty() {
            return Err(IdentityDefect::MissingId);
        }
        if self.role.role_name.trim().is_empty() {
            return Err(IdentityDefect::MissingRoleName);
        }
        Ok(())
    }

    /// Shallow-merge the fields present in `patch`.
    pub fn merged(&self, patch: &UserPatch) -> Identity {
        let mut next = self.clone();
        if let Some(email) = &patch.email {
            next.email = Some(email.clone());
        }
        if let Some(name) = &patch.name {
            next.name = Some(name.clone());
        }
        if let Some(first_login) = patch.first_login {
            next.first_login = first_login;
        }
        if let Some(role) = &patch.role {
            next.role = role.clone();
        }
        for (key, value) in &patch.extra {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                debug!(field = %key, "Ignoring patch of reserved identity field");
                continue;
            }
            next.extra.insert(key.clone(), value.clone());
        }
        next
    }
}

const RESERVED_FIELDS: [&str; 5] = ["id", "email", "name", "firstLogin", "role"];

/// Partial identity update. Absent fields leave the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_login: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserPatch {
    pub fn first_login(first_login: bool) -> Self {
        Self {
            first_login: Some(first_login),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.name.is_none()
            && self.first_login.is_none()
            && self.role.is_none()
            && self.extra.is_empty()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
