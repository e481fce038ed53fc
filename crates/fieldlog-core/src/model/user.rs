//! User profiles and roles.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};
use crate::types::RecordKey;

/// Access role of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrador,
    Investigador,
    #[default]
    Colaborador,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrador => "administrador",
            Role::Investigador => "investigador",
            Role::Colaborador => "colaborador",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "administrador" => Ok(Role::Administrador),
            "investigador" => Ok(Role::Investigador),
            "colaborador" => Ok(Role::Colaborador),
            _ => Err(InvalidInputError::Role {
                value: s.to_string(),
            }
            .into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

/// A user profile stored at `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    /// Absent for identity providers that do not share an email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub status: UserStatus,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn is_inactive(&self) -> bool {
        self.status == UserStatus::Inactive
    }

    /// "First Last", trimmed.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// A stored profile together with its uid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: RecordKey,

    #[serde(flatten)]
    pub profile: UserProfile,
}

/// Split a provider display name into first name and the rest.
///
/// `"Ada Lovelace King"` becomes `("Ada", "Lovelace King")`.
pub fn split_display_name(name: Option<&str>) -> (String, String) {
    let Some(name) = name else {
        return (String::new(), String::new());
    };
    let mut parts = name.split(' ');
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("Investigador".parse::<Role>().unwrap(), Role::Investigador);
        assert_eq!("ADMINISTRADOR".parse::<Role>().unwrap(), Role::Administrador);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn profile_wire_format() {
        let profile = UserProfile {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: Some("ada@example.com".into()),
            photo_url: Some("https://img/ada.jpg".into()),
            role: Role::Investigador,
            status: UserStatus::Active,
            extra: Map::new(),
        };

        assert_eq!(
            profile.to_value().unwrap(),
            json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "photoURL": "https://img/ada.jpg",
                "role": "investigador",
                "status": "active"
            })
        );
    }

    #[test]
    fn split_names() {
        assert_eq!(
            split_display_name(Some("Ada Lovelace King")),
            ("Ada".to_string(), "Lovelace King".to_string())
        );
        assert_eq!(
            split_display_name(Some("Plato")),
            ("Plato".to_string(), String::new())
        );
        assert_eq!(split_display_name(None), (String::new(), String::new()));
    }
}
