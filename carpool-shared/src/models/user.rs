use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::pii::Masked;

/// The two capabilities a user can hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Driver,
    Passenger,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Driver => "DRIVER",
            Role::Passenger => "PASSENGER",
        }
    }

    /// Case-insensitive parse of `DRIVER` / `PASSENGER`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DRIVER" => Some(Role::Driver),
            "PASSENGER" => Some(Role::Passenger),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller, as vouched for by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Masked<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email: Masked(email),
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("driver"), Some(Role::Driver));
        assert_eq!(Role::parse(" Passenger "), Some(Role::Passenger));
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn test_user_serialization_omits_password() {
        let user = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "salt$hash".to_string(),
            Role::Driver,
        );
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "DRIVER");
        assert_eq!(json["email"], "alice@example.com");
    }
}
