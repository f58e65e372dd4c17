use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Identity remembered across restarts and carried between screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub username: String,
    pub is_admin: bool,
}

impl From<&User> for UserSession {
    fn from(u: &User) -> Self {
        Self {
            username: u.username.clone(),
            is_admin: u.is_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            username: u.username,
            email: u.email,
            is_admin: u.is_admin,
            created_at: u.created_at,
        }
    }
}

/// The reserved username "admin" (any case) registers as an administrator.
pub fn grants_admin(username: &str) -> bool {
    username.trim().to_lowercase() == "admin"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_username_is_case_insensitive() {
        assert!(grants_admin("admin"));
        assert!(grants_admin("ADMIN"));
        assert!(grants_admin("Admin"));
        assert!(!grants_admin("administrator"));
        assert!(!grants_admin("maria"));
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User {
            username: "maria".into(),
            email: "maria@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            is_admin: false,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(UserSession::from(&user).username, "maria");
    }
}
