use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An authenticated root user and the bearer token issued to them.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn new<S: Into<String>>(token: S, user: User) -> Self {
        Session {
            token: token.into(),
            user,
        }
    }
}

/// The profile of a root user, as returned by the backend.
///
/// Fields the backend sends which aren't modelled here are kept in
/// [`User::extra`] so they survive a trip through the session store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn with_id(id: u64) -> Self {
        User {
            id,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_user_serializes_without_nulls() {
        let got = serde_json::to_value(User::with_id(1)).unwrap();

        assert_eq!(got, json!({ "id": 1 }));
    }

    #[test]
    fn unknown_profile_fields_are_preserved() {
        let src = json!({
            "id": 7,
            "email": "keeper@example.com",
            "created_at": "2024-01-15T10:00:00",
            "is_active": true,
        });

        let user: User = serde_json::from_value(src.clone()).unwrap();

        assert_eq!(user.email.as_deref(), Some("keeper@example.com"));
        assert_eq!(user.extra["is_active"], json!(true));
        assert_eq!(serde_json::to_value(&user).unwrap(), src);
    }
}
