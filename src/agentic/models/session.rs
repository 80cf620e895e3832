use serde::{Deserialize, Serialize};

/// Login state. Everything else in the client is gated on it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub logged_in: bool,
    pub user_id: Option<String>,
}

impl Session {
    pub fn logged_in(user_id: String) -> Self {
        Self {
            logged_in: true,
            user_id: Some(user_id),
        }
    }

    /// The user id, only while logged in
    pub fn active_user(&self) -> Option<&str> {
        if self.logged_in {
            self.user_id.as_deref()
        } else {
            None
        }
    }
}

/// Body of `POST /api/authenticate`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl AuthResponse {
    /// Only a positive answer that carries a user id opens a session
    pub fn accepted_user(self) -> Option<String> {
        if self.authenticated {
            self.user_id.filter(|id| !id.is_empty())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_user_requires_both_fields() {
        let ok: AuthResponse =
            serde_json::from_str(r#"{"authenticated":true,"user_id":"u1"}"#).unwrap();
        assert_eq!(ok.accepted_user().as_deref(), Some("u1"));

        let no_id: AuthResponse = serde_json::from_str(r#"{"authenticated":true}"#).unwrap();
        assert_eq!(no_id.accepted_user(), None);

        let denied: AuthResponse =
            serde_json::from_str(r#"{"authenticated":false,"user_id":"u1"}"#).unwrap();
        assert_eq!(denied.accepted_user(), None);
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let request = AuthRequest {
            username: "demo".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{request:?}").contains("hunter2"));
    }

    #[test]
    fn test_active_user_only_when_logged_in() {
        assert_eq!(Session::default().active_user(), None);
        assert_eq!(Session::logged_in("u1".into()).active_user(), Some("u1"));
    }
}
