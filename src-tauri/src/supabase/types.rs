use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    /// Local part of the email, as shown in the navigation bar.
    pub fn display_name(&self) -> String {
        match self.email.as_deref() {
            Some(email) => email.split('@').next().unwrap_or(email).to_string(),
            None => "Account".to_string(),
        }
    }
}

/// A signed-in session as issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix seconds. Filled from `expires_in` when the provider omits it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

/// Margin before the real expiry at which the token is treated as stale.
const EXPIRY_MARGIN_SECS: i64 = 30;

impl Session {
    /// Ensure `expires_at` is set, deriving it from `expires_in` if needed.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            let ttl = self.expires_in.unwrap_or(3600);
            self.expires_at = Some((now + Duration::seconds(ttl)).timestamp());
        }
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => now.timestamp() + EXPIRY_MARGIN_SECS >= at,
            None => false,
        }
    }
}

/// Result of a sign-up: providers with email confirmation enabled return a
/// user without a session.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: User,
    pub session: Option<Session>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(expires_at: Option<i64>, expires_in: Option<i64>) -> Session {
        Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in,
            expires_at,
            user: User {
                id: "u".to_string(),
                email: Some("jane.doe@example.com".to_string()),
            },
        }
    }

    #[test]
    fn test_display_name_is_email_local_part() {
        let s = session(None, None);
        assert_eq!(s.user.display_name(), "jane.doe");
        let anonymous = User {
            id: "x".to_string(),
            email: None,
        };
        assert_eq!(anonymous.display_name(), "Account");
    }

    #[test]
    fn test_stamped_derives_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let s = session(None, Some(600)).stamped(now);
        assert_eq!(s.expires_at, Some(now.timestamp() + 600));
        assert!(!s.is_expired(now));
        assert!(s.is_expired(now + Duration::seconds(590)));
    }

    #[test]
    fn test_stamped_keeps_provider_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let s = session(Some(42), Some(600)).stamped(now);
        assert_eq!(s.expires_at, Some(42));
        assert!(s.is_expired(now));
    }

    #[test]
    fn test_session_parses_provider_payload() {
        let json = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1767268800,
            "refresh_token": "refresh",
            "user": {"id": "b1f1", "email": "a@b.co", "role": "authenticated"}
        }"#;
        let s: Session = serde_json::from_str(json).unwrap();
        assert_eq!(s.user.id, "b1f1");
        assert_eq!(s.expires_at, Some(1767268800));
    }
}
