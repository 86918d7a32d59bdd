use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Identity carried inside a session token.
///
/// This is the only information the HTTP layer trusts about a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaim {
    pub subject_id: i64,
    pub display_name: String,
}

impl IdentityClaim {
    pub fn new(subject_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            subject_id,
            display_name: display_name.into(),
        }
    }
}

/// Wire payload of a session token.
///
/// Field names are kept short (`id`, `name`) so tokens stay compatible with
/// clients that already decode them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject user id
    pub id: i64,

    /// Display name of the subject
    pub name: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl TokenClaims {
    /// Build claims for `claim` valid for `ttl` starting at `issued_at`.
    pub fn new(claim: &IdentityClaim, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: claim.subject_id,
            name: claim.display_name.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    /// A token stops being valid at the exact second of `exp`.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp <= current_timestamp
    }

    pub fn identity(&self) -> IdentityClaim {
        IdentityClaim {
            subject_id: self.id,
            display_name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_new_claims() {
        let issued_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let claim = IdentityClaim::new(7, "alice");

        let claims = TokenClaims::new(&claim, issued_at, Duration::seconds(3600));

        assert_eq!(claims.id, 7);
        assert_eq!(claims.name, "alice");
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.identity(), claim);
    }

    #[test]
    fn test_is_expired() {
        let claims = TokenClaims {
            id: 1,
            name: "alice".to_string(),
            iat: 0,
            exp: 1000,
        };

        assert!(!claims.is_expired(999)); // Not expired
        assert!(claims.is_expired(1000)); // Exactly at expiration
        assert!(claims.is_expired(1001)); // Expired
    }

    #[test]
    fn test_wire_field_names() {
        let claims = TokenClaims {
            id: 3,
            name: "bob".to_string(),
            iat: 10,
            exp: 20,
        };

        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "id": 3, "name": "bob", "iat": 10, "exp": 20 })
        );
    }
}
