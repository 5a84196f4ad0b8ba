//! HS256 JWT issuance and validation.
//!
//! Decoding verifies signature and issuer only; expiry is checked
//! separately so callers can tell an expired token from a forged one.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use miala_core::models::permission::Permission;
use miala_core::models::role::Role;
use miala_core::models::user::User;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Claims carried by access and refresh tokens. Refresh tokens leave
/// `roles` and `permissions` empty, and they are then omitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

impl Claims {
    /// True only when `exp` is present and strictly after `now`.
    pub fn is_not_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp.is_some_and(|exp| exp > now.timestamp())
    }
}

/// Role and permission names granted to a user, sorted and unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Authorities {
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl Authorities {
    /// Flatten the user's roles and the permissions reachable through
    /// them into name lists.
    pub fn resolve(roles: &[Role], permissions: &[Permission]) -> Self {
        let roles: BTreeSet<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        let permissions: BTreeSet<&str> = permissions.iter().map(|p| p.name.as_str()).collect();
        Self {
            roles: roles.into_iter().map(String::from).collect(),
            permissions: permissions.into_iter().map(String::from).collect(),
        }
    }
}

/// Signs and verifies tokens with the configured shared secret.
#[derive(Clone)]
pub struct TokenEngine {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenEngine {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();
        validation.set_issuer(&[&config.jwt_issuer]);

        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            issuer: config.jwt_issuer.clone(),
            access_ttl: Duration::seconds(config.access_token_lifetime_secs as i64),
            refresh_ttl: Duration::seconds(config.refresh_token_lifetime_secs as i64),
        }
    }

    pub fn issue_access_token(
        &self,
        user: &User,
        authorities: &Authorities,
    ) -> Result<String, AuthError> {
        self.issue_access_token_at(user, authorities, Utc::now())
    }

    pub fn issue_access_token_at(
        &self,
        user: &User,
        authorities: &Authorities,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            roles: authorities.roles.clone(),
            permissions: authorities.permissions.clone(),
            ..self.identity_claims(user, now, self.access_ttl)
        };
        self.sign(&claims)
    }

    pub fn issue_refresh_token(&self, user: &User) -> Result<String, AuthError> {
        self.issue_refresh_token_at(user, Utc::now())
    }

    pub fn issue_refresh_token_at(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        self.sign(&self.identity_claims(user, now, self.refresh_ttl))
    }

    /// Verify signature, structure and issuer. Expiry is not enforced.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::TokenInvalid(e.to_string()))
    }

    /// Username carried in `sub`.
    pub fn subject(&self, token: &str) -> Result<String, AuthError> {
        self.decode(token)?
            .sub
            .filter(|sub| !sub.trim().is_empty())
            .ok_or(AuthError::MissingSubject)
    }

    pub fn is_not_expired(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.decode(token)?.is_not_expired_at(Utc::now()))
    }

    pub fn access_token_lifetime_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    fn identity_claims(&self, user: &User, now: DateTime<Utc>, ttl: Duration) -> Claims {
        Claims {
            sub: Some(user.username.clone()),
            iss: Some(self.issuer.clone()),
            iat: Some(now.timestamp()),
            exp: Some((now + ttl).timestamp()),
            ..Claims::default()
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }
}

/// Render a token for logs: first and last four characters only.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "****".into();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use miala_core::models::role::RoleType;
    use uuid::Uuid;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-with-enough-entropy-for-hs256".into(),
            jwt_issuer: "miala-test".into(),
            ..AuthConfig::default()
        }
    }

    fn test_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "novaD123".into(),
            email: "a@b.com".into(),
            password_hash: String::new(),
            firstname: "Nova".into(),
            lastname: "Tech".into(),
            role_ids: Default::default(),
            phone_numbers: vec![],
            active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn role(name: &str) -> Role {
        let now = Utc::now();
        Role {
            id: Uuid::new_v4(),
            name: name.into(),
            role_type: RoleType::User,
            default_role: true,
            description: String::new(),
            permission_ids: Default::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn permission(name: &str) -> Permission {
        let now = Utc::now();
        Permission {
            id: Uuid::new_v4(),
            name: name.into(),
            permission_type: RoleType::User,
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn access_token_carries_identity_and_authorities() {
        let engine = TokenEngine::new(&test_config());
        let authorities = Authorities::resolve(
            &[role("USER")],
            &[permission("phone:write"), permission("phone:read")],
        );

        let token = engine
            .issue_access_token(&test_user(), &authorities)
            .unwrap();
        let claims = engine.decode(&token).unwrap();

        assert_eq!(claims.sub.as_deref(), Some("novaD123"));
        assert_eq!(claims.iss.as_deref(), Some("miala-test"));
        assert_eq!(claims.roles, vec!["USER"]);
        assert_eq!(claims.permissions, vec!["phone:read", "phone:write"]);
        assert_eq!(claims.exp.unwrap() - claims.iat.unwrap(), 900);
    }

    #[test]
    fn refresh_token_has_identity_claims_only() {
        let engine = TokenEngine::new(&test_config());
        let token = engine.issue_refresh_token(&test_user()).unwrap();
        let claims = engine.decode(&token).unwrap();

        assert!(claims.roles.is_empty());
        assert!(claims.permissions.is_empty());
        assert_eq!(claims.exp.unwrap() - claims.iat.unwrap(), 604_800);
    }

    #[test]
    fn authorities_are_deduplicated() {
        let authorities = Authorities::resolve(
            &[role("USER"), role("USER")],
            &[permission("phone:read"), permission("phone:read")],
        );
        assert_eq!(authorities.roles, vec!["USER"]);
        assert_eq!(authorities.permissions, vec!["phone:read"]);
    }

    #[test]
    fn decode_does_not_enforce_expiry() {
        let engine = TokenEngine::new(&test_config());
        let issued = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let token = engine
            .issue_access_token_at(&test_user(), &Authorities::default(), issued)
            .unwrap();

        let claims = engine.decode(&token).unwrap();
        assert!(!claims.is_not_expired_at(Utc::now()));
        assert!(!engine.is_not_expired(&token).unwrap());
        assert_eq!(engine.subject(&token).unwrap(), "novaD123");
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let claims = Claims {
            exp: Some(now.timestamp()),
            ..Claims::default()
        };
        assert!(!claims.is_not_expired_at(now));
        assert!(claims.is_not_expired_at(now - Duration::seconds(1)));
        assert!(!Claims::default().is_not_expired_at(now));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let engine = TokenEngine::new(&test_config());
        let other = TokenEngine::new(&AuthConfig {
            jwt_secret: "another-secret-entirely-different-value".into(),
            ..test_config()
        });
        let token = other.issue_refresh_token(&test_user()).unwrap();

        assert!(matches!(
            engine.decode(&token),
            Err(AuthError::TokenInvalid(_))
        ));
        assert!(matches!(
            engine.decode("not.a.jwt"),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn missing_subject_is_reported() {
        let engine = TokenEngine::new(&test_config());
        let claims = Claims {
            iss: Some("miala-test".into()),
            exp: Some(Utc::now().timestamp() + 60),
            ..Claims::default()
        };
        let token = engine.sign(&claims).unwrap();
        assert!(matches!(
            engine.subject(&token),
            Err(AuthError::MissingSubject)
        ));
    }

    #[test]
    fn mask_token_keeps_edges() {
        assert_eq!(mask_token("abcdefghijkl"), "abcd...ijkl");
        assert_eq!(mask_token("short"), "****");
    }
}
