use crate::config;

use base64::{STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD, decode_config, encode_config};
use jwt_simple::algorithms::MACLike;
use jwt_simple::prelude::{Claims, Duration as JwtDuration, HS256Key, VerificationOptions};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoleClaims {
    role: Role,
}

/// Verified contents of a session token.
#[derive(Debug, Clone)]
pub struct SessionClaims {
    pub subject: String,
    pub role: Role,
    pub issued_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone)]
pub struct AuthState {
    key: HS256Key,
    issuer: String,
    cookie_name: String,
    token_ttl: time::Duration,
    cookie_secure: bool,
}

#[derive(Debug)]
pub enum AuthError {
    MissingSecret,
    InvalidKey,
    InvalidSignature,
    Expired,
    MissingExpiry,
    MissingSubject,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingSecret => f.write_str("session signing secret is not set"),
            AuthError::InvalidKey => f.write_str("invalid session signing key"),
            AuthError::InvalidSignature => f.write_str("invalid session token"),
            AuthError::Expired => f.write_str("session token has expired"),
            AuthError::MissingExpiry => f.write_str("session token missing expiry"),
            AuthError::MissingSubject => f.write_str("session token missing subject"),
        }
    }
}

impl AuthState {
    pub fn from_config(config: &config::AppConfig) -> Result<Self, AuthError> {
        let auth = &config.auth;
        if auth.key.trim().is_empty() {
            return Err(AuthError::MissingSecret);
        }

        let key_bytes = decode_key(&auth.key)?;
        let key = HS256Key::from_bytes(&key_bytes);

        Ok(Self {
            key,
            issuer: config.app_name.clone(),
            cookie_name: auth.cookie_name.clone(),
            token_ttl: auth.token_ttl,
            cookie_secure: auth.cookie_secure,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn issue_token(&self, subject: &str, role: Role) -> Result<String, AuthError> {
        let ttl_seconds = self.token_ttl.whole_seconds();
        if ttl_seconds <= 0 {
            return Err(AuthError::InvalidKey);
        }
        let claims = Claims::with_custom_claims(
            RoleClaims { role },
            JwtDuration::from_secs(ttl_seconds as u64),
        )
        .with_subject(subject)
        .with_issuer(&self.issuer);
        self.key
            .authenticate(claims)
            .map_err(|_| AuthError::InvalidKey)
    }

    pub fn auth_cookie(&self, token: &str) -> String {
        let max_age = self.token_ttl.whole_seconds().max(0);
        let mut cookie = format!(
            "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}",
            self.cookie_name
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.cookie_name
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn verify_token(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let claims = match self
            .key
            .verify_token::<RoleClaims>(token, Some(self.verification_options()))
        {
            Ok(claims) => claims,
            Err(_) => {
                // A stale token still carries a valid signature; retry with the
                // expiry check effectively disabled to tell the two cases apart.
                let mut lenient = self.verification_options();
                lenient.time_tolerance = Some(JwtDuration::from_secs(u32::MAX as u64));
                return match self.key.verify_token::<RoleClaims>(token, Some(lenient)) {
                    Ok(_) => Err(AuthError::Expired),
                    Err(_) => Err(AuthError::InvalidSignature),
                };
            }
        };

        let expires_at = claims.expires_at.ok_or(AuthError::MissingExpiry)?;
        let issued_at = claims
            .issued_at
            .map(|ts| ts.as_secs() as i64)
            .unwrap_or_default();

        let subject = claims.subject.ok_or(AuthError::MissingSubject)?;
        if subject.trim().is_empty() {
            return Err(AuthError::MissingSubject);
        }

        Ok(SessionClaims {
            subject,
            role: claims.custom.role,
            issued_at,
            expires_at: expires_at.as_secs() as i64,
        })
    }

    fn verification_options(&self) -> VerificationOptions {
        let mut options = VerificationOptions::default();
        options.time_tolerance = Some(JwtDuration::from_secs(0));
        let mut issuers = HashSet::new();
        issuers.insert(self.issuer.clone());
        options.allowed_issuers = Some(issuers);
        options
    }
}

fn decode_key(raw: &str) -> Result<Vec<u8>, AuthError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let decoded = decode_config(trimmed, URL_SAFE_NO_PAD)
        .or_else(|_| decode_config(trimmed, STANDARD))
        .or_else(|_| decode_config(trimmed, STANDARD_NO_PAD))
        .map_err(|_| AuthError::InvalidKey)?;

    if decoded.is_empty() {
        return Err(AuthError::InvalidKey);
    }

    Ok(decoded)
}

pub fn generate_auth_key() -> Result<String, AuthError> {
    let mut rng = OsRng;
    generate_auth_key_with_rng(&mut rng)
}

pub(crate) fn generate_auth_key_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<String, AuthError> {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    let encoded = encode_config(bytes, URL_SAFE_NO_PAD);
    if encoded.is_empty() {
        return Err(AuthError::InvalidKey);
    }
    Ok(encoded)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, AuthConfig};

    const TEST_KEY_BYTES: &[u8] = b"taskara-auth-test-secret";

    fn test_auth_state() -> AuthState {
        let config = AppConfig {
            auth: AuthConfig {
                key: encode_config(TEST_KEY_BYTES, URL_SAFE_NO_PAD),
                token_ttl: time::Duration::days(7),
                cookie_name: "auth".to_string(),
                cookie_secure: false,
            },
            ..Default::default()
        };
        AuthState::from_config(&config).expect("auth state")
    }

    fn unix_now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_secs()
    }

    #[test]
    fn from_config__should_fail_without_secret() {
        // Given
        let config = AppConfig {
            auth: AuthConfig {
                key: String::new(),
                token_ttl: time::Duration::days(7),
                cookie_name: "auth".to_string(),
                cookie_secure: false,
            },
            ..Default::default()
        };

        // When
        let result = AuthState::from_config(&config);

        // Then
        assert!(matches!(result, Err(AuthError::MissingSecret)));
    }

    #[test]
    fn verify_token__should_roundtrip_subject_and_role() {
        // Given
        let auth = test_auth_state();

        // When
        let token = auth.issue_token("user-42", Role::Admin).expect("token");
        let claims = auth.verify_token(&token).expect("claims");

        // Then
        assert_eq!(claims.subject, "user-42");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.expires_at > claims.issued_at);
    }

    #[test]
    fn verify_token__should_reject_expired_token() {
        // Given
        let auth = test_auth_state();
        let key = HS256Key::from_bytes(TEST_KEY_BYTES);
        let now = unix_now();
        let mut claims = Claims::with_custom_claims(
            RoleClaims { role: Role::User },
            JwtDuration::from_secs(60),
        )
        .with_subject("user-42")
        .with_issuer("Taskara");
        claims.issued_at = Some(JwtDuration::from_secs(now - 7200));
        claims.expires_at = Some(JwtDuration::from_secs(now - 3600));
        let token = key.authenticate(claims).expect("token");

        // When
        let result = auth.verify_token(&token);

        // Then
        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[test]
    fn verify_token__should_reject_token_signed_with_other_key() {
        // Given
        let auth = test_auth_state();
        let other_key = HS256Key::from_bytes(b"some-other-secret");
        let claims = Claims::with_custom_claims(
            RoleClaims { role: Role::User },
            JwtDuration::from_secs(60),
        )
        .with_subject("user-42")
        .with_issuer("Taskara");
        let token = other_key.authenticate(claims).expect("token");

        // When
        let result = auth.verify_token(&token);

        // Then
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn verify_token__should_reject_garbage() {
        // Given
        let auth = test_auth_state();

        // When
        let result = auth.verify_token("not-a-token");

        // Then
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn auth_cookie__should_set_session_attributes() {
        // Given
        let auth = test_auth_state();

        // When
        let cookie = auth.auth_cookie("abc");

        // Then
        assert!(cookie.starts_with("auth=abc;"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn clear_cookie__should_expire_immediately() {
        // Given
        let auth = test_auth_state();

        // When
        let cookie = auth.clear_cookie();

        // Then
        assert!(cookie.starts_with("auth=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn generate_auth_key_with_rng__should_match_fixture() {
        // Given
        struct ZeroRng;

        impl RngCore for ZeroRng {
            fn next_u32(&mut self) -> u32 {
                0
            }

            fn next_u64(&mut self) -> u64 {
                0
            }

            fn fill_bytes(&mut self, dest: &mut [u8]) {
                for value in dest.iter_mut() {
                    *value = 0;
                }
            }

            fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
                self.fill_bytes(dest);
                Ok(())
            }
        }

        impl CryptoRng for ZeroRng {}

        let mut rng = ZeroRng;

        // When
        let key = generate_auth_key_with_rng(&mut rng).expect("auth key");

        // Then
        assert_eq!(key, "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
    }
}
