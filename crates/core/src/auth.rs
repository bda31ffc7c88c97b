//! Password hashing, bearer tokens and the authenticated caller.
//!
//! Password hashes are PBKDF2-HMAC-SHA256 with a per-password random salt, encoded as
//! `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>` so the work factor can change without
//! invalidating stored hashes.
//!
//! Tokens are compact HS256 JWTs (`header.claims.signature`, base64url without padding).

use crate::models::{Role, User};
use crate::{CoreConfig, HmsError, HmsResult};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use hms_uuid::RecordId;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const MAX_HASH_LEN: usize = 64;

const GENERATED_PASSWORD_BYTES: usize = 6;
const GENERATED_PASSWORD_MAX_LEN: usize = 10;
const GENERATED_PASSWORD_MIN_LEN: usize = 6;

pub fn hash_password(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);

    format!(
        "{HASH_SCHEME}${iterations}${}${}",
        STANDARD.encode(salt),
        STANDARD.encode(hash)
    )
}

/// Checks `password` against an encoded hash. Malformed encodings never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let parts: Vec<&str> = encoded.split('$').collect();
    let [scheme, iterations, salt, expected] = parts.as_slice() else {
        return false;
    };
    if *scheme != HASH_SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (STANDARD.decode(salt), STANDARD.decode(expected)) else {
        return false;
    };
    if iterations == 0 || expected.is_empty() || expected.len() > MAX_HASH_LEN {
        return false;
    }

    let mut derived = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut derived);
    derived.ct_eq(&expected).into()
}

/// A short random password for provisioned doctor and patient accounts.
///
/// Six random bytes are base64-encoded and stripped to alphanumerics; draws that leave fewer
/// than six characters are repeated.
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    loop {
        let mut bytes = [0u8; GENERATED_PASSWORD_BYTES];
        rng.fill_bytes(&mut bytes);
        let password: String = STANDARD
            .encode(bytes)
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(GENERATED_PASSWORD_MAX_LEN)
            .collect();
        if password.len() >= GENERATED_PASSWORD_MIN_LEN {
            return password;
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: RecordId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

const ALG: &str = "HS256";

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    key: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            ttl,
        }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(cfg.jwt_secret(), cfg.token_ttl())
    }

    fn mac(&self) -> HmsResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| HmsError::SignerInit(e.to_string()))
    }

    pub fn issue(&self, user: &User) -> HmsResult<String> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> HmsResult<String> {
        let claims = Claims {
            sub: user.id,
            role: user.role,
            username: user.username.clone(),
            email: user.email.as_ref().map(|e| e.to_string()),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let header = Header {
            alg: ALG.into(),
            typ: "JWT".into(),
        };

        let header_b64 =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).map_err(HmsError::Serialization)?);
        let claims_b64 =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).map_err(HmsError::Serialization)?);
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    pub fn verify(&self, token: &str) -> HmsResult<Claims> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> HmsResult<Claims> {
        let invalid = || HmsError::Unauthenticated("Invalid token".into());

        let parts: Vec<&str> = token.split('.').collect();
        let [header_b64, claims_b64, signature_b64] = parts.as_slice() else {
            return Err(invalid());
        };

        let header_json = URL_SAFE_NO_PAD.decode(header_b64).map_err(|_| invalid())?;
        let header: Header = serde_json::from_slice(&header_json).map_err(|_| invalid())?;
        if header.alg != ALG {
            return Err(invalid());
        }

        let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|_| invalid())?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature).map_err(|_| invalid())?;

        let claims_json = URL_SAFE_NO_PAD.decode(claims_b64).map_err(|_| invalid())?;
        let claims: Claims = serde_json::from_slice(&claims_json).map_err(|_| invalid())?;
        if claims.exp <= now.timestamp() {
            return Err(HmsError::Unauthenticated("Token expired".into()));
        }
        Ok(claims)
    }
}

/// The authenticated caller of an operation, taken from verified token claims.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: RecordId,
    pub role: Role,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl From<Claims> for Actor {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            username: claims.username,
            email: claims.email,
        }
    }
}

impl Actor {
    pub fn require_any(&self, roles: &[Role]) -> HmsResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(HmsError::Forbidden("Access denied".into()))
        }
    }

    /// Username if the account has one, else its email.
    pub fn identity(&self) -> Option<&str> {
        self.username.as_deref().or(self.email.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: RecordId::new(),
            username: Some("dr.anjalibhatt".into()),
            email: None,
            password_hash: String::new(),
            role,
            doctor_id: None,
            patient_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_verifies_only_its_password() {
        let encoded = hash_password("doctor123", 1_000);
        assert!(encoded.starts_with("pbkdf2-sha256$1000$"));
        assert!(verify_password("doctor123", &encoded));
        assert!(!verify_password("doctor124", &encoded));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "$2a$10$example.hash.for.admin"));
        assert!(!verify_password("x", "pbkdf2-sha256$0$AAAA$AAAA"));
    }

    #[test]
    fn generated_passwords_are_short_and_alphanumeric() {
        for _ in 0..100 {
            let pw = generate_password();
            assert!((6..=10).contains(&pw.len()), "{pw}");
            assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let signer = TokenSigner::new("secret", Duration::hours(24));
        let u = user(Role::Doctor);
        let token = signer.issue(&u).unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.role, Role::Doctor);
        assert_eq!(claims.username.as_deref(), Some("dr.anjalibhatt"));
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let signer = TokenSigner::new("secret", Duration::hours(1));
        let other = TokenSigner::new("other-secret", Duration::hours(1));
        let token = signer.issue(&user(Role::Patient)).unwrap();

        assert!(other.verify(&token).is_err());

        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let forged = Claims {
            sub: RecordId::new(),
            role: Role::Admin,
            username: None,
            email: None,
            iat: 0,
            exp: i64::MAX,
        };
        parts[1] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        assert!(signer.verify(&parts.join(".")).is_err());
        assert!(signer.verify("not-a-token").is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let signer = TokenSigner::new("secret", Duration::hours(1));
        let issued = Utc::now() - Duration::hours(2);
        let token = signer.issue_at(&user(Role::Admin), issued).unwrap();
        let err = signer.verify(&token).unwrap_err();
        assert_eq!(err.to_string(), "Token expired");
    }

    #[test]
    fn actor_role_guard() {
        let actor = Actor {
            user_id: RecordId::new(),
            role: Role::Receptionist,
            username: None,
            email: Some("reception1@hms.com".into()),
        };
        assert!(actor.require_any(&[Role::Admin, Role::Receptionist]).is_ok());
        assert!(matches!(
            actor.require_any(&[Role::Admin]),
            Err(HmsError::Forbidden(_))
        ));
        assert_eq!(actor.identity(), Some("reception1@hms.com"));
    }
}
