//! Form nonces tied to an action, a user and a time window.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

use crate::domain::sites::UserId;

/// A nonce stays valid for two ticks of this length.
pub const TICK_SECONDS: i64 = 12 * 60 * 60;
const NONCE_LEN: usize = 10;

#[derive(Clone)]
pub struct NonceIssuer {
    secret: String,
}

impl NonceIssuer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn tick_at(at: OffsetDateTime) -> i64 {
        at.unix_timestamp().div_euclid(TICK_SECONDS) + 1
    }

    pub fn create(&self, action: &str, user: Option<UserId>) -> String {
        self.create_at(action, user, OffsetDateTime::now_utc())
    }

    pub fn create_at(&self, action: &str, user: Option<UserId>, at: OffsetDateTime) -> String {
        self.digest(Self::tick_at(at), action, user)
    }

    pub fn verify(&self, nonce: &str, action: &str, user: Option<UserId>) -> bool {
        self.verify_at(nonce, action, user, OffsetDateTime::now_utc())
    }

    /// Accepts nonces from the current tick and the one before it.
    pub fn verify_at(
        &self,
        nonce: &str,
        action: &str,
        user: Option<UserId>,
        at: OffsetDateTime,
    ) -> bool {
        let tick = Self::tick_at(at);
        [tick, tick - 1].into_iter().any(|candidate| {
            let expected = self.digest(candidate, action, user);
            expected.as_bytes().ct_eq(nonce.as_bytes()).unwrap_u8() == 1
        })
    }

    fn digest(&self, tick: i64, action: &str, user: Option<UserId>) -> String {
        let uid = user.map_or(0, |user| user.0);
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(format!("{tick}|{action}|{uid}").as_bytes());
        let encoded = hex::encode(hasher.finalize());
        let end = encoded.len() - 2;
        encoded[end - NONCE_LEN..end].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn issuer() -> NonceIssuer {
        NonceIssuer::new("test-secret")
    }

    #[test]
    fn nonce_is_ten_hex_chars() {
        let nonce = issuer().create("directory_blogs", None);
        assert_eq!(nonce.len(), 10);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn nonce_survives_one_tick() {
        let issued = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let nonce = issuer().create_at("directory_blogs", Some(UserId(3)), issued);

        let later = issued + Duration::seconds(TICK_SECONDS);
        assert!(issuer().verify_at(&nonce, "directory_blogs", Some(UserId(3)), later));

        let expired = issued + Duration::seconds(TICK_SECONDS * 2);
        assert!(!issuer().verify_at(&nonce, "directory_blogs", Some(UserId(3)), expired));
    }

    #[test]
    fn nonce_is_bound_to_action_and_user() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let nonce = issuer().create_at("directory_blogs", Some(UserId(3)), at);

        assert!(!issuer().verify_at(&nonce, "directory_members", Some(UserId(3)), at));
        assert!(!issuer().verify_at(&nonce, "directory_blogs", Some(UserId(4)), at));
        assert!(
            !NonceIssuer::new("other").verify_at(&nonce, "directory_blogs", Some(UserId(3)), at)
        );
    }
}
