//! Capability contracts an account must fulfil to log in.

use sha2::{Digest, Sha256};

use super::auth::{AuthError, PasswordService};
use crate::domain::User;

/// Something that can be authenticated.
pub trait UserIdentity {
    /// Visual identifier of the account.
    ///
    /// `"anonymous"` when the email is empty or `"0"`.
    fn user_identifier(&self) -> String;

    fn roles(&self) -> Vec<String>;
}

/// An identity that logs in with a hashed password.
pub trait PasswordAuthenticated: UserIdentity {
    fn password_hash(&self) -> Option<&str>;

    /// Clear temporary plain-text credentials. Nothing is kept in plain
    /// text, so the default does nothing.
    fn erase_credentials(&mut self) {}

    /// Short digest of the password hash, safe to embed in tokens.
    ///
    /// Changes whenever the password does, which lets stale tokens be
    /// recognised without exposing the hash.
    fn credential_fingerprint(&self) -> String {
        let digest = Sha256::digest(self.password_hash().unwrap_or_default().as_bytes());
        format!("{digest:x}")[..16].to_string()
    }

    /// Compare a plain-text password with the stored hash.
    fn verify_password(
        &self,
        plain: &str,
        hasher: &dyn PasswordService,
    ) -> Result<bool, AuthError> {
        match self.password_hash() {
            Some(hash) => hasher.verify(plain, hash),
            None => Ok(false),
        }
    }
}

impl UserIdentity for User {
    fn user_identifier(&self) -> String {
        if self.email.is_empty() || self.email == "0" {
            return "anonymous".to_string();
        }
        self.email.clone()
    }

    fn roles(&self) -> Vec<String> {
        User::roles(self)
    }
}

impl PasswordAuthenticated for User {
    fn password_hash(&self) -> Option<&str> {
        Some(self.password.as_str()).filter(|hash| !hash.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PlainHasher;

    impl PasswordService for PlainHasher {
        fn hash(&self, password: &str) -> Result<String, AuthError> {
            Ok(format!("plain:{password}"))
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
            Ok(hash == format!("plain:{password}"))
        }
    }

    #[test]
    fn test_identifier_is_email() {
        let user = User::new("test@mail.test", "hash");
        assert_eq!(user.user_identifier(), "test@mail.test");
    }

    #[test]
    fn test_identifier_without_email() {
        let user = User::new("", "hash");
        assert_eq!(user.user_identifier(), "anonymous");
    }

    #[test]
    fn test_identifier_zero_email_is_anonymous() {
        let user = User::new("0", "hash");
        assert_eq!(user.user_identifier(), "anonymous");

        let user = User::new("00", "hash");
        assert_eq!(user.user_identifier(), "00");
    }

    #[test]
    fn test_identity_roles_include_base_role() {
        let user = User::new("test@mail.test", "hash");
        assert_eq!(UserIdentity::roles(&user), vec!["ROLE_USER".to_string()]);
    }

    #[test]
    fn test_erase_credentials_keeps_hash() {
        let mut user = User::new("test@mail.test", "hash");
        user.erase_credentials();
        assert_eq!(user.password_hash(), Some("hash"));
    }

    #[test]
    fn test_fingerprint_tracks_password() {
        let mut user = User::new("test@mail.test", "hash-1");
        let before = user.credential_fingerprint();
        assert_eq!(before.len(), 16);
        assert!(!before.contains("hash"));

        user.password = "hash-2".to_string();
        assert_ne!(user.credential_fingerprint(), before);
    }

    #[test]
    fn test_verify_password() {
        let user = User::new("test@mail.test", "plain:secret");
        assert!(user.verify_password("secret", &PlainHasher).unwrap());
        assert!(!user.verify_password("other", &PlainHasher).unwrap());

        let no_password = User::new("test@mail.test", "");
        assert!(!no_password.verify_password("", &PlainHasher).unwrap());
    }
}
