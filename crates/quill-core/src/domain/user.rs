use garde::Validate;

use super::graph::PostKey;
use super::record::UserRecord;
use super::validation::not_blank;

/// Role every user holds, whether or not it is stored.
pub const BASE_ROLE: &str = "ROLE_USER";

/// User entity - an account that authors posts.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct User {
    #[garde(skip)]
    id: Option<i32>,
    #[garde(custom(not_blank), length(chars, max = 180))]
    pub email: String,
    #[garde(skip)]
    roles: Vec<String>,
    /// Hashed password, never the plain text.
    #[garde(custom(not_blank), length(chars, max = 255))]
    pub password: String,
    #[garde(skip)]
    pub(crate) posts: Vec<PostKey>,
}

impl User {
    /// Create an unsaved user.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            roles: Vec::new(),
            password: password_hash.into(),
            posts: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: i32) {
        self.id = Some(id);
    }

    /// Effective roles: stored roles plus [`BASE_ROLE`], without duplicates.
    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = Vec::with_capacity(self.roles.len() + 1);
        for role in self.roles.iter().map(String::as_str).chain([BASE_ROLE]) {
            if !roles.iter().any(|r| r == role) {
                roles.push(role.to_string());
            }
        }
        roles
    }

    /// Roles exactly as persisted.
    pub fn stored_roles(&self) -> &[String] {
        &self.roles
    }

    pub fn set_roles(&mut self, roles: Vec<String>) {
        self.roles = roles;
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Posts authored by this user, in insertion order.
    pub fn posts(&self) -> &[PostKey] {
        &self.posts
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            roles: record.roles,
            password: record.password,
            posts: Vec::new(),
        }
    }
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            password: user.password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_include_base_role_when_empty() {
        let user = User::new("test@mail.test", "hash");
        assert!(user.stored_roles().is_empty());
        assert_eq!(user.roles(), vec![BASE_ROLE.to_string()]);
    }

    #[test]
    fn test_roles_are_deduplicated() {
        let user = User::new("test@mail.test", "hash").with_roles(vec![
            "ROLE_ADMIN".to_string(),
            "ROLE_USER".to_string(),
            "ROLE_ADMIN".to_string(),
        ]);
        assert_eq!(
            user.roles(),
            vec!["ROLE_ADMIN".to_string(), "ROLE_USER".to_string()]
        );
        assert_eq!(user.stored_roles().len(), 3);
    }

    #[test]
    fn test_new_user_has_no_identity() {
        let user = User::new("test@mail.test", "hash");
        assert_eq!(user.id(), None);
        assert!(user.posts().is_empty());
    }

    #[test]
    fn test_validate_ok() {
        let user = User::new("test@mail.test", "$argon2id$v=19$hash");
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_validate_blank_email() {
        let user = User::new("", "hash");
        let report = user.validate().unwrap_err();
        assert!(report.iter().any(|(path, _)| path.to_string() == "email"));
    }

    #[test]
    fn test_validate_email_length() {
        let at_limit = User::new("a".repeat(180), "hash");
        assert!(at_limit.validate().is_ok());

        let over = User::new("a".repeat(181), "hash");
        assert!(over.validate().is_err());
    }

    #[test]
    fn test_validate_password_length_counts_chars() {
        let multibyte = User::new("test@mail.test", "é".repeat(255));
        assert!(multibyte.validate().is_ok());

        let over = User::new("test@mail.test", "é".repeat(256));
        assert!(over.validate().is_err());
    }
}
