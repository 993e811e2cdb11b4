use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use bson::DateTime;
use natours_query::{Filter, FilterGroup};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DbError, ValidationError};
use crate::model::{Model, SaveContext, flexible_date, now};

const RESET_TOKEN_TTL_MILLIS: i64 = 10 * 60 * 1000;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        }
    }
}

fn default_photo() -> String {
    "default.jpg".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_photo")]
    pub photo: String,
    #[serde(default)]
    pub role: Role,
    /// Plain text until `before_save` replaces it with an argon2 hash.
    #[serde(default)]
    pub password: String,
    /// Only checked on save, never stored.
    #[serde(default, skip_serializing)]
    pub password_confirm: Option<String>,
    #[serde(default, with = "flexible_date", skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_token: Option<String>,
    #[serde(default, with = "flexible_date", skip_serializing_if = "Option::is_none")]
    pub password_reset_expires: Option<DateTime>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Model for User {
    const COLLECTION: &'static str = "users";
    const HIDDEN: &'static [&'static str] = &[
        "password",
        "active",
        "passwordResetToken",
        "passwordResetExpires",
    ];
    const UNIQUE: &'static [&'static [&'static str]] = &[&["email"]];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn cast(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
    }

    fn validate(&self, ctx: &SaveContext) -> Result<(), ValidationError> {
        let mut err = ValidationError::new();
        if self.name.is_empty() {
            err.add("name", "User must have a name");
        }
        if self.email.is_empty() {
            err.add("email", "User must have an email");
        } else if !is_valid_email(&self.email) {
            err.add("email", "Please provide a valid email");
        }
        if ctx.is_modified("password") {
            if self.password.is_empty() {
                err.add("password", "User must enter a password");
            } else if self.password.chars().count() < MIN_PASSWORD_LEN {
                err.add(
                    "password",
                    format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
                );
            }
            match &self.password_confirm {
                None => err.add("passwordConfirm", "passwords must match"),
                Some(confirm) if *confirm != self.password => {
                    err.add("passwordConfirm", "Passwords are not the same!")
                }
                Some(_) => {}
            }
        }
        err.into_result()
    }

    fn before_save(&mut self, ctx: &SaveContext) -> Result<(), DbError> {
        if !ctx.is_modified("password") {
            return Ok(());
        }
        self.password = hash_password(&self.password)?;
        self.password_confirm = None;
        if !ctx.is_new {
            // One second back so a token issued right after the change stays valid.
            self.password_changed_at = Some(DateTime::from_millis(now().timestamp_millis() - 1000));
        }
        Ok(())
    }

    /// Deactivated accounts never show up in reads.
    fn default_filter() -> Option<FilterGroup> {
        Some(FilterGroup::condition(Filter::eq("active", true)))
    }
}

impl User {
    /// Set a new plain-text password; it is hashed when the user is saved.
    pub fn set_password(&mut self, password: impl Into<String>, confirm: impl Into<String>) {
        self.password = password.into();
        self.password_confirm = Some(confirm.into());
    }

    pub fn correct_password(&self, candidate: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.password) else {
            return false;
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }

    /// Whether the password changed after a token issued at `issued_at`
    /// (epoch seconds).
    pub fn changed_password_after(&self, issued_at: i64) -> bool {
        match self.password_changed_at {
            Some(changed) => issued_at < changed.timestamp_millis() / 1000,
            None => false,
        }
    }

    /// Generate a reset token. The returned plain token is meant for the
    /// user; only its sha256 and a ten minute expiry are kept on the model.
    pub fn create_password_reset_token(&mut self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token: String = bytes.iter().map(|b| format!("{b:02x}")).collect();

        self.password_reset_token = Some(hash_reset_token(&token));
        self.password_reset_expires = Some(DateTime::from_millis(
            now().timestamp_millis() + RESET_TOKEN_TTL_MILLIS,
        ));
        token
    }

    pub fn clear_password_reset(&mut self) {
        self.password_reset_token = None;
        self.password_reset_expires = None;
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

pub fn hash_reset_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn hash_password(password: &str) -> Result<String, DbError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::Hash(e.to_string()))
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> User {
        bson::from_document(bson::doc! {
            "name": "Laura Wilson ",
            "email": " Laura@Example.com",
            "password": "test1234",
            "passwordConfirm": "test1234",
        })
        .unwrap()
    }

    #[test]
    fn defaults_and_cast() {
        let mut user = signup();
        user.cast();
        assert_eq!(user.name, "Laura Wilson");
        assert_eq!(user.email, "laura@example.com");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.photo, "default.jpg");
        assert!(user.active);
    }

    #[test]
    fn password_confirm_must_match() {
        let mut user = signup();
        user.password_confirm = Some("different".into());
        let err = user.validate(&SaveContext::new_document()).unwrap_err();
        assert_eq!(err.to_string(), "Passwords are not the same!");
    }

    #[test]
    fn short_password_is_rejected() {
        let mut user = signup();
        user.set_password("short", "short");
        assert!(user.validate(&SaveContext::new_document()).is_err());
    }

    #[test]
    fn unchanged_password_is_not_revalidated() {
        let mut user = signup();
        user.password_confirm = None;
        assert!(user.validate(&SaveContext::modifying(["name"])).is_ok());
    }

    #[test]
    fn invalid_email() {
        let mut user = signup();
        user.email = "laura@example".into();
        assert!(user.validate(&SaveContext::new_document()).is_err());
        assert!(is_valid_email("laura@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("laura example@x.io"));
    }

    #[test]
    fn hashed_password_verifies_and_confirm_is_dropped() {
        let mut user = signup();
        user.before_save(&SaveContext::new_document()).unwrap();
        assert!(user.password.starts_with("$argon2"));
        assert!(user.password_confirm.is_none());
        assert!(user.password_changed_at.is_none());
        assert!(user.correct_password("test1234"));
        assert!(!user.correct_password("test12345"));

        let doc = bson::to_document(&user).unwrap();
        assert!(!doc.contains_key("passwordConfirm"));
        assert_eq!(doc.get_str("role").unwrap(), "user");
    }

    #[test]
    fn password_change_marks_changed_at() {
        let mut user = signup();
        user.set_password("newpass123", "newpass123");
        user.before_save(&SaveContext::modifying(["password"])).unwrap();
        let changed = user.password_changed_at.unwrap().timestamp_millis() / 1000;
        assert!(user.changed_password_after(changed - 10));
        assert!(!user.changed_password_after(changed + 10));
    }

    #[test]
    fn reset_token_is_stored_hashed() {
        let mut user = signup();
        let token = user.create_password_reset_token();
        assert_eq!(token.len(), 64);
        assert_eq!(user.password_reset_token, Some(hash_reset_token(&token)));
        assert_ne!(user.password_reset_token.as_deref(), Some(token.as_str()));
        assert!(user.password_reset_expires.unwrap() > now());
    }

    #[test]
    fn role_names() {
        let user: User = bson::from_document(bson::doc! { "role": "lead-guide" }).unwrap();
        assert_eq!(user.role, Role::LeadGuide);
        assert_eq!(Role::LeadGuide.as_str(), "lead-guide");
        assert!(user.has_role(&[Role::Admin, Role::LeadGuide]));
    }
}
