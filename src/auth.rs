//! Local user accounts kept in `auth.json`.
//!
//! Passwords are stored as unsalted SHA-256 hex digests. This keeps casual eyes
//! off the file and nothing more; it is not a security boundary.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::{
    errors::{QuoteError, Result},
    utils::PathResolver,
};
use crate::storage::json_backend::replace_file;

const MIN_PASSWORD_CHARS: usize = 6;
const SESSION_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    User,
    Guest,
}

crate::domain::impl_status_text!(Role {
    Admin => "admin",
    User => "user",
    Guest => "guest",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    Delete,
    Export,
    Import,
    Settings,
}

impl Role {
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Role::Admin => &[
                Permission::Read,
                Permission::Write,
                Permission::Delete,
                Permission::Export,
                Permission::Import,
                Permission::Settings,
            ],
            Role::User => &[Permission::Read, Permission::Write],
            Role::Guest => &[Permission::Read],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub username: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct AuthStore {
    path: PathBuf,
    users: BTreeMap<String, UserRecord>,
    session: Option<Session>,
}

impl AuthStore {
    pub fn open(base: &Path) -> Self {
        let path = PathResolver::auth_file_in(base);
        let users = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(users) => Some(users),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "unreadable user file");
                    None
                }
            })
            .unwrap_or_default();
        Self {
            path,
            users,
            session: None,
        }
    }

    pub fn create_user(&mut self, username: &str, password: &str, role: Role) -> Result<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(QuoteError::InvalidInput("username is required".into()));
        }
        if self.users.contains_key(username) {
            return Err(QuoteError::already_exists("User", username));
        }
        check_password(password)?;
        self.users.insert(
            username.to_string(),
            UserRecord {
                password_hash: hash_password(password),
                role,
                created_at: Utc::now(),
                last_login: None,
            },
        );
        self.save()
    }

    /// Verifies the password and opens a session valid for 24 hours.
    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<&Session> {
        let now = Utc::now();
        let user = self
            .users
            .get_mut(username)
            .ok_or_else(|| QuoteError::AuthError("user not found".into()))?;
        if user.password_hash != hash_password(password) {
            return Err(QuoteError::AuthError("incorrect password".into()));
        }
        user.last_login = Some(now);
        self.save()?;
        let token = hash_password(&format!("{}:{}:{}", username, now.to_rfc3339(), Uuid::new_v4()));
        tracing::info!(user = username, "session opened");
        Ok(&*self.session.insert(Session {
            username: username.to_string(),
            token,
            expires_at: now + Duration::hours(SESSION_HOURS),
        }))
    }

    pub fn validate_session(&mut self) -> Result<&Session> {
        self.validate_session_at(Utc::now())
    }

    /// An expired session is closed as a side effect.
    pub fn validate_session_at(&mut self, now: DateTime<Utc>) -> Result<&Session> {
        let expired = match &self.session {
            None => return Err(QuoteError::AuthError("no active session".into())),
            Some(session) => now > session.expires_at,
        };
        if expired {
            self.logout();
            return Err(QuoteError::AuthError("session expired".into()));
        }
        self.session
            .as_ref()
            .ok_or_else(|| QuoteError::AuthError("no active session".into()))
    }

    pub fn logout(&mut self) {
        self.session = None;
    }

    pub fn current_user(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.username.as_str())
    }

    pub fn change_password(&mut self, username: &str, old: &str, new: &str) -> Result<()> {
        let user = self
            .users
            .get_mut(username)
            .ok_or_else(|| QuoteError::AuthError("user not found".into()))?;
        if user.password_hash != hash_password(old) {
            return Err(QuoteError::AuthError("current password is incorrect".into()));
        }
        check_password(new)?;
        user.password_hash = hash_password(new);
        self.save()
    }

    pub fn role(&self, username: &str) -> Option<Role> {
        self.users.get(username).map(|user| user.role)
    }

    pub fn has_permission(&self, username: &str, permission: Permission) -> bool {
        self.role(username)
            .map_or(false, |role| role.permissions().contains(&permission))
    }

    /// Admin-only; the admin must re-enter their password and cannot delete themselves.
    pub fn delete_user(&mut self, username: &str, admin_password: &str) -> Result<()> {
        let admin = self.require_admin(admin_password)?;
        if username == admin {
            return Err(QuoteError::AuthError("you cannot delete yourself".into()));
        }
        if self.users.remove(username).is_none() {
            return Err(QuoteError::not_found("User", username));
        }
        self.save()
    }

    pub fn update_role(&mut self, username: &str, role: Role, admin_password: &str) -> Result<()> {
        self.require_admin(admin_password)?;
        let user = self
            .users
            .get_mut(username)
            .ok_or_else(|| QuoteError::not_found("User", username))?;
        user.role = role;
        self.save()
    }

    pub fn list_users(&self) -> Result<Vec<(&str, &UserRecord)>> {
        let current = self
            .current_user()
            .ok_or_else(|| QuoteError::AuthError("you must be signed in".into()))?;
        if self.role(current) != Some(Role::Admin) {
            return Err(QuoteError::AuthError("only administrators can list users".into()));
        }
        Ok(self
            .users
            .iter()
            .map(|(name, record)| (name.as_str(), record))
            .collect())
    }

    fn require_admin(&self, admin_password: &str) -> Result<String> {
        let current = self
            .current_user()
            .ok_or_else(|| QuoteError::AuthError("you must be signed in as an administrator".into()))?;
        let record = self
            .users
            .get(current)
            .filter(|record| record.role == Role::Admin)
            .ok_or_else(|| QuoteError::AuthError("administrator rights required".into()))?;
        if record.password_hash != hash_password(admin_password) {
            return Err(QuoteError::AuthError("administrator password is incorrect".into()));
        }
        Ok(current.to_string())
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.users)?;
        replace_file(&self.path, &json)
    }
}

/// Lowercase hex SHA-256 of `password`.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        Err(QuoteError::InvalidInput(
            "password must be at least 6 characters".into(),
        ))
    } else {
        Ok(())
    }
}
