use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, instrument, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::config::BootstrapAdmin;
use crate::error::{ServiceError, StoreError, ValidationError};
use crate::users::{
    repo::UserRepo,
    repo_types::{PublicUser, User, UserChanges},
};

pub const USERNAME_PATTERN: &str = r"^[A-Za-z0-9_.@-]{1,64}$";

fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(USERNAME_PATTERN).unwrap();
    }
    USERNAME_RE.is_match(username)
}

lazy_static! {
    /// Verified against when the username does not exist.
    static ref UNKNOWN_USER_HASH: String =
        hash_password("cipherstorm-unknown-user").unwrap_or_default();
}

fn validate_username(username: &str) -> Result<String, ValidationError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::new("Username cannot be empty"));
    }
    if !is_valid_username(username) {
        return Err(ValidationError::new(
            "Username may only contain letters, digits, '_', '.', '@' and '-' (max 64)",
        ));
    }
    Ok(username.to_string())
}

fn validate_password(password: &str) -> Result<&str, ValidationError> {
    if password.trim().is_empty() {
        return Err(ValidationError::new("Password cannot be empty"));
    }
    Ok(password)
}

/// Checks a username/password pair.
///
/// Unknown users and wrong passwords both yield `Ok(None)`. On success the
/// user's `last_login` is bumped before returning.
#[instrument(skip(repo, password))]
pub async fn authenticate(
    repo: &dyn UserRepo,
    username: &str,
    password: &str,
) -> Result<Option<PublicUser>, StoreError> {
    let Some(user) = repo.find_by_username(username).await? else {
        // same argon2 cost as a wrong password
        let _ = verify_password(password, &UNKNOWN_USER_HASH);
        debug!("unknown username");
        return Ok(None);
    };

    match verify_password(password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            debug!(user_id = user.id, "password mismatch");
            return Ok(None);
        }
        Err(e) => {
            error!(user_id = user.id, error = %e, "stored password hash is unreadable");
            return Ok(None);
        }
    }

    if let Err(e) = repo.touch_last_login(user.id).await {
        warn!(user_id = user.id, error = %e, "failed to update last_login");
    }
    Ok(Some(PublicUser::from(&user)))
}

#[instrument(skip(repo, password))]
pub async fn create_user(
    repo: &dyn UserRepo,
    username: &str,
    password: &str,
    is_admin: bool,
) -> Result<User, ServiceError> {
    let username = validate_username(username)?;
    let password = validate_password(password)?;
    let hash = hash_password(password).map_err(StoreError::hash)?;
    let user = repo.insert(&username, &hash, is_admin).await?;
    info!(user_id = user.id, username = %user.username, is_admin, "user created");
    Ok(user)
}

/// Requested edits; empty strings mean "leave unchanged".
#[derive(Debug, Clone, Default)]
pub struct UserEdit {
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

#[instrument(skip(repo, edit))]
pub async fn update_user(repo: &dyn UserRepo, id: i64, edit: UserEdit) -> Result<(), ServiceError> {
    let username = match edit.username.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Some(validate_username(name)?),
        _ => None,
    };
    let password_hash = match edit.password.as_deref() {
        Some(p) if !p.trim().is_empty() => Some(hash_password(p).map_err(StoreError::hash)?),
        _ => None,
    };
    let changes = UserChanges {
        username,
        password_hash,
        is_admin: edit.is_admin,
    };

    if repo.update(id, &changes).await? {
        info!(user_id = id, "user updated");
        Ok(())
    } else {
        Err(ServiceError::NotFound)
    }
}

/// Creates the configured admin account unless a user with that name exists.
pub async fn seed_bootstrap_admin(
    repo: &dyn UserRepo,
    admin: &BootstrapAdmin,
) -> Result<bool, ServiceError> {
    if repo.find_by_username(&admin.username).await?.is_some() {
        debug!(username = %admin.username, "bootstrap admin already present");
        return Ok(false);
    }
    match create_user(repo, &admin.username, &admin.password, true).await {
        Ok(_) => Ok(true),
        // lost a race with another instance
        Err(ServiceError::Store(StoreError::Duplicate(_))) => Ok(false),
        Err(e) => Err(e),
    }
}
