use serde::{Deserialize, Serialize};

use crate::users::repo_types::User;

/// Add/edit user form. An unchecked `is_admin` box is simply absent.
#[derive(Debug, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub is_admin: Option<String>,
}

impl UserForm {
    pub fn is_admin(&self) -> bool {
        self.is_admin.is_some()
    }
}

#[derive(Debug, Serialize)]
pub struct ManageUsersPage {
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct AddUserPage {
    pub username_pattern: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EditUserPage {
    pub user_edit: User,
    pub username_pattern: &'static str,
}

/// JSON body of `POST /api/users/add`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}
