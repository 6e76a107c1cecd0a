use serde::{Deserialize, Serialize};

use crate::users::repo_types::PublicUser;

/// Login form; absent fields count as empty.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginPage {
    /// Set when the session already belongs to a logged-in user.
    pub logged_in: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardPage {
    pub user: PublicUser,
}
