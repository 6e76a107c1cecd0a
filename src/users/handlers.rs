use axum::{
    extract::{Path, State},
    response::{Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::session::{flash, flash_redirect, render, AdminUser, View},
    error::{ServiceError, StoreError},
    state::AppState,
    users::{
        dto::{AddUserPage, EditUserPage, ManageUsersPage, UserForm},
        services::{create_user, update_user, UserEdit, USERNAME_PATTERN},
    },
};

const MANAGE_PATH: &str = "/manage_users";

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/manage_users", get(manage_users))
        .route("/add_user", get(add_user_page).post(add_user))
        .route("/edit_user/:id", get(edit_user_page).post(edit_user))
        .route("/delete_user/:id", post(delete_user))
}

#[instrument(skip(state, admin))]
pub async fn manage_users(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<Json<View<ManageUsersPage>>, Response> {
    let AdminUser { session, .. } = admin;
    match state.users.list().await {
        Ok(users) => Ok(render(&session, ManageUsersPage { users }).await),
        Err(e) => {
            error!(error = %e, "list users failed");
            Err(flash_redirect(&session, "Failed to load users", "/dashboard").await)
        }
    }
}

pub async fn add_user_page(AdminUser { session, .. }: AdminUser) -> Json<View<AddUserPage>> {
    render(
        &session,
        AddUserPage {
            username_pattern: USERNAME_PATTERN,
        },
    )
    .await
}

#[instrument(skip(state, admin, form))]
pub async fn add_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Form(form): Form<UserForm>,
) -> Redirect {
    let AdminUser { user, session } = admin;
    let username = form.username.trim();
    if username.is_empty() || form.password.trim().is_empty() {
        flash(&session, "Username and password cannot be empty").await;
        return Redirect::to(MANAGE_PATH);
    }

    match create_user(state.users.as_ref(), username, &form.password, form.is_admin()).await {
        Ok(created) => {
            info!(user_id = created.id, by = user.id, "user added");
            flash(&session, format!("User {username} added successfully")).await;
        }
        Err(ServiceError::Validation(e)) => flash(&session, e.0).await,
        Err(ServiceError::Store(StoreError::Duplicate(_))) => {
            warn!(username, "username already taken");
            flash(&session, format!("Failed to add user {username}: name already taken")).await;
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            flash(&session, format!("Failed to add user {username}")).await;
        }
    }
    Redirect::to(MANAGE_PATH)
}

#[instrument(skip(state, admin))]
pub async fn edit_user_page(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<View<EditUserPage>>, Response> {
    let AdminUser { session, .. } = admin;
    match state.users.find_by_id(id).await {
        Ok(Some(user_edit)) => Ok(render(
            &session,
            EditUserPage {
                user_edit,
                username_pattern: USERNAME_PATTERN,
            },
        )
        .await),
        Ok(None) => Err(flash_redirect(
            &session,
            format!("User with ID {id} not found"),
            MANAGE_PATH,
        )
        .await),
        Err(e) => {
            error!(error = %e, user_id = id, "find user failed");
            Err(flash_redirect(&session, "Failed to load user", MANAGE_PATH).await)
        }
    }
}

/// An empty password keeps the current one.
#[instrument(skip(state, admin, form))]
pub async fn edit_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
    Form(form): Form<UserForm>,
) -> Redirect {
    let AdminUser { user, session } = admin;
    let back = format!("/edit_user/{id}");
    let username = form.username.trim().to_string();
    if username.is_empty() {
        flash(&session, "Username cannot be empty").await;
        return Redirect::to(&back);
    }

    let edit = UserEdit {
        username: Some(username.clone()),
        password: Some(form.password.clone()),
        is_admin: Some(form.is_admin()),
    };
    match update_user(state.users.as_ref(), id, edit).await {
        Ok(()) => {
            info!(user_id = id, by = user.id, "user edited");
            flash(&session, format!("User {username} updated successfully")).await;
        }
        Err(ServiceError::Validation(e)) => {
            flash(&session, e.0).await;
            return Redirect::to(&back);
        }
        Err(ServiceError::NotFound) => {
            flash(&session, format!("User with ID {id} not found")).await;
        }
        Err(ServiceError::Store(StoreError::Duplicate(_))) => {
            flash(&session, format!("Failed to update user {username}: name already taken")).await;
            return Redirect::to(&back);
        }
        Err(e) => {
            error!(error = %e, user_id = id, "update user failed");
            flash(&session, format!("Failed to update user {username}")).await;
        }
    }
    Redirect::to(MANAGE_PATH)
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> Redirect {
    let AdminUser { user, session } = admin;
    if id == user.id {
        flash(&session, "You cannot delete your own account").await;
        return Redirect::to(MANAGE_PATH);
    }

    match state.users.delete(id).await {
        Ok(true) => {
            info!(user_id = id, by = user.id, "user deleted");
            flash(&session, format!("User with ID {id} deleted successfully")).await;
        }
        Ok(false) => {
            flash(&session, format!("Failed to delete user with ID {id}")).await;
        }
        Err(e) => {
            error!(error = %e, user_id = id, "delete user failed");
            flash(&session, format!("Failed to delete user with ID {id}")).await;
        }
    }
    Redirect::to(MANAGE_PATH)
}
