use axum::{
    extract::{Path, State},
    response::{Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{error, info, instrument};

use crate::{
    api_keys::{
        dto::{AddKeyPage, ApiKeyForm, ApiKeysPage},
        keygen,
        services::create_key,
    },
    auth::session::{flash, flash_redirect, render, AdminUser, View},
    people::dto::is_checked,
    state::AppState,
};

const KEYS_PATH: &str = "/api";

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api", get(list_keys))
        .route("/api/add", get(add_key_page).post(add_key))
        .route("/api/delete/:id", post(delete_key))
}

#[instrument(skip(state, admin))]
pub async fn list_keys(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<Json<View<ApiKeysPage>>, Response> {
    let AdminUser { session, .. } = admin;
    match state.api_keys.list().await {
        Ok(apikeys) => Ok(render(&session, ApiKeysPage { apikeys }).await),
        Err(e) => {
            error!(error = %e, "list api keys failed");
            Err(flash_redirect(&session, "Failed to load API keys", "/dashboard").await)
        }
    }
}

/// Offers a freshly generated key the form can submit as-is.
pub async fn add_key_page(AdminUser { session, .. }: AdminUser) -> Json<View<AddKeyPage>> {
    let generated_key = keygen::generate_default();
    render(&session, AddKeyPage { generated_key }).await
}

#[instrument(skip(state, admin, form))]
pub async fn add_key(
    State(state): State<AppState>,
    admin: AdminUser,
    Form(form): Form<ApiKeyForm>,
) -> Redirect {
    let AdminUser { user, session } = admin;
    let administrator = form.admin.as_deref().is_some_and(is_checked);
    let label = form.label.trim();

    match create_key(state.api_keys.as_ref(), label, &form.key, administrator).await {
        Ok(key) => {
            info!(key_id = key.id, by = user.id, "api key issued");
            flash(&session, format!("{label} has been added")).await;
        }
        Err(e) => {
            error!(error = %e, "create api key failed");
            flash(&session, format!("Failed to add {label}")).await;
        }
    }
    Redirect::to(KEYS_PATH)
}

#[instrument(skip(state, admin))]
pub async fn delete_key(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> Redirect {
    let AdminUser { user, session } = admin;
    match state.api_keys.delete(id).await {
        Ok(true) => {
            info!(key_id = id, by = user.id, "api key revoked");
            flash(&session, format!("API Key {id} successfully deleted")).await;
        }
        Ok(false) => flash(&session, format!("Failed to delete API {id}")).await,
        Err(e) => {
            error!(error = %e, key_id = id, "delete api key failed");
            flash(&session, format!("Failed to delete API {id}")).await;
        }
    }
    Redirect::to(KEYS_PATH)
}
