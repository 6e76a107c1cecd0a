use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::{debug, error, warn};

use crate::state::AppState;
use crate::users::{repo::UserRepo, repo_types::PublicUser};

pub const USER_ID_KEY: &str = "user_id";
const FLASH_KEY: &str = "_flash";

pub const LOGIN_PATH: &str = "/";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Queues a one-shot message for the next rendered view.
pub async fn flash(session: &Session, message: impl Into<String>) {
    let mut pending = session
        .get::<Vec<String>>(FLASH_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.push(message.into());
    if let Err(e) = session.insert(FLASH_KEY, pending).await {
        warn!(error = %e, "failed to store flash message");
    }
}

pub async fn take_flashes(session: &Session) -> Vec<String> {
    match session.remove::<Vec<String>>(FLASH_KEY).await {
        Ok(pending) => pending.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "failed to read flash messages");
            Vec::new()
        }
    }
}

/// Flash the message and send the browser to `to`.
pub async fn flash_redirect(session: &Session, message: impl Into<String>, to: &str) -> Response {
    flash(session, message).await;
    Redirect::to(to).into_response()
}

/// View model handed to the page template, with pending flash messages.
#[derive(Debug, Serialize)]
pub struct View<T> {
    pub flashes: Vec<String>,
    #[serde(flatten)]
    pub data: T,
}

pub async fn render<T: Serialize>(session: &Session, data: T) -> Json<View<T>> {
    Json(View {
        flashes: take_flashes(session).await,
        data,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDenial {
    Anonymous,
    NotAdmin,
    Unavailable,
}

/// Resolves the session's user id to a current user; the row is reloaded on
/// every call.
pub async fn check_session(
    repo: &dyn UserRepo,
    user_id: Option<i64>,
) -> Result<PublicUser, SessionDenial> {
    let Some(id) = user_id else {
        return Err(SessionDenial::Anonymous);
    };
    match repo.find_by_id(id).await {
        Ok(Some(user)) => Ok(PublicUser::from(&user)),
        Ok(None) => {
            debug!(user_id = id, "session user no longer exists");
            Err(SessionDenial::Anonymous)
        }
        Err(e) => {
            error!(error = %e, user_id = id, "session user lookup failed");
            Err(SessionDenial::Unavailable)
        }
    }
}

pub fn check_admin(user: &PublicUser) -> Result<(), SessionDenial> {
    if user.is_admin {
        Ok(())
    } else {
        Err(SessionDenial::NotAdmin)
    }
}

async fn deny(session: &Session, denial: SessionDenial) -> Response {
    match denial {
        SessionDenial::Anonymous => Redirect::to(LOGIN_PATH).into_response(),
        SessionDenial::NotAdmin => flash_redirect(session, "Access denied.", DASHBOARD_PATH).await,
        SessionDenial::Unavailable => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// A logged-in user, plus the session it came from.
pub struct SessionUser {
    pub user: PublicUser,
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let user_id = match session.get::<i64>(USER_ID_KEY).await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "session store read failed");
                return Err(deny(&session, SessionDenial::Unavailable).await);
            }
        };

        match check_session(state.users.as_ref(), user_id).await {
            Ok(user) => Ok(SessionUser { user, session }),
            Err(denial) => {
                if user_id.is_some() && denial == SessionDenial::Anonymous {
                    if let Err(e) = session.remove::<i64>(USER_ID_KEY).await {
                        warn!(error = %e, "failed to clear stale session user");
                    }
                }
                Err(deny(&session, denial).await)
            }
        }
    }
}

/// A logged-in administrator.
pub struct AdminUser {
    pub user: PublicUser,
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionUser { user, session } = SessionUser::from_request_parts(parts, state).await?;
        if let Err(denial) = check_admin(&user) {
            warn!(user_id = user.id, path = %parts.uri.path(), "admin route denied");
            return Err(deny(&session, denial).await);
        }
        Ok(AdminUser { user, session })
    }
}
