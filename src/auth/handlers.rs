use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{DashboardPage, LoginForm, LoginPage},
        session::{
            flash, flash_redirect, render, SessionUser, View, DASHBOARD_PATH, LOGIN_PATH,
            USER_ID_KEY,
        },
    },
    state::AppState,
    users::services::authenticate,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(login_page).post(login))
        .route("/logout", get(logout).post(logout))
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

pub async fn login_page(session: Session) -> Json<View<LoginPage>> {
    let logged_in = matches!(session.get::<i64>(USER_ID_KEY).await, Ok(Some(_)));
    render(&session, LoginPage { logged_in }).await
}

#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return flash_redirect(&session, "Please enter both username and password", LOGIN_PATH)
            .await;
    }

    let user = match authenticate(state.users.as_ref(), username, &form.password).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(username, "login rejected");
            return flash_redirect(&session, "Invalid credentials", LOGIN_PATH).await;
        }
        Err(e) => {
            error!(error = %e, "authenticate failed");
            return flash_redirect(&session, "Login is temporarily unavailable", LOGIN_PATH)
                .await;
        }
    };

    // new id on privilege change
    if let Err(e) = session.cycle_id().await {
        error!(error = %e, "session cycle failed");
        return flash_redirect(&session, "Login is temporarily unavailable", LOGIN_PATH).await;
    }
    if let Err(e) = session.insert(USER_ID_KEY, user.id).await {
        error!(error = %e, "session insert failed");
        return flash_redirect(&session, "Login is temporarily unavailable", LOGIN_PATH).await;
    }

    info!(user_id = user.id, is_admin = user.is_admin, "user logged in");
    Redirect::to(DASHBOARD_PATH).into_response()
}

#[instrument(skip(session))]
pub async fn logout(session: Session) -> Redirect {
    let user_id = session.get::<i64>(USER_ID_KEY).await.ok().flatten();
    if let Err(e) = session.flush().await {
        error!(error = %e, "session flush failed");
    }
    if let Some(user_id) = user_id {
        info!(user_id, "user logged out");
        flash(&session, "You have been logged out.").await;
    }
    Redirect::to(LOGIN_PATH)
}

pub async fn dashboard(SessionUser { user, session }: SessionUser) -> Json<View<DashboardPage>> {
    render(&session, DashboardPage { user }).await
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::app::build_app;
    use crate::state::AppState;
    use crate::testing::{body_json, cookie_of, login_as, location};
    use crate::users::services::create_user;

    fn login_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn login_with_valid_credentials_reaches_dashboard() {
        let (state, _dir) = AppState::fake();
        create_user(state.users.as_ref(), "alice", "secret", false)
            .await
            .unwrap();
        let app = build_app(state);

        let resp = app
            .clone()
            .oneshot(login_request("username=alice&password=secret"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/dashboard");
        let cookie = cookie_of(&resp);

        let resp = app
            .oneshot(
                Request::get("/dashboard")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["user"]["username"], "alice");
        assert_eq!(body["flashes"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn wrong_password_flashes_invalid_credentials() {
        let (state, _dir) = AppState::fake();
        create_user(state.users.as_ref(), "alice", "secret", false)
            .await
            .unwrap();
        let app = build_app(state);

        let resp = app
            .clone()
            .oneshot(login_request("username=alice&password=nope"))
            .await
            .unwrap();
        assert_eq!(location(&resp), "/");
        let cookie = cookie_of(&resp);

        let resp = app
            .oneshot(
                Request::get("/")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(resp).await;
        assert_eq!(body["flashes"], serde_json::json!(["Invalid credentials"]));
        assert_eq!(body["logged_in"], false);
    }

    #[tokio::test]
    async fn empty_fields_ask_for_both() {
        let (state, _dir) = AppState::fake();
        let app = build_app(state);

        let resp = app
            .clone()
            .oneshot(login_request("username=&password="))
            .await
            .unwrap();
        assert_eq!(location(&resp), "/");
        let cookie = cookie_of(&resp);

        let resp = app
            .oneshot(
                Request::get("/")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(resp).await;
        assert_eq!(
            body["flashes"],
            serde_json::json!(["Please enter both username and password"])
        );
    }

    #[tokio::test]
    async fn anonymous_dashboard_redirects_to_login() {
        let (state, _dir) = AppState::fake();
        let resp = build_app(state)
            .oneshot(Request::get("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
    }

    #[tokio::test]
    async fn deleted_user_is_dropped_from_the_session() {
        let (state, _dir) = AppState::fake();
        let app = build_app(state.clone());
        let cookie = login_as(&app, &state, "carol", false).await;
        let carol = state
            .users
            .find_by_username("carol")
            .await
            .unwrap()
            .unwrap();
        state.users.delete(carol.id).await.unwrap();

        let resp = app
            .clone()
            .oneshot(
                Request::get("/dashboard")
                    .header(header::COOKIE, cookie.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(location(&resp), "/");

        let resp = app
            .oneshot(
                Request::get("/")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["logged_in"], false);
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let (state, _dir) = AppState::fake();
        let app = build_app(state.clone());
        let cookie = login_as(&app, &state, "bob", false).await;

        let resp = app
            .clone()
            .oneshot(
                Request::post("/logout")
                    .header(header::COOKIE, cookie.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(location(&resp), "/");

        let resp = app
            .oneshot(
                Request::get("/dashboard")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(location(&resp), "/");
    }
}
