//! Helpers shared by the router tests.

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::api_keys::services::create_key;
use crate::state::AppState;
use crate::users::services::create_user;

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(resp: &Response<Body>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// The `name=value` part of the response's session cookie.
pub fn cookie_of(resp: &Response<Body>) -> String {
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("response sets a session cookie");
    set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Creates a user and logs in through the form, returning the session cookie.
pub async fn login_as(app: &Router, state: &AppState, username: &str, is_admin: bool) -> String {
    let password = "test-password";
    create_user(state.users.as_ref(), username, password, is_admin)
        .await
        .unwrap();
    let resp = app
        .clone()
        .oneshot(
            Request::post("/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!(
                    "username={username}&password={password}"
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(location(&resp), "/dashboard", "login as {username} failed");
    cookie_of(&resp)
}

pub async fn api_key(state: &AppState, administrator: bool) -> String {
    create_key(state.api_keys.as_ref(), "test", "", administrator)
        .await
        .unwrap()
        .key
}

pub fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn post_form(uri: &str, cookie: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Follows a flash redirect and returns the flashes shown on the target view.
pub async fn flashes_after(app: &Router, resp: &Response<Body>, cookie: &str) -> serde_json::Value {
    let target = location(resp).to_string();
    let resp = app.clone().oneshot(get(&target, cookie)).await.unwrap();
    body_json(resp).await["flashes"].clone()
}
