use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::api_key::{ApiAdmin, ApiKeyAuth},
    error::{ApiError, MessageBody},
    people::{dto::PersonInput, repo_types::Person, services::create_person},
    state::AppState,
    users::{dto::CreateUserRequest, repo_types::User, services::create_user},
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/token_validate", get(token_validate))
        .route("/api/users", get(list_users))
        .route("/api/people", get(list_people))
        .route("/api/people/:id", get(get_person))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/api/people/add", post(add_person))
        .route("/api/users/add", post(add_user))
}

fn body_of<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

pub async fn token_validate(_caller: ApiKeyAuth) -> Json<MessageBody> {
    MessageBody::new("API Token is valid")
}

#[instrument(skip(state, caller), fields(key_id = caller.0.key_id))]
pub async fn list_users(
    State(state): State<AppState>,
    caller: ApiAdmin,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.users.list().await?;
    Ok(Json(users))
}

#[instrument(skip(state, caller), fields(key_id = caller.0.key_id))]
pub async fn list_people(
    State(state): State<AppState>,
    caller: ApiKeyAuth,
) -> Result<Json<Vec<Person>>, ApiError> {
    let people = state.people.list().await?;
    Ok(Json(people))
}

#[instrument(skip(state, caller), fields(key_id = caller.0.key_id))]
pub async fn get_person(
    State(state): State<AppState>,
    caller: ApiKeyAuth,
    Path(id): Path<i64>,
) -> Result<Json<Person>, ApiError> {
    state
        .people
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Person is not found in database.".into()))
}

#[instrument(skip(state, caller, payload), fields(key_id = caller.0.key_id))]
pub async fn add_person(
    State(state): State<AppState>,
    caller: ApiKeyAuth,
    payload: Result<Json<PersonInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Person>), ApiError> {
    let values = body_of(payload)?
        .validate()
        .map_err(|e| ApiError::Validation(e.0))?;
    let person = create_person(
        state.people.as_ref(),
        state.storage.as_ref(),
        values,
        Vec::new(),
    )
    .await?;
    info!(person_id = person.id, "record added via api");
    Ok((StatusCode::CREATED, Json(person)))
}

#[instrument(skip(state, caller, payload), fields(key_id = caller.0.key_id))]
pub async fn add_user(
    State(state): State<AppState>,
    caller: ApiAdmin,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let req = body_of(payload)?;
    let user = create_user(state.users.as_ref(), &req.username, &req.password, req.is_admin).await?;
    info!(user_id = user.id, "user added via api");
    Ok((StatusCode::CREATED, Json(user)))
}
