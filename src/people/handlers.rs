use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    response::{Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::session::{flash, flash_redirect, render, SessionUser, View},
    error::ServiceError,
    people::{
        dto::{AddPersonPage, EditPersonPage, PeoplePage, PersonInput, PersonPage},
        services::{accept_upload, create_person, delete_person, update_person, Upload},
    },
    state::AppState,
};

const PEOPLE_PATH: &str = "/predators";
const ADD_PATH: &str = "/predators/add";

fn edit_path(id: i64) -> String {
    format!("/predators/edit/{id}")
}

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/predators", get(list_people))
        .route("/predators/view/:id", get(view_person))
        .route("/predators/add", get(add_person_page))
        .route("/predators/edit/:id", get(edit_person_page))
}

pub fn write_routes(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/predators/add", post(add_person))
        .route("/predators/edit/:id", post(edit_person))
        .route("/predators/delete/:id", post(remove_person))
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

/// A parsed add/edit form.
#[derive(Debug, Default)]
struct Submission {
    input: PersonInput,
    removed: Vec<String>,
    uploads: Vec<Upload>,
    rejected: Vec<String>,
}

async fn read_submission(
    mut mp: Multipart,
    allowed_extensions: &[String],
) -> Result<Submission, MultipartError> {
    let mut sub = Submission::default();
    while let Some(field) = mp.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "images" | "images[]" => {
                let raw_name = field.file_name().unwrap_or_default().to_string();
                let body = field.bytes().await?;
                if raw_name.is_empty() || body.is_empty() {
                    continue;
                }
                match accept_upload(&raw_name, allowed_extensions) {
                    Some(file_name) => sub.uploads.push(Upload { file_name, body }),
                    None => sub.rejected.push(raw_name),
                }
            }
            "remove_images" | "remove_images[]" => {
                let path = field.text().await?;
                if !path.trim().is_empty() {
                    sub.removed.push(path.trim().to_string());
                }
            }
            _ => {
                let value = field.text().await?;
                sub.input.set_form_field(&name, value);
            }
        }
    }
    Ok(sub)
}

async fn flash_rejected(session: &Session, rejected: &[String]) {
    for name in rejected {
        warn!(file = %name, "upload skipped");
        flash(session, format!("Skipped {name}: file type not allowed")).await;
    }
}

#[instrument(skip(state, current))]
pub async fn list_people(
    State(state): State<AppState>,
    current: SessionUser,
) -> Result<Json<View<PeoplePage>>, Response> {
    let SessionUser { session, .. } = current;
    match state.people.list().await {
        Ok(people) => Ok(render(&session, PeoplePage { people }).await),
        Err(e) => {
            error!(error = %e, "list people failed");
            Err(flash_redirect(&session, "Failed to load records", "/dashboard").await)
        }
    }
}

#[instrument(skip(state, current))]
pub async fn view_person(
    State(state): State<AppState>,
    current: SessionUser,
    Path(id): Path<i64>,
) -> Result<Json<View<PersonPage>>, Response> {
    let SessionUser { session, .. } = current;
    match state.people.find_by_id(id).await {
        Ok(Some(person)) => Ok(render(&session, PersonPage { person }).await),
        Ok(None) => Err(flash_redirect(&session, format!("ID {id} not found"), PEOPLE_PATH).await),
        Err(e) => {
            error!(error = %e, person_id = id, "find person failed");
            Err(flash_redirect(&session, "Failed to load record", PEOPLE_PATH).await)
        }
    }
}

pub async fn add_person_page(
    State(state): State<AppState>,
    SessionUser { session, .. }: SessionUser,
) -> Json<View<AddPersonPage>> {
    let allowed_extensions = state.config.upload.allowed_extensions.clone();
    render(&session, AddPersonPage { allowed_extensions }).await
}

#[instrument(skip(state, current, mp))]
pub async fn add_person(
    State(state): State<AppState>,
    current: SessionUser,
    mp: Multipart,
) -> Response {
    let SessionUser { user, session } = current;
    let sub = match read_submission(mp, &state.config.upload.allowed_extensions).await {
        Ok(sub) => sub,
        Err(e) => {
            warn!(error = %e, "unreadable upload form");
            return flash_redirect(&session, "Upload could not be read", ADD_PATH).await;
        }
    };
    flash_rejected(&session, &sub.rejected).await;

    let values = match sub.input.validate() {
        Ok(values) => values,
        Err(e) => return flash_redirect(&session, e.0, ADD_PATH).await,
    };
    let name = values.name.clone();

    match create_person(
        state.people.as_ref(),
        state.storage.as_ref(),
        values,
        sub.uploads,
    )
    .await
    {
        Ok(person) => {
            info!(person_id = person.id, by = user.id, "record added");
            flash_redirect(&session, format!("{name} added successfully"), PEOPLE_PATH).await
        }
        Err(e) => {
            error!(error = %e, "create person failed");
            flash_redirect(&session, format!("Failed to add {name}"), ADD_PATH).await
        }
    }
}

#[instrument(skip(state, current))]
pub async fn edit_person_page(
    State(state): State<AppState>,
    current: SessionUser,
    Path(id): Path<i64>,
) -> Result<Json<View<EditPersonPage>>, Response> {
    let SessionUser { session, .. } = current;
    match state.people.find_by_id(id).await {
        Ok(Some(person)) => {
            let allowed_extensions = state.config.upload.allowed_extensions.clone();
            Ok(render(
                &session,
                EditPersonPage {
                    person,
                    allowed_extensions,
                },
            )
            .await)
        }
        Ok(None) => Err(not_found(&session, id).await),
        Err(e) => {
            error!(error = %e, person_id = id, "find person failed");
            Err(flash_redirect(&session, "Failed to load record", PEOPLE_PATH).await)
        }
    }
}

async fn not_found(session: &Session, id: i64) -> Response {
    flash_redirect(session, format!("Person with ID {id} not found"), PEOPLE_PATH).await
}

#[instrument(skip(state, current, mp))]
pub async fn edit_person(
    State(state): State<AppState>,
    current: SessionUser,
    Path(id): Path<i64>,
    mp: Multipart,
) -> Response {
    let SessionUser { user, session } = current;
    let back = edit_path(id);
    let sub = match read_submission(mp, &state.config.upload.allowed_extensions).await {
        Ok(sub) => sub,
        Err(e) => {
            warn!(error = %e, "unreadable upload form");
            return flash_redirect(&session, "Upload could not be read", &back).await;
        }
    };
    flash_rejected(&session, &sub.rejected).await;

    let values = match sub.input.validate() {
        Ok(values) => values,
        Err(e) => return flash_redirect(&session, e.0, &back).await,
    };
    let name = values.name.clone();

    match update_person(
        state.people.as_ref(),
        state.storage.as_ref(),
        id,
        values,
        sub.removed,
        sub.uploads,
    )
    .await
    {
        Ok(_) => {
            info!(person_id = id, by = user.id, "record updated");
            flash_redirect(&session, format!("{name} updated successfully"), PEOPLE_PATH).await
        }
        Err(ServiceError::NotFound) => not_found(&session, id).await,
        Err(e) => {
            error!(error = %e, person_id = id, "update person failed");
            flash_redirect(&session, format!("Failed to update {name}"), &back).await
        }
    }
}

#[instrument(skip(state, current))]
pub async fn remove_person(
    State(state): State<AppState>,
    current: SessionUser,
    Path(id): Path<i64>,
) -> Redirect {
    let SessionUser { user, session } = current;
    match delete_person(state.people.as_ref(), state.storage.as_ref(), id).await {
        Ok(()) => {
            info!(person_id = id, by = user.id, "record deleted");
            flash(&session, format!("ID {id} deleted successfully")).await;
        }
        Err(ServiceError::NotFound) => {
            flash(&session, format!("Failed to delete ID {id}")).await;
        }
        Err(e) => {
            error!(error = %e, person_id = id, "delete person failed");
            flash(&session, format!("Failed to delete ID {id}")).await;
        }
    }
    Redirect::to(PEOPLE_PATH)
}
