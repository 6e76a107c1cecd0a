use std::path::Path;

use bytes::Bytes;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ServiceError;
use crate::people::{
    repo::PersonRepo,
    repo_types::{Person, PersonFields},
};
use crate::storage::ImageStorage;

/// An accepted upload: sanitized file name plus contents.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub body: Bytes,
}

/// Strips any directory part and replaces characters outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// Returns the sanitized name when the file may be stored, `None` otherwise.
pub fn accept_upload(raw_name: &str, allowed_extensions: &[String]) -> Option<String> {
    let name = sanitize_file_name(raw_name);
    let ext = Path::new(&name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    allowed_extensions
        .iter()
        .any(|allowed| *allowed == ext)
        .then_some(name)
}

/// Old paths minus `removed`, then `added`; the first occurrence of a path wins.
pub fn merge_image_paths(old: &[String], removed: &[String], added: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(old.len() + added.len());
    let kept = old.iter().filter(|p| !removed.contains(p));
    for path in kept.chain(added.iter()) {
        if !merged.contains(path) {
            merged.push(path.clone());
        }
    }
    merged
}

async fn place_all(
    storage: &dyn ImageStorage,
    person_id: i64,
    uploads: Vec<Upload>,
) -> Result<Vec<String>, ServiceError> {
    let mut placed = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match storage.place(person_id, &upload.file_name, upload.body).await {
            Ok(path) => placed.push(path),
            Err(e) => {
                discard_files(storage, person_id, &placed).await;
                return Err(ServiceError::Storage(e));
            }
        }
    }
    Ok(placed)
}

/// Writes the uploads, then the person and its image rows in one transaction.
#[instrument(skip(people, storage, values, uploads), fields(uploads = uploads.len()))]
pub async fn create_person(
    people: &dyn PersonRepo,
    storage: &dyn ImageStorage,
    values: PersonFields,
    uploads: Vec<Upload>,
) -> Result<Person, ServiceError> {
    let id = people.reserve_id().await?;

    let paths = match place_all(storage, id, uploads).await {
        Ok(paths) => paths,
        Err(e) => {
            discard_dir(storage, id).await;
            return Err(e);
        }
    };
    let paths = merge_image_paths(&[], &[], &paths);

    if let Err(e) = people.insert(id, &values, &paths).await {
        discard_dir(storage, id).await;
        return Err(e.into());
    }

    info!(person_id = id, images = paths.len(), "person created");
    Ok(values.into_person(id, paths))
}

/// Overwrites the fields and applies the image policy.
///
/// New files are placed before the rows change; files dropped from the set
/// are unlinked only once the rows are committed.
#[instrument(skip(people, storage, values, removed, uploads))]
pub async fn update_person(
    people: &dyn PersonRepo,
    storage: &dyn ImageStorage,
    id: i64,
    values: PersonFields,
    removed: Vec<String>,
    uploads: Vec<Upload>,
) -> Result<Person, ServiceError> {
    let current = people.find_by_id(id).await?.ok_or(ServiceError::NotFound)?;

    let added = place_all(storage, id, uploads).await?;
    let images = merge_image_paths(&current.images, &removed, &added);

    let outcome = people
        .update_with_images(id, &values, &images)
        .await
        .map_err(ServiceError::from)
        .and_then(|found| if found { Ok(()) } else { Err(ServiceError::NotFound) });
    if let Err(e) = outcome {
        discard_files(storage, id, &added).await;
        return Err(e);
    }

    let dropped: Vec<String> = current
        .images
        .into_iter()
        .filter(|p| !images.contains(p))
        .collect();
    discard_files(storage, id, &dropped).await;

    info!(person_id = id, images = images.len(), "person updated");
    Ok(values.into_person(id, images))
}

#[instrument(skip(people, storage))]
pub async fn delete_person(
    people: &dyn PersonRepo,
    storage: &dyn ImageStorage,
    id: i64,
) -> Result<(), ServiceError> {
    if !people.delete(id).await? {
        return Err(ServiceError::NotFound);
    }
    discard_dir(storage, id).await;
    info!(person_id = id, "person deleted");
    Ok(())
}

async fn discard_files(storage: &dyn ImageStorage, person_id: i64, paths: &[String]) {
    for path in paths {
        if let Err(e) = storage.remove(path).await {
            warn!(person_id, path = %path, error = %e, "failed to remove image file");
        }
    }
}

async fn discard_dir(storage: &dyn ImageStorage, person_id: i64) {
    match storage.remove_person_dir(person_id).await {
        Ok(()) => debug!(person_id, "image directory removed"),
        Err(e) => error!(person_id, error = %e, "failed to remove image directory"),
    }
}
