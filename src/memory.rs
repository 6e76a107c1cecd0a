//! In-memory store implementations backing unit and router tests.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::api_keys::{repo::ApiKeyRepo, repo_types::ApiKey};
use crate::error::StoreError;
use crate::people::{
    repo::PersonRepo,
    repo_types::{Person, PersonFields},
};
use crate::users::{
    repo::UserRepo,
    repo_types::{User, UserChanges},
};

struct ImageRow {
    person_id: i64,
    path: String,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    api_keys: Vec<ApiKey>,
    people: Vec<Person>,
    images: Vec<ImageRow>,
    next_user_id: i64,
    next_key_id: i64,
    next_person_id: i64,
}

impl Tables {
    fn next(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn images_of(&self, person_id: i64) -> Vec<String> {
        self.images
            .iter()
            .filter(|i| i.person_id == person_id)
            .map(|i| i.path.clone())
            .collect()
    }

    fn push_images(&mut self, person_id: i64, paths: &[String]) {
        for path in paths {
            self.images.push(ImageRow {
                person_id,
                path: path.clone(),
            });
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_rows(&self) -> usize {
        self.lock().images.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, StoreError> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.username == username) {
            return Err(StoreError::Duplicate("username"));
        }
        let id = Tables::next(&mut t.next_user_id);
        let user = User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_admin,
            created_at: OffsetDateTime::now_utc(),
            last_login: None,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users = self.lock().users.clone();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> Result<bool, StoreError> {
        let mut t = self.lock();
        if let Some(name) = &changes.username {
            if t.users.iter().any(|u| u.id != id && &u.username == name) {
                return Err(StoreError::Duplicate("username"));
            }
        }
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        if let Some(name) = &changes.username {
            user.username = name.clone();
        }
        if let Some(hash) = &changes.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(flag) = changes.is_admin {
            user.is_admin = flag;
        }
        Ok(true)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut t = self.lock();
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        Ok(t.users.len() != before)
    }

    async fn touch_last_login(&self, id: i64) -> Result<(), StoreError> {
        if let Some(user) = self.lock().users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }
}

#[async_trait]
impl ApiKeyRepo for MemoryStore {
    async fn insert(
        &self,
        label: Option<&str>,
        key: &str,
        administrator: bool,
    ) -> Result<ApiKey, StoreError> {
        let mut t = self.lock();
        if t.api_keys.iter().any(|k| k.key == key) {
            return Err(StoreError::Duplicate("API key"));
        }
        let id = Tables::next(&mut t.next_key_id);
        let api_key = ApiKey {
            id,
            label: label.map(str::to_string),
            key: key.to_string(),
            administrator,
            created_at: OffsetDateTime::now_utc(),
        };
        t.api_keys.push(api_key.clone());
        Ok(api_key)
    }

    async fn list(&self) -> Result<Vec<ApiKey>, StoreError> {
        Ok(self.lock().api_keys.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut t = self.lock();
        let before = t.api_keys.len();
        t.api_keys.retain(|k| k.id != id);
        Ok(t.api_keys.len() != before)
    }
}

#[async_trait]
impl PersonRepo for MemoryStore {
    async fn reserve_id(&self) -> Result<i64, StoreError> {
        let mut t = self.lock();
        Ok(Tables::next(&mut t.next_person_id))
    }

    async fn insert(
        &self,
        id: i64,
        fields: &PersonFields,
        image_paths: &[String],
    ) -> Result<(), StoreError> {
        let mut t = self.lock();
        if t.people.iter().any(|p| p.id == id) {
            return Err(StoreError::Duplicate("person"));
        }
        t.people.push(fields.clone().into_person(id, Vec::new()));
        t.push_images(id, image_paths);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Person>, StoreError> {
        let t = self.lock();
        Ok(t.people
            .iter()
            .map(|p| Person {
                images: t.images_of(p.id),
                ..p.clone()
            })
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Person>, StoreError> {
        let t = self.lock();
        Ok(t.people.iter().find(|p| p.id == id).map(|p| Person {
            images: t.images_of(id),
            ..p.clone()
        }))
    }

    async fn update(&self, id: i64, fields: &PersonFields) -> Result<bool, StoreError> {
        let mut t = self.lock();
        match t.people.iter_mut().find(|p| p.id == id) {
            Some(p) => {
                *p = fields.clone().into_person(id, Vec::new());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_images(&self, id: i64, paths: &[String]) -> Result<(), StoreError> {
        let mut t = self.lock();
        if !t.people.iter().any(|p| p.id == id) {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }
        t.images.retain(|i| i.person_id != id);
        t.push_images(id, paths);
        Ok(())
    }

    async fn update_with_images(
        &self,
        id: i64,
        fields: &PersonFields,
        paths: &[String],
    ) -> Result<bool, StoreError> {
        let mut t = self.lock();
        let Some(p) = t.people.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        *p = fields.clone().into_person(id, Vec::new());
        t.images.retain(|i| i.person_id != id);
        t.push_images(id, paths);
        Ok(true)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut t = self.lock();
        t.images.retain(|i| i.person_id != id);
        let before = t.people.len();
        t.people.retain(|p| p.id != id);
        Ok(t.people.len() != before)
    }
}
