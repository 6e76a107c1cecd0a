use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Placement of image files, one directory per person.
///
/// Stored paths are relative to the storage root: `person_<id>/<file name>`.
/// `place` never replaces an existing file; a taken name gets a numeric suffix.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn place(&self, person_id: i64, file_name: &str, body: Bytes) -> anyhow::Result<String>;
    async fn remove(&self, path: &str) -> anyhow::Result<()>;
    async fn remove_person_dir(&self, person_id: i64) -> anyhow::Result<()>;
}

pub fn person_dir(person_id: i64) -> String {
    format!("person_{person_id}")
}

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// `face.png`, then `face-1.png`, `face-2.png`, ...
fn numbered(file_name: &str, n: u32) -> String {
    if n == 0 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{n}.{ext}"),
        _ => format!("{file_name}-{n}"),
    }
}

#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a stored path, refusing anything that could escape the root.
    fn resolve(&self, stored: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(stored);
        let safe = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        anyhow::ensure!(safe && !stored.is_empty(), "unsafe image path {stored:?}");
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ImageStorage for LocalStorage {
    async fn place(&self, person_id: i64, file_name: &str, body: Bytes) -> anyhow::Result<String> {
        let dir = person_dir(person_id);
        // validates the name before the directory is created
        self.resolve(&format!("{dir}/{file_name}"))?;
        let dir_path = self.resolve(&dir)?;
        tokio::fs::create_dir_all(&dir_path)
            .await
            .with_context(|| format!("create {}", dir_path.display()))?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let stored = format!("{dir}/{}", numbered(file_name, attempt));
            let target = self.resolve(&stored)?;
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e).with_context(|| format!("create {}", target.display())),
            };
            file.write_all(&body)
                .await
                .with_context(|| format!("write {}", target.display()))?;
            file.flush()
                .await
                .with_context(|| format!("flush {}", target.display()))?;
            debug!(path = %stored, bytes = body.len(), "image placed");
            return Ok(stored);
        }
        anyhow::bail!("no free name for {file_name:?} in {}", dir_path.display())
    }

    async fn remove(&self, path: &str) -> anyhow::Result<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", target.display())),
        }
    }

    async fn remove_person_dir(&self, person_id: i64) -> anyhow::Result<()> {
        let dir = self.root.join(person_dir(person_id));
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", dir.display())),
        }
    }
}
