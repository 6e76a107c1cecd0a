use subtle::ConstantTimeEq;
use tracing::{info, instrument};

use crate::api_keys::{keygen, repo::ApiKeyRepo, repo_types::ApiKey};
use crate::error::StoreError;

/// Finds the stored key equal to `presented`.
///
/// Every stored key is compared in constant time and the loop never exits
/// early. A match counts only when exactly one stored key is equal.
pub async fn find_matching(
    repo: &dyn ApiKeyRepo,
    presented: &str,
) -> Result<Option<ApiKey>, StoreError> {
    let keys = repo.list().await?;
    let mut matches = 0usize;
    let mut found = None;
    for key in keys {
        let equal: bool = key.key.as_bytes().ct_eq(presented.as_bytes()).into();
        if equal {
            matches += 1;
            found = Some(key);
        }
    }
    Ok(if matches == 1 { found } else { None })
}

/// Stores a key. A blank `key` is replaced by a freshly generated one.
#[instrument(skip(repo, key))]
pub async fn create_key(
    repo: &dyn ApiKeyRepo,
    label: &str,
    key: &str,
    administrator: bool,
) -> Result<ApiKey, StoreError> {
    let label = Some(label.trim()).filter(|l| !l.is_empty());
    let key = match key.trim() {
        "" => keygen::generate_default(),
        k => k.to_string(),
    };
    let created = repo.insert(label, &key, administrator).await?;
    info!(key_id = created.id, administrator, "api key created");
    Ok(created)
}
