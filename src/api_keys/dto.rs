use serde::{Deserialize, Serialize};

use crate::api_keys::repo_types::ApiKey;

/// New key form; a blank `key` asks the server to generate one.
#[derive(Debug, Deserialize)]
pub struct ApiKeyForm {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub admin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiKeysPage {
    pub apikeys: Vec<ApiKey>,
}

#[derive(Debug, Serialize)]
pub struct AddKeyPage {
    pub generated_key: String,
}
