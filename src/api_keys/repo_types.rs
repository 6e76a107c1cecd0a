use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Stored API key. `key` is a bearer secret and is kept out of `Debug` output.
#[derive(Clone, Serialize, FromRow)]
pub struct ApiKey {
    pub id: i64,
    pub label: Option<String>,
    pub key: String,
    pub administrator: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("key", &"[REDACTED]")
            .field("administrator", &self.administrator)
            .finish()
    }
}
