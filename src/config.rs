use std::path::PathBuf;

use sqlx::postgres::PgConnectOptions;

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_minutes: i64,
    pub secure_cookie: bool,
}

/// Credentials for the admin account created on first start.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: PgConnectOptions,
    pub max_connections: u32,
    pub upload: UploadConfig,
    pub session: SessionConfig,
    pub bootstrap: Option<BootstrapAdmin>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = match var("DATABASE_URL") {
            Some(url) => url
                .parse::<PgConnectOptions>()
                .map_err(|e| anyhow::anyhow!("invalid DATABASE_URL: {e}"))?,
            None => {
                let mut options = PgConnectOptions::new_without_pgpass()
                    .host(&var("DB_HOST").unwrap_or_else(|| "localhost".into()))
                    .username(&var("DB_USER").unwrap_or_else(|| "postgres".into()))
                    .database(&var("DB_NAME").unwrap_or_else(|| "cipherstorm".into()));
                if let Some(password) = var("DB_PASSWORD").filter(|p| !p.is_empty()) {
                    options = options.password(&password);
                }
                options
            }
        };

        let max_connections = parse_or(&var, "DB_MAX_CONNECTIONS", 10u32)?;

        let allowed_extensions = var("ALLOWED_IMAGE_EXTENSIONS")
            .unwrap_or_else(|| "png,jpg,jpeg,gif".into())
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect::<Vec<_>>();
        anyhow::ensure!(
            !allowed_extensions.is_empty(),
            "ALLOWED_IMAGE_EXTENSIONS must name at least one extension"
        );

        let upload = UploadConfig {
            dir: PathBuf::from(var("UPLOAD_DIR").unwrap_or_else(|| "static/images".into())),
            allowed_extensions,
            max_body_bytes: parse_or(&var, "MAX_UPLOAD_MB", 20usize)? * 1024 * 1024,
        };

        let session = SessionConfig {
            ttl_minutes: parse_or(&var, "SESSION_TTL_MINUTES", 60i64)?,
            secure_cookie: parse_or(&var, "SESSION_SECURE_COOKIE", false)?,
        };

        let bootstrap = var("BOOTSTRAP_ADMIN_PASSWORD")
            .filter(|p| !p.is_empty())
            .map(|password| BootstrapAdmin {
                username: var("BOOTSTRAP_ADMIN_USERNAME").unwrap_or_else(|| "admin".into()),
                password,
            });

        Ok(Self {
            database,
            max_connections,
            upload,
            session,
            bootstrap,
        })
    }
}

fn parse_or<F, T>(var: &F, name: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {name}={raw:?}: {e}")),
        None => Ok(default),
    }
}
