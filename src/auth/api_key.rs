use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use crate::api_keys::{repo::ApiKeyRepo, services::find_matching};
use crate::error::MessageBody;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// The key that authenticated an API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCaller {
    pub key_id: i64,
    pub label: Option<String>,
    pub administrator: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiDenial {
    Missing,
    Invalid,
    NotAdministrator,
    Unavailable,
}

impl IntoResponse for ApiDenial {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiDenial::Missing => (StatusCode::UNAUTHORIZED, "API key missing"),
            ApiDenial::Invalid => (StatusCode::FORBIDDEN, "Invalid API key"),
            ApiDenial::NotAdministrator => {
                (StatusCode::FORBIDDEN, "Administrator API key required")
            }
            ApiDenial::Unavailable => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        (status, MessageBody::new(message)).into_response()
    }
}

/// Reads the presented key. A header that is not valid UTF-8 can never match.
fn presented_key(headers: &HeaderMap) -> Result<Option<&str>, ApiDenial> {
    match headers.get(API_KEY_HEADER) {
        None => Ok(None),
        Some(value) => value.to_str().map(Some).map_err(|_| ApiDenial::Invalid),
    }
}

pub async fn check_api_key(
    repo: &dyn ApiKeyRepo,
    presented: Option<&str>,
) -> Result<ApiCaller, ApiDenial> {
    let presented = match presented {
        Some(k) if !k.is_empty() => k,
        _ => return Err(ApiDenial::Missing),
    };
    match find_matching(repo, presented).await {
        Ok(Some(key)) => Ok(ApiCaller {
            key_id: key.id,
            label: key.label,
            administrator: key.administrator,
        }),
        Ok(None) => Err(ApiDenial::Invalid),
        Err(e) => {
            error!(error = %e, "api key lookup failed");
            Err(ApiDenial::Unavailable)
        }
    }
}

pub fn require_administrator(caller: ApiCaller) -> Result<ApiCaller, ApiDenial> {
    if caller.administrator {
        Ok(caller)
    } else {
        Err(ApiDenial::NotAdministrator)
    }
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<ApiCaller, ApiDenial> {
    let presented = presented_key(&parts.headers)?;
    let caller = check_api_key(state.api_keys.as_ref(), presented)
        .await
        .map_err(|denial| {
            warn!(?denial, path = %parts.uri.path(), "api request denied");
            denial
        })?;
    debug!(key_id = caller.key_id, label = ?caller.label, "api key accepted");
    Ok(caller)
}

/// Any stored key.
pub struct ApiKeyAuth(pub ApiCaller);

#[async_trait]
impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = ApiDenial;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(ApiKeyAuth)
    }
}

/// A stored key carrying the administrator flag.
pub struct ApiAdmin(pub ApiCaller);

#[async_trait]
impl FromRequestParts<AppState> for ApiAdmin {
    type Rejection = ApiDenial;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = authenticate(parts, state).await?;
        let key_id = caller.key_id;
        require_administrator(caller).map(ApiAdmin).map_err(|denial| {
            warn!(key_id, "administrator key required");
            denial
        })
    }
}
