pub mod annotations;
pub mod dto;
pub mod executions;
pub mod health;
pub mod imports;
pub mod trades;
pub mod users;

use crate::config::Config;
use crate::domain::UserId;
use crate::error::AppError;
use crate::service::TradeJournal;
use axum::async_trait;
use axum::extract::{DefaultBodyLimit, FromRequestParts};
use axum::http::request::Parts;
use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

/// Header carrying the acting user's id.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub journal: Arc<TradeJournal>,
    pub config: Config,
}

impl AppState {
    pub fn new(journal: Arc<TradeJournal>, config: Config) -> Self {
        Self { journal, config }
    }
}

/// The registered user a request acts for, taken from `X-User-Id`.
#[derive(Debug, Clone)]
pub struct ActingUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let raw = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| AppError::BadRequest("Missing X-User-Id header".into()))?
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid X-User-Id header".into()))?;
        let user: UserId = raw
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid X-User-Id header".into()))?;

        if !state.journal.user_exists(&user).await? {
            return Err(AppError::Forbidden("unknown user".into()));
        }
        Ok(ActingUser(user))
    }
}

/// Parse a path or body identifier, rejecting malformed ones as bad requests.
pub(crate) fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {} id", what)))
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/users", post(users::create_user))
        .route("/v1/imports", post(imports::import_file))
        .route("/v1/executions", get(executions::list_executions))
        .route(
            "/v1/executions/:id",
            patch(executions::edit_execution).delete(executions::delete_execution),
        )
        .route("/v1/trades", get(trades::list_trades))
        .route("/v1/trades/summary", get(trades::trades_summary))
        .route(
            "/v1/trades/:id",
            get(trades::get_trade)
                .patch(trades::update_trade_notes)
                .delete(trades::delete_trade),
        )
        .route(
            "/v1/trades/:id/tags",
            get(annotations::get_trade_tags)
                .post(annotations::attach_trade_tags)
                .delete(annotations::detach_trade_tags),
        )
        .route(
            "/v1/trades/:id/comments",
            get(annotations::list_comments).post(annotations::add_comment),
        )
        .route(
            "/v1/comments/:id",
            patch(annotations::edit_comment).delete(annotations::delete_comment),
        )
        .route(
            "/v1/tags",
            get(annotations::list_tags).post(annotations::create_tag),
        )
        .route(
            "/v1/tags/:id",
            patch(annotations::rename_tag).delete(annotations::delete_tag),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}
