use crate::api::{ActingUser, AppState};
use crate::error::AppError;
use crate::service::ImportSummary;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportQuery {
    pub file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub rows: usize,
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub trades_opened: usize,
    pub trades_closed: usize,
}

impl From<ImportSummary> for ImportResponse {
    fn from(s: ImportSummary) -> Self {
        ImportResponse {
            rows: s.rows,
            imported: s.imported,
            skipped_duplicates: s.skipped_duplicates,
            trades_opened: s.trades_opened,
            trades_closed: s.trades_closed,
        }
    }
}

/// Import a broker CSV sent as the raw request body.
pub async fn import_file(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Query(params): Query<ImportQuery>,
    body: Bytes,
) -> Result<Json<ImportResponse>, AppError> {
    let summary = state
        .journal
        .import_csv(&user, &params.file_name, &body)
        .await?;
    Ok(Json(summary.into()))
}
