use crate::api::dto::{CommentDto, ExecutionDto, SummaryDto, TagDto, TradeDto};
use crate::api::{parse_id, ActingUser, AppState};
use crate::domain::execution::DATE_FORMAT;
use crate::domain::{TagId, TradeId};
use crate::error::AppError;
use crate::service::TradeFilter;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesResponse {
    pub trades: Vec<TradeDto>,
}

pub async fn list_trades(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
) -> Result<Json<TradesResponse>, AppError> {
    let trades = state.journal.list_trades(&user).await?;
    Ok(Json(TradesResponse {
        trades: trades.iter().map(TradeDto::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesSummaryQuery {
    pub start_date: String,
    pub end_date: String,
    /// Comma-separated tag ids.
    pub tag_ids: Option<String>,
    pub only_with_all_tags: Option<bool>,
}

impl TradesSummaryQuery {
    fn into_filter(self) -> Result<TradeFilter, AppError> {
        let parse_date = |raw: &str, field: &str| {
            NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map_err(|_| AppError::BadRequest(format!("{} must be YYYY-MM-DD", field)))
        };
        let start_date = parse_date(&self.start_date, "startDate")?;
        let end_date = parse_date(&self.end_date, "endDate")?;

        let tag_ids = self
            .tag_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| parse_id::<TagId>(s, "tag"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TradeFilter {
            start_date,
            end_date,
            tag_ids,
            only_with_all_tags: self.only_with_all_tags.unwrap_or(false),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeWithSummaryDto {
    #[serde(flatten)]
    pub trade: TradeDto,
    pub summary: SummaryDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesSummaryResponse {
    pub trades: Vec<TradeWithSummaryDto>,
}

/// Trades opened in a date range with per-trade rollups.
pub async fn trades_summary(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Query(params): Query<TradesSummaryQuery>,
) -> Result<Json<TradesSummaryResponse>, AppError> {
    let filter = params.into_filter()?;
    let trades = state.journal.trades_with_summary(&user, &filter).await?;

    Ok(Json(TradesSummaryResponse {
        trades: trades
            .iter()
            .map(|t| TradeWithSummaryDto {
                trade: TradeDto::from(&t.trade),
                summary: SummaryDto::from(&t.summary),
            })
            .collect(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDetailResponse {
    pub trade: TradeDto,
    pub executions: Vec<ExecutionDto>,
    pub summary: SummaryDto,
    pub tags: Vec<TagDto>,
    pub comments: Vec<CommentDto>,
}

pub async fn get_trade(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
) -> Result<Json<TradeDetailResponse>, AppError> {
    let trade_id: TradeId = parse_id(&id, "trade")?;
    let detail = state.journal.trade_detail(&user, &trade_id).await?;

    Ok(Json(TradeDetailResponse {
        trade: TradeDto::from(&detail.trade),
        executions: detail.executions.iter().map(ExecutionDto::from).collect(),
        summary: SummaryDto::from(&detail.summary),
        tags: detail.tags.iter().map(TagDto::from).collect(),
        comments: detail.comments.iter().map(CommentDto::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotesRequest {
    /// `null` clears the notes.
    pub notes: Option<String>,
}

pub async fn update_trade_notes(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateNotesRequest>,
) -> Result<Json<TradeDto>, AppError> {
    let trade_id: TradeId = parse_id(&id, "trade")?;
    let trade = state
        .journal
        .update_trade_notes(&user, &trade_id, request.notes)
        .await?;
    Ok(Json(TradeDto::from(&trade)))
}

pub async fn delete_trade(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let trade_id: TradeId = parse_id(&id, "trade")?;
    state.journal.delete_trade(&user, &trade_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
