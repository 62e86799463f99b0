//! Tag and comment handlers.

use crate::api::dto::{CommentDto, TagDto};
use crate::api::{parse_id, ActingUser, AppState};
use crate::domain::{CommentId, TagId, TradeId};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagsResponse {
    pub tags: Vec<TagDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagNameRequest {
    pub tag_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeTagsRequest {
    pub tag_ids: Vec<String>,
}

impl TradeTagsRequest {
    fn parse(&self) -> Result<Vec<TagId>, AppError> {
        self.tag_ids.iter().map(|id| parse_id(id, "tag")).collect()
    }
}

pub async fn list_tags(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
) -> Result<Json<TagsResponse>, AppError> {
    let tags = state.journal.list_tags(&user).await?;
    Ok(Json(TagsResponse {
        tags: tags.iter().map(TagDto::from).collect(),
    }))
}

pub async fn create_tag(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Json(request): Json<TagNameRequest>,
) -> Result<(StatusCode, Json<TagDto>), AppError> {
    let tag = state.journal.create_tag(&user, &request.tag_name).await?;
    Ok((StatusCode::CREATED, Json(TagDto::from(&tag))))
}

pub async fn rename_tag(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
    Json(request): Json<TagNameRequest>,
) -> Result<Json<TagDto>, AppError> {
    let tag_id: TagId = parse_id(&id, "tag")?;
    let tag = state
        .journal
        .rename_tag(&user, &tag_id, &request.tag_name)
        .await?;
    Ok(Json(TagDto::from(&tag)))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let tag_id: TagId = parse_id(&id, "tag")?;
    state.journal.delete_tag(&user, &tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_trade_tags(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
) -> Result<Json<TagsResponse>, AppError> {
    let trade_id: TradeId = parse_id(&id, "trade")?;
    let tags = state.journal.trade_tags(&user, &trade_id).await?;
    Ok(Json(TagsResponse {
        tags: tags.iter().map(TagDto::from).collect(),
    }))
}

pub async fn attach_trade_tags(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
    Json(request): Json<TradeTagsRequest>,
) -> Result<Json<TagsResponse>, AppError> {
    let trade_id: TradeId = parse_id(&id, "trade")?;
    let tag_ids = request.parse()?;
    let tags = state.journal.attach_tags(&user, &trade_id, &tag_ids).await?;
    Ok(Json(TagsResponse {
        tags: tags.iter().map(TagDto::from).collect(),
    }))
}

pub async fn detach_trade_tags(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
    Json(request): Json<TradeTagsRequest>,
) -> Result<Json<TagsResponse>, AppError> {
    let trade_id: TradeId = parse_id(&id, "trade")?;
    let tag_ids = request.parse()?;
    let tags = state.journal.detach_tags(&user, &trade_id, &tag_ids).await?;
    Ok(Json(TagsResponse {
        tags: tags.iter().map(TagDto::from).collect(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsResponse {
    pub comments: Vec<CommentDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentBodyRequest {
    pub body: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
) -> Result<Json<CommentsResponse>, AppError> {
    let trade_id: TradeId = parse_id(&id, "trade")?;
    let comments = state.journal.list_comments(&user, &trade_id).await?;
    Ok(Json(CommentsResponse {
        comments: comments.iter().map(CommentDto::from).collect(),
    }))
}

pub async fn add_comment(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
    Json(request): Json<CommentBodyRequest>,
) -> Result<(StatusCode, Json<CommentDto>), AppError> {
    let trade_id: TradeId = parse_id(&id, "trade")?;
    let comment = state
        .journal
        .add_comment(&user, &trade_id, &request.body)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentDto::from(&comment))))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
    Json(request): Json<CommentBodyRequest>,
) -> Result<Json<CommentDto>, AppError> {
    let comment_id: CommentId = parse_id(&id, "comment")?;
    let comment = state
        .journal
        .edit_comment(&user, &comment_id, &request.body)
        .await?;
    Ok(Json(CommentDto::from(&comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let comment_id: CommentId = parse_id(&id, "comment")?;
    state.journal.delete_comment(&user, &comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
