use crate::api::dto::{DecimalInput, ExecutionDto, TradeDto};
use crate::api::{parse_id, ActingUser, AppState};
use crate::domain::{ExecutionChanges, ExecutionId};
use crate::engine::ReversalOutcome;
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionsResponse {
    pub executions: Vec<ExecutionDto>,
}

pub async fn list_executions(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
) -> Result<Json<ExecutionsResponse>, AppError> {
    let executions = state.journal.list_executions(&user).await?;
    Ok(Json(ExecutionsResponse {
        executions: executions.iter().map(ExecutionDto::from).collect(),
    }))
}

/// Editable execution fields. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditExecutionRequest {
    pub quantity: Option<i64>,
    pub price: Option<DecimalInput>,
    pub notes: Option<String>,
    pub net_proceeds: Option<DecimalInput>,
}

impl EditExecutionRequest {
    fn into_changes(self) -> Result<ExecutionChanges, AppError> {
        Ok(ExecutionChanges {
            quantity: self.quantity,
            price: self.price.map(|p| p.parse("price")).transpose()?,
            notes: self.notes,
            net_proceeds: self
                .net_proceeds
                .map(|n| n.parse("netProceeds"))
                .transpose()?,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditExecutionResponse {
    pub execution: ExecutionDto,
    pub trade: TradeDto,
}

pub async fn edit_execution(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
    Json(request): Json<EditExecutionRequest>,
) -> Result<Json<EditExecutionResponse>, AppError> {
    let execution_id: ExecutionId = parse_id(&id, "execution")?;
    let changes = request.into_changes()?;

    let edited = state
        .journal
        .edit_execution(&user, &execution_id, &changes)
        .await?;

    Ok(Json(EditExecutionResponse {
        execution: ExecutionDto::from(&edited.execution),
        trade: TradeDto::from(&edited.trade),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteExecutionResponse {
    /// `open`, `closed`, or `tradeDeleted` when no executions remained.
    pub outcome: &'static str,
    pub trade: Option<TradeDto>,
}

pub async fn delete_execution(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteExecutionResponse>, AppError> {
    let execution_id: ExecutionId = parse_id(&id, "execution")?;
    let deleted = state.journal.delete_execution(&user, &execution_id).await?;

    let outcome = match deleted.outcome {
        ReversalOutcome::Open => "open",
        ReversalOutcome::Closed => "closed",
        ReversalOutcome::Emptied => "tradeDeleted",
    };
    Ok(Json(DeleteExecutionResponse {
        outcome,
        trade: deleted.trade.as_ref().map(TradeDto::from),
    }))
}
