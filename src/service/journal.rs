//! Transactional orchestration of import, edit and delete over a [`Session`].
//!
//! The `apply_*` functions are the core operations: each takes the session
//! explicitly and leaves committing to the caller. [`TradeJournal`] opens one
//! session per attempt, commits it, and retries attempts that lost a
//! concurrent-write race.

use crate::db::{Repository, Session};
use crate::domain::annotation::{MAX_NOTE_CHARS, MAX_TAG_CHARS};
use crate::domain::execution::{MAX_AMOUNT, MAX_QUANTITY};
use crate::domain::ordering::sort_for_processing;
use crate::domain::{
    BrokerFill, Comment, CommentId, Execution, ExecutionChanges, ExecutionId, Tag, TagId, Trade,
    TradeId, User, UserId,
};
use crate::engine::{
    reconcile_fill, recompute_after_edit, reverse_execution, summarize, FillOutcome,
    ReversalOutcome, TradeSummary,
};
use crate::import::{normalize_rows, read_csv_upload, RawRow};
use crate::service::JournalError;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Counts reported after a successful import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Rows left after blank-row filtering.
    pub rows: usize,
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub trades_opened: usize,
    pub trades_closed: usize,
}

/// Date range and tag selection for [`TradeJournal::trades_with_summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeFilter {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Empty means no tag filtering.
    pub tag_ids: Vec<TagId>,
    pub only_with_all_tags: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeWithSummary {
    pub trade: Trade,
    pub summary: TradeSummary,
}

/// One trade with everything attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeDetail {
    pub trade: Trade,
    /// In processing order.
    pub executions: Vec<Execution>,
    pub summary: TradeSummary,
    pub tags: Vec<Tag>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedExecution {
    pub execution: Execution,
    pub trade: Trade,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedExecution {
    pub outcome: ReversalOutcome,
    /// The parent trade after reversal; `None` once it was emptied and removed.
    pub trade: Option<Trade>,
}

// =============================================================================
// Core operations
// =============================================================================

async fn require_user(session: &mut Session, user: &UserId) -> Result<(), JournalError> {
    if session.user_exists(user).await? {
        Ok(())
    } else {
        Err(JournalError::Forbidden("unknown user".to_string()))
    }
}

fn ensure_owner(trade: &Trade, user: &UserId) -> Result<(), JournalError> {
    if &trade.user_id == user {
        Ok(())
    } else {
        Err(JournalError::Forbidden("trade belongs to another user".to_string()))
    }
}

async fn owned_trade_in(
    session: &mut Session,
    user: &UserId,
    trade_id: &TradeId,
) -> Result<Trade, JournalError> {
    let trade = session
        .find_trade(trade_id)
        .await?
        .ok_or(JournalError::NotFound("trade"))?;
    ensure_owner(&trade, user)?;
    Ok(trade)
}

async fn save_trade(session: &mut Session, trade: &mut Trade) -> Result<(), JournalError> {
    if session.update_trade(trade).await? {
        Ok(())
    } else {
        Err(JournalError::Conflict)
    }
}

/// Refuse to reopen a trade while another trade in the same symbol is open.
async fn guard_reopen(session: &mut Session, trade: &Trade) -> Result<(), JournalError> {
    match session.find_open_trade(&trade.user_id, &trade.symbol).await? {
        Some(other) if other.id != trade.id => Err(JournalError::OpenTradeExists),
        _ => Ok(()),
    }
}

/// Trimmed tag name, or a validation error when empty or too long.
fn validate_tag_name(tag_name: &str) -> Result<&str, JournalError> {
    let tag_name = tag_name.trim();
    if tag_name.is_empty() || tag_name.chars().count() > MAX_TAG_CHARS {
        return Err(JournalError::Validation(format!(
            "tag name must be 1 to {} characters",
            MAX_TAG_CHARS
        )));
    }
    Ok(tag_name)
}

/// Trimmed comment body, or a validation error when empty or too long.
fn validate_comment(body: &str) -> Result<&str, JournalError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(JournalError::Validation("comment must not be empty".to_string()));
    }
    validate_note("comment", body)?;
    Ok(body)
}

fn validate_note(field: &str, text: &str) -> Result<(), JournalError> {
    if text.chars().count() > MAX_NOTE_CHARS {
        return Err(JournalError::Validation(format!(
            "{} must be at most {} characters",
            field, MAX_NOTE_CHARS
        )));
    }
    Ok(())
}

/// Reconcile sequenced fills into the user's trades.
///
/// `fills` must already be in processing order. Fills whose fingerprint the
/// user already holds are skipped. Any error leaves the session unusable and
/// the caller must drop it.
pub async fn apply_import(
    session: &mut Session,
    user: &UserId,
    fills: &[BrokerFill],
) -> Result<ImportSummary, JournalError> {
    require_user(session, user).await?;

    let mut summary = ImportSummary {
        rows: fills.len(),
        ..Default::default()
    };

    for fill in fills {
        if let Some(field) = fill.out_of_range_field() {
            return Err(JournalError::Validation(format!(
                "{} {} on {}: {} is out of range",
                fill.side, fill.quantity, fill.symbol, field
            )));
        }
        let fingerprint = fill.fingerprint();
        if session.fingerprint_exists(user, &fingerprint).await? {
            debug!(user = %user, symbol = %fill.symbol, "skipping previously imported execution");
            summary.skipped_duplicates += 1;
            continue;
        }

        let open = session.find_open_trade(user, &fill.symbol).await?;
        let is_new = open.is_none();
        let (mut trade, outcome) = reconcile_fill(user, open, fill);

        if is_new {
            session.insert_trade(&trade).await?;
            summary.trades_opened += 1;
        } else {
            save_trade(session, &mut trade).await?;
        }
        if outcome == FillOutcome::Closed {
            summary.trades_closed += 1;
        }

        let execution = Execution::from_fill(fill.clone(), trade.id.clone());
        session.insert_execution(user, &execution).await?;
        summary.imported += 1;
    }

    Ok(summary)
}

/// Apply a change set to one execution and re-derive its trade if needed.
pub async fn apply_edit(
    session: &mut Session,
    user: &UserId,
    execution_id: &ExecutionId,
    changes: &ExecutionChanges,
) -> Result<EditedExecution, JournalError> {
    if changes.is_empty() {
        return Err(JournalError::Validation(
            "at least one of quantity, price, notes, net_proceeds is required".to_string(),
        ));
    }
    if matches!(changes.quantity, Some(q) if q <= 0) {
        return Err(JournalError::Validation("quantity must be positive".to_string()));
    }
    if matches!(changes.quantity, Some(q) if q > MAX_QUANTITY) {
        return Err(JournalError::Validation(format!(
            "quantity must be at most {}",
            MAX_QUANTITY
        )));
    }
    if matches!(changes.price, Some(p) if p.is_negative()) {
        return Err(JournalError::Validation("price must not be negative".to_string()));
    }
    for (field, value) in [("price", changes.price), ("net_proceeds", changes.net_proceeds)] {
        if matches!(value, Some(v) if v.exceeds_abs(MAX_AMOUNT)) {
            return Err(JournalError::Validation(format!("{} is out of range", field)));
        }
    }
    if let Some(notes) = &changes.notes {
        validate_note("notes", notes)?;
    }

    let mut execution = session
        .find_execution(execution_id)
        .await?
        .ok_or(JournalError::NotFound("execution"))?;
    let mut trade = owned_trade_in(session, user, &execution.trade_id).await?;

    changes.apply_to(&mut execution);
    if !session.update_execution(&execution).await? {
        return Err(JournalError::Conflict);
    }

    if changes.touches_position() {
        let linked = session.executions_for_trade(&trade.id).await?;
        let was_open = trade.is_open();
        recompute_after_edit(&mut trade, &linked, changes);
        if !was_open && trade.is_open() {
            guard_reopen(session, &trade).await?;
        }
        save_trade(session, &mut trade).await?;
    }

    Ok(EditedExecution { execution, trade })
}

/// Remove one execution, undoing its contribution to its trade.
pub async fn apply_delete(
    session: &mut Session,
    user: &UserId,
    execution_id: &ExecutionId,
) -> Result<DeletedExecution, JournalError> {
    let execution = session
        .find_execution(execution_id)
        .await?
        .ok_or(JournalError::NotFound("execution"))?;
    let mut trade = owned_trade_in(session, user, &execution.trade_id).await?;

    let remaining: Vec<Execution> = session
        .executions_for_trade(&trade.id)
        .await?
        .into_iter()
        .filter(|e| e.id != execution.id)
        .collect();

    let was_open = trade.is_open();
    let outcome = reverse_execution(&mut trade, &execution, &remaining);

    if !session.delete_execution(&execution.id).await? {
        return Err(JournalError::Conflict);
    }

    let trade = match outcome {
        ReversalOutcome::Emptied => {
            session.delete_trade(&trade.id).await?;
            None
        }
        ReversalOutcome::Open | ReversalOutcome::Closed => {
            if !was_open && trade.is_open() {
                guard_reopen(session, &trade).await?;
            }
            save_trade(session, &mut trade).await?;
            Some(trade)
        }
    };

    Ok(DeletedExecution { outcome, trade })
}

/// True when a trade's tags satisfy the requested selection.
pub fn matches_tags(attached: Option<&HashSet<TagId>>, wanted: &[TagId], all: bool) -> bool {
    if wanted.is_empty() {
        return true;
    }
    let Some(attached) = attached else {
        return false;
    };
    if all {
        wanted.iter().all(|tag| attached.contains(tag))
    } else {
        wanted.iter().any(|tag| attached.contains(tag))
    }
}

/// Run `attempt` until it succeeds, fails permanently, or has been retried
/// `max_retries` times after a [`JournalError::Conflict`].
pub async fn retry_conflicts<T, F, Fut>(
    operation: &'static str,
    max_retries: u32,
    mut attempt: F,
) -> Result<T, JournalError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, JournalError>>,
{
    let policy = ExponentialBackoff {
        initial_interval: Duration::from_millis(20),
        max_interval: Duration::from_millis(500),
        max_elapsed_time: Some(Duration::from_secs(10)),
        ..Default::default()
    };

    let mut attempts = 0u32;
    retry(policy, || {
        attempts += 1;
        let attempt_number = attempts;
        let fut = attempt();
        async move {
            match fut.await {
                Ok(value) => Ok(value),
                Err(err) if err.is_retryable() && attempt_number <= max_retries => {
                    warn!(operation, attempt = attempt_number, "write conflict, retrying");
                    Err(backoff::Error::transient(err))
                }
                Err(err) => Err(backoff::Error::permanent(err)),
            }
        }
    })
    .await
}

// =============================================================================
// Service
// =============================================================================

/// Entry point for every journal operation.
#[derive(Debug, Clone)]
pub struct TradeJournal {
    repo: Repository,
    conflict_retries: u32,
}

impl TradeJournal {
    pub fn new(repo: Repository, conflict_retries: u32) -> Self {
        TradeJournal {
            repo,
            conflict_retries,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    async fn owned_trade(&self, user: &UserId, trade_id: &TradeId) -> Result<Trade, JournalError> {
        let trade = self
            .repo
            .find_trade(trade_id)
            .await?
            .ok_or(JournalError::NotFound("trade"))?;
        ensure_owner(&trade, user)?;
        Ok(trade)
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn create_user(&self, email: &str) -> Result<User, JournalError> {
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(JournalError::Validation("a valid email is required".to_string()));
        }

        let mut session = self.repo.begin().await?;
        if session.email_taken(&email).await? {
            return Err(JournalError::Validation("email already registered".to_string()));
        }
        let user = User {
            id: UserId::generate(),
            email,
            created_at_ms: chrono::Utc::now().timestamp_millis(),
        };
        session.insert_user(&user).await?;
        session.commit().await?;

        info!(user = %user.id, "user created");
        Ok(user)
    }

    pub async fn user_exists(&self, user: &UserId) -> Result<bool, JournalError> {
        Ok(self.repo.user_exists(user).await?)
    }

    // =========================================================================
    // Import
    // =========================================================================

    /// Import an uploaded broker file. Only `.csv` names are accepted.
    pub async fn import_csv(
        &self,
        user: &UserId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<ImportSummary, JournalError> {
        let rows = read_csv_upload(file_name, bytes)?;
        self.import_rows(user, &rows).await
    }

    /// Normalize, sequence and reconcile raw rows in one transaction.
    pub async fn import_rows(
        &self,
        user: &UserId,
        rows: &[RawRow],
    ) -> Result<ImportSummary, JournalError> {
        let mut fills = normalize_rows(rows)?;
        sort_for_processing(&mut fills);
        self.import_fills(user, &fills).await
    }

    /// Reconcile already-sequenced fills in one transaction.
    pub async fn import_fills(
        &self,
        user: &UserId,
        fills: &[BrokerFill],
    ) -> Result<ImportSummary, JournalError> {
        let repo = &self.repo;
        let summary = retry_conflicts("import", self.conflict_retries, || async move {
            let mut session = repo.begin().await?;
            let summary = apply_import(&mut session, user, fills).await?;
            session.commit().await?;
            Ok::<_, JournalError>(summary)
        })
        .await?;

        info!(
            user = %user,
            rows = summary.rows,
            imported = summary.imported,
            skipped = summary.skipped_duplicates,
            opened = summary.trades_opened,
            closed = summary.trades_closed,
            "import complete"
        );
        Ok(summary)
    }

    // =========================================================================
    // Executions
    // =========================================================================

    pub async fn edit_execution(
        &self,
        user: &UserId,
        execution_id: &ExecutionId,
        changes: &ExecutionChanges,
    ) -> Result<EditedExecution, JournalError> {
        let repo = &self.repo;
        let edited = retry_conflicts("edit_execution", self.conflict_retries, || async move {
            let mut session = repo.begin().await?;
            let edited = apply_edit(&mut session, user, execution_id, changes).await?;
            session.commit().await?;
            Ok::<_, JournalError>(edited)
        })
        .await?;

        info!(
            user = %user,
            execution_id = %execution_id,
            trade_id = %edited.trade.id,
            status = %edited.trade.status,
            "execution edited"
        );
        Ok(edited)
    }

    pub async fn delete_execution(
        &self,
        user: &UserId,
        execution_id: &ExecutionId,
    ) -> Result<DeletedExecution, JournalError> {
        let repo = &self.repo;
        let deleted = retry_conflicts("delete_execution", self.conflict_retries, || async move {
            let mut session = repo.begin().await?;
            let deleted = apply_delete(&mut session, user, execution_id).await?;
            session.commit().await?;
            Ok::<_, JournalError>(deleted)
        })
        .await?;

        info!(
            user = %user,
            execution_id = %execution_id,
            outcome = ?deleted.outcome,
            "execution deleted"
        );
        Ok(deleted)
    }

    /// Every execution of the user, newest first.
    pub async fn list_executions(&self, user: &UserId) -> Result<Vec<Execution>, JournalError> {
        Ok(self.repo.executions_for_user(user).await?)
    }

    // =========================================================================
    // Trades
    // =========================================================================

    pub async fn list_trades(&self, user: &UserId) -> Result<Vec<Trade>, JournalError> {
        Ok(self.repo.list_trades(user).await?)
    }

    /// Trades opened in the filter's date range, each with its rollup.
    pub async fn trades_with_summary(
        &self,
        user: &UserId,
        filter: &TradeFilter,
    ) -> Result<Vec<TradeWithSummary>, JournalError> {
        if filter.start_date > filter.end_date {
            return Err(JournalError::Validation(
                "startDate must not be after endDate".to_string(),
            ));
        }

        let trades = self
            .repo
            .trades_opened_between(user, filter.start_date, filter.end_date)
            .await?;
        let executions = self
            .repo
            .executions_for_trades_opened_between(user, filter.start_date, filter.end_date)
            .await?;
        let tag_links = if filter.tag_ids.is_empty() {
            HashMap::new()
        } else {
            self.repo.tag_links_for_user(user).await?
        };

        let mut by_trade: HashMap<TradeId, Vec<Execution>> = HashMap::new();
        for execution in executions {
            by_trade
                .entry(execution.trade_id.clone())
                .or_default()
                .push(execution);
        }

        Ok(trades
            .into_iter()
            .filter(|trade| {
                matches_tags(
                    tag_links.get(&trade.id),
                    &filter.tag_ids,
                    filter.only_with_all_tags,
                )
            })
            .map(|trade| {
                let summary = by_trade
                    .get(&trade.id)
                    .map(|linked| summarize(linked))
                    .unwrap_or_default();
                TradeWithSummary { trade, summary }
            })
            .collect())
    }

    pub async fn trade_detail(
        &self,
        user: &UserId,
        trade_id: &TradeId,
    ) -> Result<TradeDetail, JournalError> {
        let trade = self.owned_trade(user, trade_id).await?;
        let mut executions = self.repo.executions_for_trade(trade_id).await?;
        sort_for_processing(&mut executions);
        let summary = summarize(&executions);
        let tags = self.repo.tags_for_trade(trade_id).await?;
        let comments = self.repo.comments_for_trade(trade_id).await?;

        Ok(TradeDetail {
            trade,
            executions,
            summary,
            tags,
            comments,
        })
    }

    /// Replace a trade's notes; `None` clears them.
    pub async fn update_trade_notes(
        &self,
        user: &UserId,
        trade_id: &TradeId,
        notes: Option<String>,
    ) -> Result<Trade, JournalError> {
        if let Some(text) = &notes {
            validate_note("notes", text)?;
        }

        let repo = &self.repo;
        let notes = &notes;
        retry_conflicts("update_trade_notes", self.conflict_retries, || async move {
            let mut session = repo.begin().await?;
            let mut trade = owned_trade_in(&mut session, user, trade_id).await?;
            trade.notes = notes.clone();
            save_trade(&mut session, &mut trade).await?;
            session.commit().await?;
            Ok::<_, JournalError>(trade)
        })
        .await
    }

    /// Delete a trade with its executions, tag links, comments and images.
    pub async fn delete_trade(&self, user: &UserId, trade_id: &TradeId) -> Result<(), JournalError> {
        let repo = &self.repo;
        retry_conflicts("delete_trade", self.conflict_retries, || async move {
            let mut session = repo.begin().await?;
            owned_trade_in(&mut session, user, trade_id).await?;
            session.delete_trade(trade_id).await?;
            session.commit().await?;
            Ok::<_, JournalError>(())
        })
        .await?;

        info!(user = %user, trade_id = %trade_id, "trade deleted");
        Ok(())
    }

    // =========================================================================
    // Tags
    // =========================================================================

    pub async fn create_tag(&self, user: &UserId, tag_name: &str) -> Result<Tag, JournalError> {
        let tag_name = validate_tag_name(tag_name)?;

        let mut session = self.repo.begin().await?;
        require_user(&mut session, user).await?;
        if session.tag_name_taken(user, tag_name).await? {
            return Err(JournalError::Validation(format!(
                "tag '{}' already exists",
                tag_name
            )));
        }
        let tag = Tag {
            id: TagId::generate(),
            user_id: user.clone(),
            tag_name: tag_name.to_string(),
        };
        session.insert_tag(&tag).await?;
        session.commit().await?;
        Ok(tag)
    }

    pub async fn list_tags(&self, user: &UserId) -> Result<Vec<Tag>, JournalError> {
        Ok(self.repo.list_tags(user).await?)
    }

    /// Rename one of the user's tags. Names stay unique per user.
    pub async fn rename_tag(
        &self,
        user: &UserId,
        tag_id: &TagId,
        tag_name: &str,
    ) -> Result<Tag, JournalError> {
        let tag_name = validate_tag_name(tag_name)?;

        let mut session = self.repo.begin().await?;
        let mut tag = session
            .find_tag(tag_id)
            .await?
            .ok_or(JournalError::NotFound("tag"))?;
        if &tag.user_id != user {
            return Err(JournalError::Forbidden("tag belongs to another user".to_string()));
        }
        if tag.tag_name == tag_name {
            return Ok(tag);
        }
        if session.tag_name_taken(user, tag_name).await? {
            return Err(JournalError::Validation(format!(
                "tag '{}' already exists",
                tag_name
            )));
        }
        session.rename_tag(tag_id, tag_name).await?;
        session.commit().await?;

        tag.tag_name = tag_name.to_string();
        Ok(tag)
    }

    pub async fn delete_tag(&self, user: &UserId, tag_id: &TagId) -> Result<(), JournalError> {
        let mut session = self.repo.begin().await?;
        let tag = session
            .find_tag(tag_id)
            .await?
            .ok_or(JournalError::NotFound("tag"))?;
        if &tag.user_id != user {
            return Err(JournalError::Forbidden("tag belongs to another user".to_string()));
        }
        session.delete_tag(tag_id).await?;
        session.commit().await?;
        Ok(())
    }

    pub async fn trade_tags(&self, user: &UserId, trade_id: &TradeId) -> Result<Vec<Tag>, JournalError> {
        self.owned_trade(user, trade_id).await?;
        Ok(self.repo.tags_for_trade(trade_id).await?)
    }

    /// Attach every tag or none. A tag already on the trade rejects the set.
    pub async fn attach_tags(
        &self,
        user: &UserId,
        trade_id: &TradeId,
        tag_ids: &[TagId],
    ) -> Result<Vec<Tag>, JournalError> {
        if tag_ids.is_empty() {
            return Err(JournalError::Validation("tagIds must not be empty".to_string()));
        }

        let mut session = self.repo.begin().await?;
        owned_trade_in(&mut session, user, trade_id).await?;
        for tag_id in tag_ids {
            let tag = session
                .find_tag(tag_id)
                .await?
                .ok_or(JournalError::NotFound("tag"))?;
            if &tag.user_id != user {
                return Err(JournalError::Forbidden("tag belongs to another user".to_string()));
            }
            if session.trade_has_tag(trade_id, tag_id).await? {
                return Err(JournalError::Validation(format!(
                    "tag '{}' is already attached",
                    tag.tag_name
                )));
            }
            session.attach_tag(trade_id, tag_id).await?;
        }
        session.commit().await?;

        Ok(self.repo.tags_for_trade(trade_id).await?)
    }

    /// Detach every tag or none. A tag not on the trade rejects the set.
    pub async fn detach_tags(
        &self,
        user: &UserId,
        trade_id: &TradeId,
        tag_ids: &[TagId],
    ) -> Result<Vec<Tag>, JournalError> {
        if tag_ids.is_empty() {
            return Err(JournalError::Validation("tagIds must not be empty".to_string()));
        }

        let mut session = self.repo.begin().await?;
        owned_trade_in(&mut session, user, trade_id).await?;
        for tag_id in tag_ids {
            if !session.detach_tag(trade_id, tag_id).await? {
                return Err(JournalError::Validation(format!(
                    "tag {} is not attached",
                    tag_id
                )));
            }
        }
        session.commit().await?;

        Ok(self.repo.tags_for_trade(trade_id).await?)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    pub async fn add_comment(
        &self,
        user: &UserId,
        trade_id: &TradeId,
        body: &str,
    ) -> Result<Comment, JournalError> {
        let body = validate_comment(body)?;

        let mut session = self.repo.begin().await?;
        owned_trade_in(&mut session, user, trade_id).await?;
        let comment = Comment {
            id: CommentId::generate(),
            trade_id: trade_id.clone(),
            user_id: user.clone(),
            body: body.to_string(),
            created_at_ms: chrono::Utc::now().timestamp_millis(),
        };
        session.insert_comment(&comment).await?;
        session.commit().await?;
        Ok(comment)
    }

    pub async fn list_comments(
        &self,
        user: &UserId,
        trade_id: &TradeId,
    ) -> Result<Vec<Comment>, JournalError> {
        self.owned_trade(user, trade_id).await?;
        Ok(self.repo.comments_for_trade(trade_id).await?)
    }

    /// Replace a comment's body. Only its author may edit it.
    pub async fn edit_comment(
        &self,
        user: &UserId,
        comment_id: &CommentId,
        body: &str,
    ) -> Result<Comment, JournalError> {
        let body = validate_comment(body)?;

        let mut session = self.repo.begin().await?;
        let mut comment = session
            .find_comment(comment_id)
            .await?
            .ok_or(JournalError::NotFound("comment"))?;
        if &comment.user_id != user {
            return Err(JournalError::Forbidden(
                "comment belongs to another user".to_string(),
            ));
        }
        session.update_comment_body(comment_id, body).await?;
        session.commit().await?;

        comment.body = body.to_string();
        Ok(comment)
    }

    pub async fn delete_comment(&self, user: &UserId, comment_id: &CommentId) -> Result<(), JournalError> {
        let mut session = self.repo.begin().await?;
        let comment = session
            .find_comment(comment_id)
            .await?
            .ok_or(JournalError::NotFound("comment"))?;
        if &comment.user_id != user {
            return Err(JournalError::Forbidden(
                "comment belongs to another user".to_string(),
            ));
        }
        session.delete_comment(comment_id).await?;
        session.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn tags(ids: &[&TagId]) -> HashSet<TagId> {
        ids.iter().map(|id| (*id).clone()).collect()
    }

    #[test]
    fn test_matches_tags_any_and_all() {
        let a = TagId::generate();
        let b = TagId::generate();
        let c = TagId::generate();
        let attached = tags(&[&a, &b]);

        assert!(matches_tags(None, &[], false));
        assert!(!matches_tags(None, &[a.clone()], false));
        assert!(matches_tags(Some(&attached), &[a.clone(), c.clone()], false));
        assert!(!matches_tags(Some(&attached), &[a.clone(), c.clone()], true));
        assert!(matches_tags(Some(&attached), &[a, b], true));
    }

    #[tokio::test]
    async fn test_conflict_retried_up_to_limit() {
        let calls = AtomicU32::new(0);
        let result = retry_conflicts("test", 1, || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    Err(JournalError::Conflict)
                } else {
                    Ok(call)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_conflict_surfaces_after_retries_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_conflicts("test", 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(JournalError::Conflict) }
        })
        .await;

        assert!(matches!(result, Err(JournalError::Conflict)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_conflicts("test", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(JournalError::NotFound("trade")) }
        })
        .await;

        assert!(matches!(result, Err(JournalError::NotFound("trade"))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
