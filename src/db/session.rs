//! A single database transaction handed to each mutating journal operation.
//!
//! Dropping a `Session` without calling [`Session::commit`] rolls back every
//! write made through it.

use crate::domain::{
    Comment, CommentId, Execution, ExecutionId, Symbol, Tag, TagId, Trade, TradeId, User, UserId,
};
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::Transaction;

use super::repo::{annotations, executions, trades};

pub struct Session {
    tx: Transaction<'static, Sqlite>,
}

impl Session {
    /// # Errors
    /// Returns an error if no connection is available or `BEGIN` fails.
    pub async fn begin(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        Ok(Session {
            tx: pool.begin().await?,
        })
    }

    /// Make every write of this session durable.
    ///
    /// # Errors
    /// Returns an error if `COMMIT` fails; the writes are then rolled back.
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    // =========================================================================
    // Trades
    // =========================================================================

    pub async fn find_trade(&mut self, id: &TradeId) -> Result<Option<Trade>, sqlx::Error> {
        trades::fetch_trade(&mut *self.tx, id).await
    }

    pub async fn find_open_trade(
        &mut self,
        user: &UserId,
        symbol: &Symbol,
    ) -> Result<Option<Trade>, sqlx::Error> {
        trades::fetch_open_trade(&mut *self.tx, user, symbol).await
    }

    /// # Errors
    /// Returns an error if the insert fails, including a unique violation when
    /// an open trade already exists for the same user and symbol.
    pub async fn insert_trade(&mut self, trade: &Trade) -> Result<(), sqlx::Error> {
        trades::insert_trade(&mut *self.tx, trade).await
    }

    /// Save a trade under optimistic concurrency.
    ///
    /// On success the in-memory version is bumped to match the row. Returns
    /// false when another writer got there first.
    ///
    /// # Errors
    /// Returns an error if the statement fails, including a unique violation
    /// when the trade would become a second open trade for its symbol.
    pub async fn update_trade(&mut self, trade: &mut Trade) -> Result<bool, sqlx::Error> {
        let updated = trades::update_trade(&mut *self.tx, trade).await?;
        if updated {
            trade.version += 1;
        }
        Ok(updated)
    }

    /// Remove a trade; its executions, tag links and comments cascade.
    ///
    /// # Errors
    /// Returns an error if the statement fails.
    pub async fn delete_trade(&mut self, id: &TradeId) -> Result<bool, sqlx::Error> {
        trades::delete_trade(&mut *self.tx, id).await
    }

    // =========================================================================
    // Executions
    // =========================================================================

    pub async fn find_execution(
        &mut self,
        id: &ExecutionId,
    ) -> Result<Option<Execution>, sqlx::Error> {
        executions::fetch_execution(&mut *self.tx, id).await
    }

    pub async fn executions_for_trade(
        &mut self,
        trade_id: &TradeId,
    ) -> Result<Vec<Execution>, sqlx::Error> {
        executions::fetch_executions_for_trade(&mut *self.tx, trade_id).await
    }

    /// True when the user already holds an execution with this fingerprint.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn fingerprint_exists(
        &mut self,
        user: &UserId,
        fingerprint: &str,
    ) -> Result<bool, sqlx::Error> {
        executions::fingerprint_exists(&mut *self.tx, user, fingerprint).await
    }

    /// Store an execution under its user.
    ///
    /// # Errors
    /// Returns an error if the insert fails, including a unique violation when
    /// the user already holds the same fingerprint.
    pub async fn insert_execution(
        &mut self,
        user: &UserId,
        execution: &Execution,
    ) -> Result<(), sqlx::Error> {
        executions::insert_execution(&mut *self.tx, user, execution).await
    }

    pub async fn update_execution(&mut self, execution: &Execution) -> Result<bool, sqlx::Error> {
        executions::update_execution(&mut *self.tx, execution).await
    }

    pub async fn delete_execution(&mut self, id: &ExecutionId) -> Result<bool, sqlx::Error> {
        executions::delete_execution(&mut *self.tx, id).await
    }

    // =========================================================================
    // Users, tags, comments
    // =========================================================================

    pub async fn insert_user(&mut self, user: &User) -> Result<(), sqlx::Error> {
        annotations::insert_user(&mut *self.tx, user).await
    }

    pub async fn user_exists(&mut self, id: &UserId) -> Result<bool, sqlx::Error> {
        annotations::user_exists(&mut *self.tx, id).await
    }

    pub async fn email_taken(&mut self, email: &str) -> Result<bool, sqlx::Error> {
        annotations::email_taken(&mut *self.tx, email).await
    }

    pub async fn find_tag(&mut self, id: &TagId) -> Result<Option<Tag>, sqlx::Error> {
        annotations::fetch_tag(&mut *self.tx, id).await
    }

    pub async fn tag_name_taken(
        &mut self,
        user: &UserId,
        tag_name: &str,
    ) -> Result<bool, sqlx::Error> {
        annotations::tag_name_taken(&mut *self.tx, user, tag_name).await
    }

    pub async fn insert_tag(&mut self, tag: &Tag) -> Result<(), sqlx::Error> {
        annotations::insert_tag(&mut *self.tx, tag).await
    }

    pub async fn rename_tag(&mut self, id: &TagId, tag_name: &str) -> Result<bool, sqlx::Error> {
        annotations::rename_tag(&mut *self.tx, id, tag_name).await
    }

    pub async fn delete_tag(&mut self, id: &TagId) -> Result<bool, sqlx::Error> {
        annotations::delete_tag(&mut *self.tx, id).await
    }

    pub async fn trade_has_tag(
        &mut self,
        trade_id: &TradeId,
        tag_id: &TagId,
    ) -> Result<bool, sqlx::Error> {
        annotations::trade_has_tag(&mut *self.tx, trade_id, tag_id).await
    }

    pub async fn attach_tag(&mut self, trade_id: &TradeId, tag_id: &TagId) -> Result<(), sqlx::Error> {
        annotations::attach_tag(&mut *self.tx, trade_id, tag_id).await
    }

    pub async fn detach_tag(
        &mut self,
        trade_id: &TradeId,
        tag_id: &TagId,
    ) -> Result<bool, sqlx::Error> {
        annotations::detach_tag(&mut *self.tx, trade_id, tag_id).await
    }

    pub async fn find_comment(&mut self, id: &CommentId) -> Result<Option<Comment>, sqlx::Error> {
        annotations::fetch_comment(&mut *self.tx, id).await
    }

    pub async fn insert_comment(&mut self, comment: &Comment) -> Result<(), sqlx::Error> {
        annotations::insert_comment(&mut *self.tx, comment).await
    }

    pub async fn update_comment_body(
        &mut self,
        id: &CommentId,
        body: &str,
    ) -> Result<bool, sqlx::Error> {
        annotations::update_comment_body(&mut *self.tx, id, body).await
    }

    pub async fn delete_comment(&mut self, id: &CommentId) -> Result<bool, sqlx::Error> {
        annotations::delete_comment(&mut *self.tx, id).await
    }
}
