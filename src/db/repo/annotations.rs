//! Users, tags, trade-tag links and comments.

use crate::domain::{Comment, CommentId, Tag, TagId, TradeId, User, UserId};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};

use super::Repository;

fn tag_from_row(row: &SqliteRow) -> Result<Tag, sqlx::Error> {
    Ok(Tag {
        id: TagId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        tag_name: row.try_get("tag_name")?,
    })
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment, sqlx::Error> {
    Ok(Comment {
        id: CommentId::new(row.try_get("id")?),
        trade_id: TradeId::new(row.try_get("trade_id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        body: row.try_get("body")?,
        created_at_ms: row.try_get("created_at")?,
    })
}

pub(crate) async fn insert_user<'e, E>(executor: E, user: &User) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT INTO users (id, email, created_at) VALUES (?, ?, ?)")
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(user.created_at_ms)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn user_exists<'e, E>(executor: E, id: &UserId) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?) AS found")
        .bind(id.as_str())
        .fetch_one(executor)
        .await?;
    Ok(row.try_get::<i64, _>("found")? != 0)
}

pub(crate) async fn email_taken<'e, E>(executor: E, email: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?) AS found")
        .bind(email)
        .fetch_one(executor)
        .await?;
    Ok(row.try_get::<i64, _>("found")? != 0)
}

pub(crate) async fn fetch_tag<'e, E>(executor: E, id: &TagId) -> Result<Option<Tag>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("SELECT id, user_id, tag_name FROM tags WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(executor)
        .await?
        .map(|row| tag_from_row(&row))
        .transpose()
}

pub(crate) async fn tag_name_taken<'e, E>(
    executor: E,
    user: &UserId,
    tag_name: &str,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT EXISTS(SELECT 1 FROM tags WHERE user_id = ? AND tag_name = ?) AS found",
    )
    .bind(user.as_str())
    .bind(tag_name)
    .fetch_one(executor)
    .await?;
    Ok(row.try_get::<i64, _>("found")? != 0)
}

pub(crate) async fn insert_tag<'e, E>(executor: E, tag: &Tag) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT INTO tags (id, user_id, tag_name) VALUES (?, ?, ?)")
        .bind(tag.id.as_str())
        .bind(tag.user_id.as_str())
        .bind(&tag.tag_name)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn rename_tag<'e, E>(
    executor: E,
    id: &TagId,
    tag_name: &str,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE tags SET tag_name = ? WHERE id = ?")
        .bind(tag_name)
        .bind(id.as_str())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn delete_tag<'e, E>(executor: E, id: &TagId) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id.as_str())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn trade_has_tag<'e, E>(
    executor: E,
    trade_id: &TradeId,
    tag_id: &TagId,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT EXISTS(SELECT 1 FROM trade_tags WHERE trade_id = ? AND tag_id = ?) AS found",
    )
    .bind(trade_id.as_str())
    .bind(tag_id.as_str())
    .fetch_one(executor)
    .await?;
    Ok(row.try_get::<i64, _>("found")? != 0)
}

pub(crate) async fn attach_tag<'e, E>(
    executor: E,
    trade_id: &TradeId,
    tag_id: &TagId,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT INTO trade_tags (trade_id, tag_id) VALUES (?, ?)")
        .bind(trade_id.as_str())
        .bind(tag_id.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn detach_tag<'e, E>(
    executor: E,
    trade_id: &TradeId,
    tag_id: &TagId,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM trade_tags WHERE trade_id = ? AND tag_id = ?")
        .bind(trade_id.as_str())
        .bind(tag_id.as_str())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn fetch_comment<'e, E>(
    executor: E,
    id: &CommentId,
) -> Result<Option<Comment>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("SELECT id, trade_id, user_id, body, created_at FROM comments WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(executor)
        .await?
        .map(|row| comment_from_row(&row))
        .transpose()
}

pub(crate) async fn insert_comment<'e, E>(executor: E, comment: &Comment) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO comments (id, trade_id, user_id, body, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(comment.id.as_str())
    .bind(comment.trade_id.as_str())
    .bind(comment.user_id.as_str())
    .bind(&comment.body)
    .bind(comment.created_at_ms)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn update_comment_body<'e, E>(
    executor: E,
    id: &CommentId,
    body: &str,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE comments SET body = ? WHERE id = ?")
        .bind(body)
        .bind(id.as_str())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn delete_comment<'e, E>(executor: E, id: &CommentId) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id.as_str())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

impl Repository {
    pub async fn user_exists(&self, id: &UserId) -> Result<bool, sqlx::Error> {
        user_exists(&self.pool, id).await
    }

    /// Tags owned by a user, by name.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_tags(&self, user: &UserId) -> Result<Vec<Tag>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, user_id, tag_name FROM tags WHERE user_id = ? ORDER BY tag_name ASC",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(tag_from_row).collect()
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn tags_for_trade(&self, trade_id: &TradeId) -> Result<Vec<Tag>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.user_id, t.tag_name
            FROM tags t
            JOIN trade_tags tt ON tt.tag_id = t.id
            WHERE tt.trade_id = ?
            ORDER BY t.tag_name ASC
            "#,
        )
        .bind(trade_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(tag_from_row).collect()
    }

    /// Comments on a trade, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn comments_for_trade(
        &self,
        trade_id: &TradeId,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, trade_id, user_id, body, created_at
            FROM comments
            WHERE trade_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(trade_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(comment_from_row).collect()
    }
}
