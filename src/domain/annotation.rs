//! User-owned annotations on trades: tags, comments, and the user record.

use crate::domain::{CommentId, TagId, TradeId, UserId};
use serde::Serialize;

/// Maximum length of trade notes and comment bodies.
pub const MAX_NOTE_CHARS: usize = 2500;

/// Maximum length of a tag name.
pub const MAX_TAG_CHARS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub created_at_ms: i64,
}

/// A user-defined label; names are unique per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: TagId,
    pub user_id: UserId,
    pub tag_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub trade_id: TradeId,
    pub user_id: UserId,
    pub body: String,
    pub created_at_ms: i64,
}
