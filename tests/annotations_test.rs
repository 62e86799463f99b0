//! Summaries, tag filters, notes and comments.

mod common;

use chrono::NaiveDate;
use common::{csv, setup, TestJournal, BUY_AAPL, BUY_MSFT, SELL_AAPL};
use tradejournal::domain::TagId;
use tradejournal::{Decimal, JournalError, Trade, TradeFilter, UserId};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn august(tag_ids: Vec<TagId>, all: bool) -> TradeFilter {
    TradeFilter {
        start_date: NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2023, 8, 31).unwrap(),
        tag_ids,
        only_with_all_tags: all,
    }
}

/// Returns the user with its AAPL and MSFT trades.
async fn two_trades(t: &TestJournal) -> (UserId, Trade, Trade) {
    let user = t.user("trader@example.com").await;
    t.journal
        .import_csv(&user, "a.csv", &csv(&[BUY_AAPL, SELL_AAPL, BUY_MSFT]))
        .await
        .unwrap();
    let trades = t.journal.list_trades(&user).await.unwrap();
    let aapl = trades.iter().find(|t| t.symbol.as_str() == "AAPL").cloned().unwrap();
    let msft = trades.iter().find(|t| t.symbol.as_str() == "MSFT").cloned().unwrap();
    (user, aapl, msft)
}

#[tokio::test]
async fn test_summary_rolls_up_executions_per_trade() {
    let t = setup().await;
    let (user, aapl, msft) = two_trades(&t).await;

    let rows = t
        .journal
        .trades_with_summary(&user, &august(vec![], false))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    // Ascending by open instant.
    assert_eq!(rows[0].trade.id, aapl.id);
    assert_eq!(rows[1].trade.id, msft.id);

    let summary = &rows[0].summary;
    assert_eq!(summary.total_shares_traded, 200);
    assert_eq!(summary.total_commission, d("2"));
    assert_eq!(summary.gross_profit_loss, d("590"));
    assert_eq!(summary.total_fees, d("2.04"));
    assert_eq!(rows[1].summary.total_shares_traded, 10);
}

#[tokio::test]
async fn test_summary_date_range_is_inclusive() {
    let t = setup().await;
    let (user, _aapl, msft) = two_trades(&t).await;

    let mut filter = august(vec![], false);
    filter.start_date = NaiveDate::from_ymd_opt(2023, 8, 10).unwrap();
    filter.end_date = NaiveDate::from_ymd_opt(2023, 8, 10).unwrap();
    let rows = t.journal.trades_with_summary(&user, &filter).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].trade.id, msft.id);

    filter.start_date = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap();
    let err = t.journal.trades_with_summary(&user, &filter).await.unwrap_err();
    assert!(matches!(err, JournalError::Validation(_)));
}

#[tokio::test]
async fn test_tag_filter_any_and_all() {
    let t = setup().await;
    let (user, aapl, msft) = two_trades(&t).await;
    let momentum = t.journal.create_tag(&user, "momentum").await.unwrap();
    let gap = t.journal.create_tag(&user, "gap-up").await.unwrap();

    t.journal
        .attach_tags(&user, &aapl.id, &[momentum.id.clone(), gap.id.clone()])
        .await
        .unwrap();
    t.journal
        .attach_tags(&user, &msft.id, &[gap.id.clone()])
        .await
        .unwrap();

    let both = vec![momentum.id.clone(), gap.id.clone()];
    let any = t
        .journal
        .trades_with_summary(&user, &august(both.clone(), false))
        .await
        .unwrap();
    assert_eq!(any.len(), 2);

    let all = t
        .journal
        .trades_with_summary(&user, &august(both, true))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].trade.id, aapl.id);

    let only_momentum = t
        .journal
        .trades_with_summary(&user, &august(vec![momentum.id.clone()], false))
        .await
        .unwrap();
    assert_eq!(only_momentum.len(), 1);
}

#[tokio::test]
async fn test_attach_is_all_or_nothing() {
    let t = setup().await;
    let (user, aapl, _msft) = two_trades(&t).await;
    let a = t.journal.create_tag(&user, "a").await.unwrap();
    let b = t.journal.create_tag(&user, "b").await.unwrap();
    t.journal
        .attach_tags(&user, &aapl.id, &[a.id.clone()])
        .await
        .unwrap();

    let err = t
        .journal
        .attach_tags(&user, &aapl.id, &[b.id.clone(), a.id.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::Validation(_)));

    let tags = t.journal.trade_tags(&user, &aapl.id).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].id, a.id);

    let err = t
        .journal
        .detach_tags(&user, &aapl.id, &[a.id.clone(), b.id.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::Validation(_)));
    assert_eq!(t.journal.trade_tags(&user, &aapl.id).await.unwrap().len(), 1);

    let remaining = t
        .journal
        .detach_tags(&user, &aapl.id, &[a.id.clone()])
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_tag_names_are_unique_per_user() {
    let t = setup().await;
    let alice = t.user("alice@example.com").await;
    let bob = t.user("bob@example.com").await;

    t.journal.create_tag(&alice, "scalp").await.unwrap();
    let err = t.journal.create_tag(&alice, " scalp ").await.unwrap_err();
    assert!(matches!(err, JournalError::Validation(_)));
    t.journal.create_tag(&bob, "scalp").await.unwrap();

    let err = t.journal.create_tag(&alice, "   ").await.unwrap_err();
    assert!(matches!(err, JournalError::Validation(_)));
}

#[tokio::test]
async fn test_foreign_tags_and_trades_are_forbidden() {
    let t = setup().await;
    let (owner, aapl, _msft) = two_trades(&t).await;
    let other = t.user("other@example.com").await;
    let foreign_tag = t.journal.create_tag(&other, "theirs").await.unwrap();

    let err = t
        .journal
        .attach_tags(&owner, &aapl.id, &[foreign_tag.id.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::Forbidden(_)));

    let err = t.journal.trade_detail(&other, &aapl.id).await.unwrap_err();
    assert!(matches!(err, JournalError::Forbidden(_)));

    let err = t.journal.delete_tag(&owner, &foreign_tag.id).await.unwrap_err();
    assert!(matches!(err, JournalError::Forbidden(_)));
}

#[tokio::test]
async fn test_deleting_tag_unlinks_it() {
    let t = setup().await;
    let (user, aapl, _msft) = two_trades(&t).await;
    let tag = t.journal.create_tag(&user, "fade").await.unwrap();
    t.journal
        .attach_tags(&user, &aapl.id, &[tag.id.clone()])
        .await
        .unwrap();

    t.journal.delete_tag(&user, &tag.id).await.unwrap();

    assert!(t.journal.trade_tags(&user, &aapl.id).await.unwrap().is_empty());
    assert!(t.journal.list_tags(&user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_trade_detail_collects_everything() {
    let t = setup().await;
    let (user, aapl, _msft) = two_trades(&t).await;
    let tag = t.journal.create_tag(&user, "momentum").await.unwrap();
    t.journal
        .attach_tags(&user, &aapl.id, &[tag.id.clone()])
        .await
        .unwrap();
    t.journal
        .add_comment(&user, &aapl.id, "  sized too small  ")
        .await
        .unwrap();

    let detail = t.journal.trade_detail(&user, &aapl.id).await.unwrap();

    assert_eq!(detail.executions.len(), 2);
    assert!(detail.executions[0].fill.trade_date < detail.executions[1].fill.trade_date);
    assert_eq!(detail.summary.total_shares_traded, 200);
    assert_eq!(detail.tags.len(), 1);
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.comments[0].body, "sized too small");
}

#[tokio::test]
async fn test_trade_notes_update_and_clear() {
    let t = setup().await;
    let (user, aapl, _msft) = two_trades(&t).await;

    let noted = t
        .journal
        .update_trade_notes(&user, &aapl.id, Some("held through lunch".to_string()))
        .await
        .unwrap();
    assert_eq!(noted.notes.as_deref(), Some("held through lunch"));
    assert_eq!(noted.version, aapl.version + 1);

    let cleared = t
        .journal
        .update_trade_notes(&user, &aapl.id, None)
        .await
        .unwrap();
    assert_eq!(cleared.notes, None);

    let too_long = "x".repeat(tradejournal::domain::annotation::MAX_NOTE_CHARS + 1);
    let err = t
        .journal
        .update_trade_notes(&user, &aapl.id, Some(too_long))
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::Validation(_)));
}

#[tokio::test]
async fn test_comments_belong_to_their_author() {
    let t = setup().await;
    let (user, aapl, _msft) = two_trades(&t).await;
    let other = t.user("other@example.com").await;
    let comment = t
        .journal
        .add_comment(&user, &aapl.id, "review entry")
        .await
        .unwrap();

    let err = t.journal.delete_comment(&other, &comment.id).await.unwrap_err();
    assert!(matches!(err, JournalError::Forbidden(_)));

    let err = t.journal.add_comment(&user, &aapl.id, "  ").await.unwrap_err();
    assert!(matches!(err, JournalError::Validation(_)));

    t.journal.delete_comment(&user, &comment.id).await.unwrap();
    assert!(t.journal.list_comments(&user, &aapl.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deleting_trade_cascades() {
    let t = setup().await;
    let (user, aapl, msft) = two_trades(&t).await;
    t.journal
        .add_comment(&user, &aapl.id, "gone soon")
        .await
        .unwrap();

    t.journal.delete_trade(&user, &aapl.id).await.unwrap();

    let trades = t.journal.list_trades(&user).await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].id, msft.id);
    assert_eq!(t.journal.list_executions(&user).await.unwrap().len(), 1);

    let err = t.journal.delete_trade(&user, &aapl.id).await.unwrap_err();
    assert!(matches!(err, JournalError::NotFound("trade")));
}

#[tokio::test]
async fn test_user_emails_are_unique() {
    let t = setup().await;
    t.user("Trader@Example.com").await;

    let err = t.journal.create_user("trader@example.com").await.unwrap_err();
    assert!(matches!(err, JournalError::Validation(_)));

    let err = t.journal.create_user("not-an-email").await.unwrap_err();
    assert!(matches!(err, JournalError::Validation(_)));
}

#[tokio::test]
async fn test_rename_tag() {
    let t = setup().await;
    let user = t.user("trader@example.com").await;
    let other = t.user("other@example.com").await;
    let scalp = t.journal.create_tag(&user, "scalp").await.unwrap();
    t.journal.create_tag(&user, "swing").await.unwrap();

    let renamed = t
        .journal
        .rename_tag(&user, &scalp.id, "  quick scalp ")
        .await
        .unwrap();
    assert_eq!(renamed.id, scalp.id);
    assert_eq!(renamed.tag_name, "quick scalp");

    let unchanged = t
        .journal
        .rename_tag(&user, &scalp.id, "quick scalp")
        .await
        .unwrap();
    assert_eq!(unchanged.tag_name, "quick scalp");

    let err = t.journal.rename_tag(&user, &scalp.id, "swing").await.unwrap_err();
    assert!(matches!(err, JournalError::Validation(_)));

    let err = t.journal.rename_tag(&user, &scalp.id, " ").await.unwrap_err();
    assert!(matches!(err, JournalError::Validation(_)));

    let err = t.journal.rename_tag(&other, &scalp.id, "mine").await.unwrap_err();
    assert!(matches!(err, JournalError::Forbidden(_)));

    let err = t
        .journal
        .rename_tag(&user, &TagId::generate(), "ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::NotFound("tag")));

    let names: Vec<String> = t
        .journal
        .list_tags(&user)
        .await
        .unwrap()
        .into_iter()
        .map(|tag| tag.tag_name)
        .collect();
    assert_eq!(names, vec!["quick scalp".to_string(), "swing".to_string()]);
}

#[tokio::test]
async fn test_edit_comment() {
    let t = setup().await;
    let (user, aapl, _msft) = two_trades(&t).await;
    let other = t.user("other@example.com").await;
    let comment = t
        .journal
        .add_comment(&user, &aapl.id, "entered late")
        .await
        .unwrap();

    let edited = t
        .journal
        .edit_comment(&user, &comment.id, " entered late, chased ")
        .await
        .unwrap();
    assert_eq!(edited.id, comment.id);
    assert_eq!(edited.body, "entered late, chased");
    assert_eq!(edited.created_at_ms, comment.created_at_ms);

    let err = t.journal.edit_comment(&user, &comment.id, "").await.unwrap_err();
    assert!(matches!(err, JournalError::Validation(_)));

    let err = t
        .journal
        .edit_comment(&other, &comment.id, "not yours")
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::Forbidden(_)));

    let comments = t.journal.list_comments(&user, &aapl.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].body, "entered late, chased");
}
