//! Database integration tests.
//!
//! These run the real migrations against an in-memory SQLite database and
//! exercise the repositories end to end.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use peerlink_db::entities::group_member::MemberRole;
use peerlink_db::entities::{group, group_member, group_message, message};
use peerlink_db::repositories::{GroupMessageRepository, GroupRepository, MessageRepository};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, Set};

async fn memory_db() -> Arc<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);

    let db = Database::connect(options).await.expect("connect");
    peerlink_db::migrate(&db).await.expect("migrate");
    Arc::new(db)
}

fn direct_message(id: &str, from_id: &str, to_id: &str, offset_secs: i64) -> message::ActiveModel {
    message::ActiveModel {
        id: Set(id.to_string()),
        from_id: Set(from_id.to_string()),
        to_id: Set(to_id.to_string()),
        content: Set(format!("body of {id}")),
        timestamp: Set((Utc::now() + Duration::seconds(offset_secs)).into()),
        delivered: Set(false),
        read_status: Set(false),
        status: Set("sent".to_string()),
        reply_to: Set(None),
    }
}

fn member_row(group_id: &str, user_id: &str, role: MemberRole) -> group_member::ActiveModel {
    group_member::ActiveModel {
        group_id: Set(group_id.to_string()),
        user_id: Set(user_id.to_string()),
        role: Set(role),
        joined_at: Set(Utc::now().into()),
        is_muted: Set(false),
        is_banned: Set(false),
    }
}

fn group_row(id: &str, created_by: &str) -> group::ActiveModel {
    group::ActiveModel {
        id: Set(id.to_string()),
        name: Set("Test Group".to_string()),
        description: Set(None),
        created_by: Set(created_by.to_string()),
        created_at: Set(Utc::now().into()),
        avatar_url: Set(None),
    }
}

fn group_message_row(id: &str, group_id: &str, from_id: &str, offset_secs: i64) -> group_message::ActiveModel {
    group_message::ActiveModel {
        id: Set(id.to_string()),
        group_id: Set(group_id.to_string()),
        from_id: Set(from_id.to_string()),
        content: Set(format!("group body of {id}")),
        timestamp: Set((Utc::now() + Duration::seconds(offset_secs)).into()),
        delivered: Set(true),
        read_by: Set(format!("[\"{from_id}\"]")),
        status: Set("sent".to_string()),
        reply_to: Set(None),
    }
}

#[tokio::test]
async fn message_insert_is_idempotent() {
    let db = memory_db().await;
    let repo = MessageRepository::new(db);

    repo.insert(direct_message("m1", "AAAA", "BBBB", 0))
        .await
        .unwrap();

    // Same id with different content must be a no-op.
    let mut dup = direct_message("m1", "AAAA", "BBBB", 0);
    dup.content = Set("rewritten".to_string());
    repo.insert(dup).await.unwrap();

    let stored = repo.find_by_id("m1").await.unwrap().unwrap();
    assert_eq!(stored.content, "body of m1");

    let all = repo.find_by_participant("AAAA").await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn flags_update_only_the_target_row() {
    let db = memory_db().await;
    let repo = MessageRepository::new(db);

    repo.insert(direct_message("m1", "AAAA", "BBBB", 0))
        .await
        .unwrap();
    repo.insert(direct_message("m2", "AAAA", "BBBB", 1))
        .await
        .unwrap();

    repo.set_flags("m1", true, true).await.unwrap();

    let m1 = repo.find_by_id("m1").await.unwrap().unwrap();
    assert!(m1.delivered);
    assert!(m1.read_status);

    let m2 = repo.find_by_id("m2").await.unwrap().unwrap();
    assert!(!m2.delivered);
    assert!(!m2.read_status);
}

#[tokio::test]
async fn participant_history_is_chronological() {
    let db = memory_db().await;
    let repo = MessageRepository::new(db);

    repo.insert(direct_message("m3", "BBBB", "AAAA", 30))
        .await
        .unwrap();
    repo.insert(direct_message("m1", "AAAA", "BBBB", 10))
        .await
        .unwrap();
    repo.insert(direct_message("m2", "AAAA", "CCCC", 20))
        .await
        .unwrap();

    let history = repo.find_by_participant("AAAA").await.unwrap();
    let ids: Vec<&str> = history.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3"]);

    let mut previous = None;
    for record in &history {
        if let Some(prev) = previous {
            assert!(record.timestamp >= prev);
        }
        previous = Some(record.timestamp);
    }
}

#[tokio::test]
async fn mark_delivered_flips_the_batch() {
    let db = memory_db().await;
    let repo = MessageRepository::new(db);

    repo.insert(direct_message("m1", "AAAA", "BBBB", 0))
        .await
        .unwrap();
    repo.insert(direct_message("m2", "AAAA", "BBBB", 1))
        .await
        .unwrap();
    repo.insert(direct_message("m3", "AAAA", "BBBB", 2))
        .await
        .unwrap();

    repo.mark_delivered(&["m1".to_string(), "m2".to_string()])
        .await
        .unwrap();

    assert!(repo.find_by_id("m1").await.unwrap().unwrap().delivered);
    assert!(repo.find_by_id("m2").await.unwrap().unwrap().delivered);
    assert!(!repo.find_by_id("m3").await.unwrap().unwrap().delivered);
}

#[tokio::test]
async fn purge_removes_both_directions_and_nothing_else() {
    let db = memory_db().await;
    let repo = MessageRepository::new(db);

    repo.insert(direct_message("m1", "AAAA", "BBBB", 0))
        .await
        .unwrap();
    repo.insert(direct_message("m2", "BBBB", "AAAA", 1))
        .await
        .unwrap();
    repo.insert(direct_message("m3", "AAAA", "CCCC", 2))
        .await
        .unwrap();

    repo.purge_conversation("AAAA", "BBBB").await.unwrap();

    assert!(repo.find_by_id("m1").await.unwrap().is_none());
    assert!(repo.find_by_id("m2").await.unwrap().is_none());
    assert!(repo.find_by_id("m3").await.unwrap().is_some());
}

#[tokio::test]
async fn group_creation_is_transactional_and_idempotent_on_members() {
    let db = memory_db().await;
    let repo = GroupRepository::new(db);

    let members = vec![
        member_row("GROUP_AAAAAA", "ABCD", MemberRole::Admin),
        member_row("GROUP_AAAAAA", "WXYZ", MemberRole::Member),
        // Duplicate row must not abort the transaction.
        member_row("GROUP_AAAAAA", "WXYZ", MemberRole::Member),
    ];

    let created = repo
        .create_with_members(group_row("GROUP_AAAAAA", "ABCD"), members)
        .await
        .unwrap();
    assert_eq!(created.id, "GROUP_AAAAAA");

    assert_eq!(repo.count_members("GROUP_AAAAAA").await.unwrap(), 2);
    assert_eq!(repo.count_admins("GROUP_AAAAAA").await.unwrap(), 1);

    let creator = repo.get_member("GROUP_AAAAAA", "ABCD").await.unwrap().unwrap();
    assert!(creator.role.is_admin());
}

#[tokio::test]
async fn banned_members_are_invisible_to_listing_and_fanout() {
    let db = memory_db().await;
    let repo = GroupRepository::new(db);

    repo.create_with_members(
        group_row("GROUP_BBBBBB", "ABCD"),
        vec![
            member_row("GROUP_BBBBBB", "ABCD", MemberRole::Admin),
            member_row("GROUP_BBBBBB", "WXYZ", MemberRole::Member),
        ],
    )
    .await
    .unwrap();

    repo.set_banned("GROUP_BBBBBB", "WXYZ", true).await.unwrap();

    let members = repo.list_members("GROUP_BBBBBB").await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, "ABCD");

    let ids = repo.member_ids("GROUP_BBBBBB").await.unwrap();
    assert_eq!(ids, vec!["ABCD".to_string()]);

    assert!(repo.group_ids_for_user("WXYZ").await.unwrap().is_empty());

    repo.set_banned("GROUP_BBBBBB", "WXYZ", false).await.unwrap();
    assert_eq!(repo.list_members("GROUP_BBBBBB").await.unwrap().len(), 2);
}

#[tokio::test]
async fn role_changes_persist() {
    let db = memory_db().await;
    let repo = GroupRepository::new(db);

    repo.create_with_members(
        group_row("GROUP_CCCCCC", "ABCD"),
        vec![
            member_row("GROUP_CCCCCC", "ABCD", MemberRole::Admin),
            member_row("GROUP_CCCCCC", "WXYZ", MemberRole::Member),
        ],
    )
    .await
    .unwrap();

    repo.set_role("GROUP_CCCCCC", "WXYZ", MemberRole::Admin)
        .await
        .unwrap();
    assert_eq!(repo.count_admins("GROUP_CCCCCC").await.unwrap(), 2);

    // A banned admin is not an effective admin.
    repo.set_banned("GROUP_CCCCCC", "WXYZ", true).await.unwrap();
    assert_eq!(repo.count_admins("GROUP_CCCCCC").await.unwrap(), 1);
    repo.set_banned("GROUP_CCCCCC", "WXYZ", false).await.unwrap();
    assert_eq!(repo.count_admins("GROUP_CCCCCC").await.unwrap(), 2);

    assert!(repo.remove_member("GROUP_CCCCCC", "WXYZ").await.unwrap());
    assert_eq!(repo.count_admins("GROUP_CCCCCC").await.unwrap(), 1);
    assert!(!repo.remove_member("GROUP_CCCCCC", "WXYZ").await.unwrap());
}

#[tokio::test]
async fn latest_group_messages_respect_limit_and_order() {
    let db = memory_db().await;
    let groups = GroupRepository::new(Arc::clone(&db));
    let messages = GroupMessageRepository::new(db);

    groups
        .create_with_members(
            group_row("GROUP_DDDDDD", "ABCD"),
            vec![member_row("GROUP_DDDDDD", "ABCD", MemberRole::Admin)],
        )
        .await
        .unwrap();

    for i in 0..5 {
        messages
            .insert(group_message_row(
                &format!("g{i}"),
                "GROUP_DDDDDD",
                "ABCD",
                i,
            ))
            .await
            .unwrap();
    }

    let latest = messages.latest_for_group("GROUP_DDDDDD", 3).await.unwrap();
    let ids: Vec<&str> = latest.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["g4", "g3", "g2"]);
}

#[tokio::test]
async fn group_message_insert_is_idempotent() {
    let db = memory_db().await;
    let groups = GroupRepository::new(Arc::clone(&db));
    let messages = GroupMessageRepository::new(db);

    groups
        .create_with_members(
            group_row("GROUP_EEEEEE", "ABCD"),
            vec![member_row("GROUP_EEEEEE", "ABCD", MemberRole::Admin)],
        )
        .await
        .unwrap();

    messages
        .insert(group_message_row("g1", "GROUP_EEEEEE", "ABCD", 0))
        .await
        .unwrap();

    // Same id with different content must be a no-op.
    let mut dup = group_message_row("g1", "GROUP_EEEEEE", "ABCD", 1);
    dup.content = Set("rewritten".to_string());
    messages.insert(dup).await.unwrap();

    let stored = messages.latest_for_group("GROUP_EEEEEE", 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "group body of g1");
}
