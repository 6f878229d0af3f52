//! Integration tests for live rule changes during a session.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{Harness, breakable_pair, expect_login, pair, rules, spawn_session};
use skipvote::error::SessionError;
use skipvote::session::SessionEnd;
use skipvote::votes::VoteNotification;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const QUIET: Duration = Duration::from_millis(200);

#[tokio::test]
async fn test_channel_change_parts_before_joining() {
    let harness = Harness::new(rules("old", 3));
    let (client, mut server) = pair().await;
    let shutdown = CancellationToken::new();
    let _session = spawn_session(&harness, client, &shutdown);
    expect_login(&mut server, "old").await.unwrap();

    harness.rules.update(true, |r| r.channel = "new".into());

    assert_eq!(server.recv_line().await.unwrap(), "PART #old\r\n");
    assert_eq!(server.recv_line().await.unwrap(), "JOIN #new\r\n");
    server.expect_silence(QUIET).await;
}

#[tokio::test]
async fn test_same_channel_produces_no_writes() {
    let harness = Harness::new(rules("forsen", 3));
    let (client, mut server) = pair().await;
    let shutdown = CancellationToken::new();
    let _session = spawn_session(&harness, client, &shutdown);
    expect_login(&mut server, "forsen").await.unwrap();

    harness.rules.update(true, |r| r.threshold = 10);
    harness.rules.update(true, |r| r.channel = "#forsen".into());

    server.expect_silence(QUIET).await;
}

#[tokio::test]
async fn test_burst_of_changes_wakes_feeder_once() {
    let harness = Harness::new(rules("start", 3));
    let (client, mut server) = pair().await;
    let shutdown = CancellationToken::new();
    let _session = spawn_session(&harness, client, &shutdown);
    expect_login(&mut server, "start").await.unwrap();

    for name in ["a", "b", "c", "d", "e"] {
        harness.rules.update(true, |r| r.channel = name.into());
    }

    assert_eq!(server.recv_line().await.unwrap(), "PART #start\r\n");
    assert_eq!(server.recv_line().await.unwrap(), "JOIN #e\r\n");
    server.expect_silence(QUIET).await;
}

#[tokio::test]
async fn test_joining_from_no_channel_sends_no_part() {
    let harness = Harness::new(rules("", 3));
    let (client, mut server) = pair().await;
    let shutdown = CancellationToken::new();
    let _session = spawn_session(&harness, client, &shutdown);
    expect_login(&mut server, "").await.unwrap();

    harness.rules.update(true, |r| r.channel = "pajlada".into());
    assert_eq!(server.recv_line().await.unwrap(), "JOIN #pajlada\r\n");

    harness.rules.update(true, |r| r.channel.clear());
    assert_eq!(server.recv_line().await.unwrap(), "PART #pajlada\r\n");
    server.expect_silence(QUIET).await;
}

#[tokio::test]
async fn test_new_command_applies_to_later_messages() {
    let mut harness = Harness::new(rules("forsen", 2));
    let (client, mut server) = pair().await;
    let shutdown = CancellationToken::new();
    let _session = spawn_session(&harness, client, &shutdown);
    expect_login(&mut server, "forsen").await.unwrap();

    harness.rules.update(true, |r| r.command = "!skip".into());
    // A ping round trip shows the feeder has had its turn.
    server.send("PING :sync\r\n").await.unwrap();
    assert_eq!(server.recv_line().await.unwrap(), "PONG :sync\r\n");

    server
        .send(concat!(
            ":a!a@a PRIVMSG #forsen :-voteskip\r\n",
            ":b!b@b PRIVMSG #forsen :!skip\r\n",
        ))
        .await
        .unwrap();

    assert_eq!(
        timeout(Duration::from_secs(2), harness.notifications.recv())
            .await
            .unwrap()
            .unwrap(),
        VoteNotification::CountChanged(1)
    );
}

#[tokio::test]
async fn test_changes_without_session_are_picked_up_at_login() {
    let harness = Harness::new(rules("first", 3));
    harness.rules.update(true, |r| r.channel = "second".into());

    let (client, mut server) = pair().await;
    let shutdown = CancellationToken::new();
    let _session = spawn_session(&harness, client, &shutdown);

    expect_login(&mut server, "second").await.unwrap();
    server.expect_silence(QUIET).await;
}

#[tokio::test]
async fn test_write_failure_during_channel_switch_ends_session() {
    let harness = Harness::new(rules("old", 3));
    let (client, mut server, broken) = breakable_pair().await;
    let shutdown = CancellationToken::new();
    let session = spawn_session(&harness, client, &shutdown);
    expect_login(&mut server, "old").await.unwrap();

    broken.store(true, Ordering::SeqCst);
    harness.rules.update(true, |r| r.channel = "new".into());

    let end = timeout(Duration::from_secs(2), session)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(matches!(end, SessionEnd::Failed(SessionError::Write(_))), "{end:?}");
    assert!(!shutdown.is_cancelled());
}

#[tokio::test]
async fn test_votes_use_rules_current_at_arrival() {
    let mut harness = Harness::new(rules("forsen", 1));
    let (client, mut server) = pair().await;
    let shutdown = CancellationToken::new();
    let _session = spawn_session(&harness, client, &shutdown);
    expect_login(&mut server, "forsen").await.unwrap();

    // No change signal, so the feeder never wakes.
    harness.rules.update(false, |r| r.threshold = 2);
    server
        .send(":a!a@a PRIVMSG #forsen :-voteskip\r\n")
        .await
        .unwrap();

    assert_eq!(
        timeout(Duration::from_secs(2), harness.notifications.recv())
            .await
            .unwrap()
            .unwrap(),
        VoteNotification::CountChanged(1)
    );
    assert!(harness.skips.try_recv().is_err());
}
