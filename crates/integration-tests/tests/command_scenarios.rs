//! Command condition wired into the poller

#![cfg(unix)]

mod common;

use regex::Regex;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use waitfor_core::port::{from_async_fn, not};
use waitfor_core::{poll_with_timeout, PollError};
use waitfor_infra_system::CommandCheck;

use common::Counted;

/// A script that succeeds from its third run on, counting runs in `counter`
fn third_time_lucky(counter: &std::path::Path) -> CommandCheck {
    let script = format!(
        "n=$(cat '{0}' 2>/dev/null || echo 0); n=$((n+1)); echo $n > '{0}'; \
         echo run $n; [ $n -ge 3 ]",
        counter.display()
    );
    CommandCheck::new("/bin/sh", ["-c", script.as_str()])
}

#[tokio::test]
async fn test_missing_executable() {
    let check = CommandCheck::new("waitfor-no-such-executable", Vec::<String>::new());

    assert!(!check.succeeds().await);
    assert!(check.fails().await);
    assert!(check.matches_exit_code(127).await);
    assert!(!check.matches_exit_code(0).await);

    let (mut condition, count) = Counted::new(from_async_fn(|| check.succeeds()));
    let result = poll_with_timeout(
        &mut condition,
        Duration::from_millis(10),
        Duration::from_millis(50),
    )
    .await;
    assert_eq!(assert_err!(result), PollError::TimedOut);
    assert!(count.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_command_succeeding_partway() {
    let dir = tempfile::tempdir().unwrap();
    let check = third_time_lucky(&dir.path().join("runs"));

    let mut condition = from_async_fn(|| check.succeeds());
    let stats = assert_ok!(
        poll_with_timeout(&mut condition, Duration::from_millis(10), Duration::from_secs(10)).await
    );

    assert_eq!(stats.evaluations, 3);
}

#[tokio::test]
async fn test_output_matching_partway() {
    let dir = tempfile::tempdir().unwrap();
    let check = third_time_lucky(&dir.path().join("runs"));
    let third_run = Regex::new("run 3").unwrap();

    let mut condition = from_async_fn(|| check.matches_output(&third_run));
    let stats = assert_ok!(
        poll_with_timeout(&mut condition, Duration::from_millis(10), Duration::from_secs(10)).await
    );

    assert_eq!(stats.evaluations, 3);
}

#[tokio::test]
async fn test_waiting_for_failure() {
    let check = CommandCheck::new("/bin/sh", ["-c", "exit 0"]);

    let mut condition = not(from_async_fn(|| check.succeeds()));
    let result = poll_with_timeout(&mut condition, Duration::from_millis(10), Duration::ZERO).await;
    assert_eq!(assert_err!(result), PollError::TimedOut);

    let mut condition = from_async_fn(|| check.fails());
    let result = poll_with_timeout(&mut condition, Duration::from_millis(10), Duration::ZERO).await;
    assert_eq!(assert_err!(result), PollError::TimedOut);
}

#[tokio::test]
async fn test_negative_exit_code_request_wraps() {
    let check = CommandCheck::new("/bin/sh", ["-c", "exit 255"]);

    let mut condition = from_async_fn(|| check.matches_exit_code(-1));
    let stats = assert_ok!(
        poll_with_timeout(&mut condition, Duration::from_millis(10), Duration::from_secs(5)).await
    );
    assert_eq!(stats.evaluations, 1);
}
