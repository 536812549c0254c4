//! Password change tests

mod common;

use std::sync::Arc;

use bastion::{AccountId, Bastion, Clock, ErrorKind, RepositoryProvider};
use chrono::Duration;
use common::{PASSWORD, RecordingHandler, create_alice, manual_clock, memory_bastion};

async fn check_change_password<R: RepositoryProvider>(bastion: Bastion<R>) {
    let alice = create_alice(&bastion).await;
    let (_, session) = bastion.login("alice", PASSWORD, None, None).await.unwrap();

    for _ in 0..2 {
        let _ = bastion.login("alice", "wrong", None, None).await;
    }

    let updated = bastion
        .change_password(&alice.id, PASSWORD, "n3w-s3cr3t")
        .await
        .unwrap();
    assert_eq!(updated.id, alice.id);

    // The failure counter is not touched by a password change
    assert_eq!(
        bastion.lockout_status(&alice.id).await.unwrap().failed_attempts,
        2
    );

    // Existing sessions are gone
    let err = bastion.current_account(&session.token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = bastion
        .login("alice", PASSWORD, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
    assert!(bastion.login("alice", "n3w-s3cr3t", None, None).await.is_ok());
}

#[tokio::test]
async fn test_change_password_memory() {
    check_change_password(memory_bastion(manual_clock()).await).await;
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_change_password_sqlite() {
    check_change_password(common::sqlite_bastion(manual_clock()).await).await;
}

#[tokio::test]
async fn test_wrong_old_password_is_not_a_login_failure() {
    let bastion = memory_bastion(manual_clock()).await;
    let alice = create_alice(&bastion).await;
    let (_, session) = bastion.login("alice", PASSWORD, None, None).await.unwrap();

    for _ in 0..10 {
        let err = bastion
            .change_password(&alice.id, "wrong", "n3w-s3cr3t")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
    }

    let status = bastion.lockout_status(&alice.id).await.unwrap();
    assert_eq!(status.failed_attempts, 0);
    assert!(!status.is_locked);

    // Sessions survive a rejected change
    assert!(bastion.current_account(&session.token).await.is_ok());
}

#[tokio::test]
async fn test_change_password_errors() {
    let bastion = memory_bastion(manual_clock()).await;
    let alice = create_alice(&bastion).await;

    let err = bastion
        .change_password(&AccountId::new("acc_missing"), PASSWORD, "n3w-s3cr3t")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = bastion
        .change_password(&alice.id, "", "n3w-s3cr3t")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);

    let err = bastion
        .change_password(&alice.id, PASSWORD, "")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);

    let err = bastion
        .change_password(&alice.id, PASSWORD, "   ")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);

    let err = bastion
        .change_password(&alice.id, PASSWORD, &"a".repeat(101))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);

    // A rejected new password leaves the old one working
    assert!(bastion.login("alice", PASSWORD, None, None).await.is_ok());
    assert!(
        bastion
            .change_password(&alice.id, PASSWORD, &"a".repeat(100))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_change_password_while_locked() {
    let clock = manual_clock();
    let bastion = memory_bastion(clock.clone()).await;
    let handler = Arc::new(RecordingHandler::default());
    let alice = create_alice(&bastion).await;
    bastion.event_bus().register(handler.clone()).await;

    for _ in 0..bastion::MAX_LOGIN_TRY {
        let _ = bastion.login("alice", "wrong", None, None).await;
    }
    clock.advance(Duration::minutes(1));

    let updated = bastion
        .change_password(&alice.id, PASSWORD, "n3w-s3cr3t")
        .await
        .unwrap();
    assert_eq!(updated.updated_at, clock.now());

    // Still locked: the new password has to wait for the window too
    let err = bastion
        .login("alice", "n3w-s3cr3t", None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccountLocked);

    let names = handler.names();
    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
    assert!(position("password_updated") < position("sessions_cleared"));
}
