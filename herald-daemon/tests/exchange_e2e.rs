//! End-to-end tests for the enrollment and delivery exchanges.
//!
//! Each test boots a real authority on ephemeral loopback ports and talks to
//! it over TCP.

mod common;

use std::num::NonZeroUsize;
use std::time::Duration;

use common::harness::exchange;
use common::TestAuthority;
use herald_core::wire::{INVALID_FORMAT_ERROR, INVALID_TOKEN_ERROR, MALFORMED_MESSAGE_ERROR};
use herald_core::{Identity, MalformedPolicy};
use herald_daemon::AuthorityConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

// ============================================================================
// Happy path and token rotation
// ============================================================================

#[tokio::test]
async fn test_alice_enrolls_delivers_and_rotates() {
    let authority = TestAuthority::start().await;

    let t1 = authority.enroll("alice").await;
    assert!(!t1.is_empty());
    assert_eq!(
        authority.deliver(Some("alice"), Some(&t1), Some("hello")).await,
        ""
    );

    let t2 = authority.enroll("alice").await;
    assert_ne!(t1, t2, "Re-enrollment must issue a new token");

    assert_eq!(
        authority.deliver(Some("alice"), Some(&t1), Some("hello")).await,
        INVALID_TOKEN_ERROR,
        "Old token must be revoked"
    );
    assert_eq!(
        authority.deliver(Some("alice"), Some(&t2), Some("hello")).await,
        ""
    );
}

#[tokio::test]
async fn test_token_is_bound_in_table() {
    let authority = TestAuthority::start().await;
    let token = authority.enroll("bob").await;

    let stored = authority.table.lookup(&Identity::new("bob")).await;
    assert_eq!(stored.map(|t| t.as_str().to_owned()), Some(token));
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_wrong_token_rejected() {
    let authority = TestAuthority::start().await;
    let token = authority.enroll("alice").await;
    let wrong = format!("{token}x");

    assert_eq!(
        authority.deliver(Some("alice"), Some(&wrong), Some("payload")).await,
        INVALID_TOKEN_ERROR
    );
    assert_eq!(
        authority
            .deliver(Some("alice"), Some(&token.to_uppercase()), Some("payload"))
            .await,
        INVALID_TOKEN_ERROR
    );
}

#[tokio::test]
async fn test_unenrolled_identity_always_rejected() {
    let authority = TestAuthority::start().await;
    let someone_elses = authority.enroll("alice").await;

    for token in [None, Some(""), Some("anything"), Some(someone_elses.as_str())] {
        assert_eq!(
            authority.deliver(Some("mallory"), token, Some("hi")).await,
            INVALID_TOKEN_ERROR
        );
    }
}

#[tokio::test]
async fn test_missing_fields_rejected_regardless_of_token() {
    let authority = TestAuthority::start().await;
    let token = authority.enroll("alice").await;
    let token = Some(token.as_str());

    assert_eq!(
        authority.deliver(None, token, Some("hi")).await,
        INVALID_FORMAT_ERROR
    );
    assert_eq!(
        authority.deliver(Some(""), token, Some("hi")).await,
        INVALID_FORMAT_ERROR
    );
    assert_eq!(
        authority.deliver(Some("alice"), token, None).await,
        INVALID_FORMAT_ERROR
    );
    assert_eq!(
        authority.deliver(Some("alice"), token, Some("")).await,
        INVALID_FORMAT_ERROR
    );
    assert_eq!(
        authority.deliver(Some("alice"), None, None).await,
        INVALID_FORMAT_ERROR
    );
}

// ============================================================================
// Malformed envelopes
// ============================================================================

#[tokio::test]
async fn test_malformed_body_gets_no_bytes() {
    let authority = TestAuthority::start().await;

    for body in [&b"{not json"[..], b"[1, 2, 3]", b"\xff\xfe"] {
        // A clean EOF would look like success, so only a reset is acceptable.
        let err = authority
            .deliver_raw(body)
            .await
            .expect_err("Malformed body must not end in a clean close");
        assert!(
            matches!(
                err.kind(),
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted
            ),
            "unexpected error: {err}"
        );
    }

    // The authority keeps serving after bad input.
    let token = authority.enroll("alice").await;
    assert_eq!(authority.deliver(Some("alice"), Some(&token), Some("ok")).await, "");
}

#[tokio::test]
async fn test_strict_mode_answers_malformed_body() {
    let authority = TestAuthority::with_config(AuthorityConfig {
        malformed_policy: MalformedPolicy::Respond,
        ..AuthorityConfig::ephemeral()
    })
    .await;

    let response = authority.deliver_raw(b"{not json").await.unwrap();
    assert_eq!(response, MALFORMED_MESSAGE_ERROR.as_bytes());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_participants_do_not_cross_contaminate() {
    const N: usize = 32;
    let authority = std::sync::Arc::new(TestAuthority::start().await);

    let enrollments: Vec<_> = (0..N)
        .map(|i| {
            let authority = authority.clone();
            tokio::spawn(async move {
                let identity = format!("participant-{i}");
                let token = authority.enroll(&identity).await;
                (identity, token)
            })
        })
        .collect();

    let mut pairs = Vec::with_capacity(N);
    for handle in enrollments {
        pairs.push(handle.await.unwrap());
    }

    let deliveries: Vec<_> = pairs
        .iter()
        .cloned()
        .map(|(identity, token)| {
            let authority = authority.clone();
            tokio::spawn(async move {
                authority
                    .deliver(Some(identity.as_str()), Some(token.as_str()), Some("payload"))
                    .await
            })
        })
        .collect();

    for handle in deliveries {
        assert_eq!(handle.await.unwrap(), "");
    }

    // Every token is distinct, so swapping any two must fail.
    let (first_id, _) = &pairs[0];
    let (_, second_token) = &pairs[1];
    assert_eq!(
        authority
            .deliver(Some(first_id.as_str()), Some(second_token.as_str()), Some("payload"))
            .await,
        INVALID_TOKEN_ERROR
    );
}

#[tokio::test]
async fn test_silent_client_does_not_block_others() {
    let authority = TestAuthority::start().await;

    // Open connections on both endpoints and never send anything.
    let _idle_enrollment = TcpStream::connect(authority.enrollment_addr).await.unwrap();
    let _idle_delivery = TcpStream::connect(authority.delivery_addr).await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), async {
        let token = authority.enroll("alice").await;
        authority.deliver(Some("alice"), Some(&token), Some("hi")).await
    })
    .await
    .expect("Exchange blocked behind an idle connection");

    assert_eq!(result, "");
}

#[tokio::test]
async fn test_idle_connection_is_dropped_after_timeout() {
    let authority = TestAuthority::with_config(AuthorityConfig {
        idle_timeout: Duration::from_millis(200),
        ..AuthorityConfig::ephemeral()
    })
    .await;

    let mut idle = TcpStream::connect(authority.delivery_addr).await.unwrap();
    let mut buf = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), idle.read_to_end(&mut buf))
        .await
        .expect("Authority never closed the idle connection");

    // Closed without a response.
    assert!(read.map(|n| n == 0).unwrap_or(true));
    assert!(authority.table.is_empty().await);
}

// ============================================================================
// Configuration extensions and lifecycle
// ============================================================================

#[tokio::test]
async fn test_capacity_evicts_oldest_identity() {
    let authority = TestAuthority::with_config(AuthorityConfig {
        max_bindings: NonZeroUsize::new(2),
        ..AuthorityConfig::ephemeral()
    })
    .await;

    let a = authority.enroll("a").await;
    let _b = authority.enroll("b").await;
    let c = authority.enroll("c").await;

    assert_eq!(authority.table.len().await, 2);
    assert_eq!(
        authority.deliver(Some("a"), Some(&a), Some("hi")).await,
        INVALID_TOKEN_ERROR
    );
    assert_eq!(authority.deliver(Some("c"), Some(&c), Some("hi")).await, "");
}

#[tokio::test]
async fn test_identity_is_raw_and_bounded() {
    let authority = TestAuthority::start().await;

    let long_identity = "z".repeat(150);

    // The unread tail makes the authority reset the connection on close, so
    // take the token from a single read instead of reading to EOF.
    let mut stream = TcpStream::connect(authority.enrollment_addr).await.unwrap();
    stream.write_all(long_identity.as_bytes()).await.unwrap();
    let mut buf = [0u8; 100];
    let n = stream.read(&mut buf).await.unwrap();
    let token = String::from_utf8(buf[..n].to_vec()).unwrap();
    assert!(!token.is_empty());

    // Only the first 100 bytes were taken as the identity.
    let truncated = &long_identity[..100];
    assert_eq!(
        authority.deliver(Some(truncated), Some(&token), Some("hi")).await,
        ""
    );
    assert_eq!(
        authority
            .deliver(Some(&long_identity), Some(&token), Some("hi"))
            .await,
        INVALID_TOKEN_ERROR
    );
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let authority = TestAuthority::start().await;
    let enrollment_addr = authority.enrollment_addr;
    let delivery_addr = authority.delivery_addr;

    authority.stop().await;

    assert!(exchange(enrollment_addr, b"alice").await.is_err());
    assert!(TcpStream::connect(delivery_addr).await.is_err());
}

#[tokio::test]
async fn test_restart_forgets_bindings() {
    let first = TestAuthority::start().await;
    let token = first.enroll("alice").await;
    first.stop().await;

    let second = TestAuthority::start().await;
    assert_eq!(
        second.deliver(Some("alice"), Some(&token), Some("hi")).await,
        INVALID_TOKEN_ERROR
    );
}

#[tokio::test]
async fn test_response_written_before_close() {
    let authority = TestAuthority::start().await;

    let mut stream = TcpStream::connect(authority.delivery_addr).await.unwrap();
    stream
        .write_all(br#"{"uid": "ghost", "token": "t", "msg": "boo"}"#)
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert_eq!(response, INVALID_TOKEN_ERROR);
}
