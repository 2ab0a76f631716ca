//! Behavioral suite for the session driver over a scripted page.

use std::sync::Arc;
use std::time::Duration;

use fanbridge_driver::testing::{MockPageBuilder, PageCall};
use fanbridge_driver::{
    Credentials, DriverConfig, DriverError, LoginOutcome, PlatformAdapter, SendOutcome, Session,
    SessionState, Timeouts,
};
use fanbridge_protocol::{Cookie, ThreadId};
use serde_json::json;

fn test_config() -> DriverConfig {
    DriverConfig::default()
        .with_typing_delay(Duration::from_millis(2))
        .with_timeouts(Timeouts {
            selector: Duration::from_millis(200),
            navigation: Duration::from_millis(400),
            first_load: Duration::from_secs(2),
            send_confirm: Duration::from_millis(300),
            upload_settle: Duration::from_millis(10),
        })
}

fn credentials() -> Credentials {
    Credentials {
        username: "a".into(),
        secret: "b".into(),
    }
}

fn seed_cookie(name: &str) -> Cookie {
    Cookie {
        name: name.into(),
        value: "v".into(),
        domain: Some(".onlyfans.com".into()),
        path: Some("/".into()),
        expires: None,
        http_only: true,
        secure: true,
        same_site: None,
    }
}

/// Builder preconfigured with a working login form.
fn login_page() -> MockPageBuilder {
    MockPageBuilder::new()
        .with_selector(r#"input[name="email"]"#)
        .with_selector(r#"input[name="password"]"#)
        .with_selector(r#"button[type="submit"]"#)
}

#[tokio::test]
async fn successful_login_authenticates() {
    let (page, _handle) = login_page()
        .with_click_redirect(r#"button[type="submit"]"#, "https://onlyfans.com/my/home")
        .build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());

    let outcome = session.login(&credentials()).await.unwrap();
    assert_eq!(outcome, LoginOutcome::Authenticated);
    assert_eq!(session.state().await, SessionState::Authenticated);
}

#[tokio::test]
async fn login_rides_out_transient_url_failures_while_landing() {
    // The document swap after submit makes URL reads fail briefly; a
    // successful login must not surface that as an error.
    let (page, _handle) = login_page()
        .with_click_redirect(r#"button[type="submit"]"#, "https://onlyfans.com/my/home")
        .with_current_url_failures(2)
        .build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());

    let outcome = session.login(&credentials()).await.unwrap();
    assert_eq!(outcome, LoginOutcome::Authenticated);
    assert_eq!(session.state().await, SessionState::Authenticated);
}

#[tokio::test]
async fn rejected_login_stays_initialized() {
    let (page, _handle) = login_page()
        .with_click_redirect(
            r#"button[type="submit"]"#,
            "https://onlyfans.com/login?error=1",
        )
        .build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());

    let outcome = session.login(&credentials()).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Denied { .. }));
    assert_eq!(session.state().await, SessionState::Initialized);
}

#[tokio::test]
async fn unclassifiable_landing_is_indeterminate() {
    let (page, _handle) = login_page()
        .with_click_redirect(
            r#"button[type="submit"]"#,
            "https://onlyfans.com/captcha-checkpoint",
        )
        .build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());

    let outcome = session.login(&credentials()).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Indeterminate { .. }));
    assert_eq!(session.state().await, SessionState::Initialized);
}

#[tokio::test]
async fn missing_login_form_is_denied() {
    let (page, _handle) = MockPageBuilder::new().build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());

    let outcome = session.login(&credentials()).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Denied { .. }));
}

#[tokio::test]
async fn login_types_credentials_with_simulated_keystrokes() {
    let (page, handle) = login_page()
        .with_click_redirect(r#"button[type="submit"]"#, "https://onlyfans.com/my/home")
        .build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());

    session.login(&credentials()).await.unwrap();

    let typed: String = handle.typed_chars().into_iter().collect();
    assert_eq!(typed, "ab");
    assert!(handle.calls().contains(&PageCall::Click(r#"button[type="submit"]"#.into())));
}

#[tokio::test]
async fn authenticated_only_operations_are_gated() {
    let (page, handle) = MockPageBuilder::new().build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    let thread = ThreadId::from("t1");

    assert!(matches!(
        session.fetch_unread_threads().await,
        Err(DriverError::NotAuthenticated)
    ));
    assert!(matches!(
        session.open_thread(&thread).await,
        Err(DriverError::NotAuthenticated)
    ));
    assert!(matches!(
        session.send_text(&thread, "hi").await,
        Err(DriverError::NotAuthenticated)
    ));
    assert!(matches!(
        session
            .send_media(&thread, std::path::Path::new("/tmp/x.png"), None)
            .await,
        Err(DriverError::NotAuthenticated)
    ));
    assert!(matches!(
        session.export_cookies().await,
        Err(DriverError::NotAuthenticated)
    ));

    // The gate fires before any page interaction.
    assert!(handle.calls().is_empty());
}

#[tokio::test]
async fn close_is_idempotent() {
    let (page, handle) = MockPageBuilder::new().build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());

    session.close().await;
    assert_eq!(session.state().await, SessionState::Closed);
    session.close().await;
    assert_eq!(session.state().await, SessionState::Closed);

    let closes = handle
        .calls()
        .iter()
        .filter(|c| matches!(c, PageCall::Close))
        .count();
    assert_eq!(closes, 1);
}

#[tokio::test]
async fn cookie_round_trip_restores_without_relogin() {
    // Authenticated source session with a live cookie store.
    let (page, _handle) = login_page()
        .with_click_redirect(r#"button[type="submit"]"#, "https://onlyfans.com/my/home")
        .with_cookies(vec![seed_cookie("sess"), seed_cookie("auth_id")])
        .build();
    let source = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    source.login(&credentials()).await.unwrap();
    let jar = source.export_cookies().await.unwrap();
    assert_eq!(jar.len(), 2);

    // Fresh session: restore and read without ever seeing a login form.
    let (page, handle) = MockPageBuilder::new()
        .with_selector(r#"[data-test="chat-item"]"#)
        .with_eval_handler(|expr| {
            expr.contains(r#"[data-test="chat-item"]"#).then(|| json!([]))
        })
        .build();
    let restored = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    restored.restore_cookies(&jar).await.unwrap();
    assert_eq!(restored.state().await, SessionState::Authenticated);

    let unread = restored.fetch_unread_threads().await.unwrap();
    assert!(unread.is_empty());
    assert!(handle.calls().contains(&PageCall::SetCookies(2)));
}

#[tokio::test]
async fn jar_survives_a_restart_through_a_file() {
    let (page, _handle) = login_page()
        .with_click_redirect(r#"button[type="submit"]"#, "https://onlyfans.com/my/home")
        .with_cookies(vec![seed_cookie("sess")])
        .build();
    let source = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    source.login(&credentials()).await.unwrap();
    let jar = source.export_cookies().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("cookies.json");
    jar.to_file(&path).unwrap();
    let reloaded = fanbridge_protocol::CookieJar::from_file(&path).unwrap();
    assert_eq!(reloaded, jar);

    let (page, handle) = MockPageBuilder::new().build();
    let restored = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    restored.restore_cookies(&reloaded).await.unwrap();
    assert_eq!(restored.state().await, SessionState::Authenticated);
    assert!(handle.calls().contains(&PageCall::SetCookies(1)));
}

#[tokio::test]
async fn exported_jar_is_a_copy() {
    let (page, handle) = login_page()
        .with_click_redirect(r#"button[type="submit"]"#, "https://onlyfans.com/my/home")
        .with_cookies(vec![seed_cookie("sess")])
        .build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    session.login(&credentials()).await.unwrap();

    let mut jar = session.export_cookies().await.unwrap();
    jar.cookies[0].value = "tampered".into();
    assert_eq!(handle.cookies()[0].value, "v");
}

#[tokio::test]
async fn unread_scan_returns_one_record_per_unread_item() {
    // Inbox with 3 items of which 2 carry the unread marker: the scan
    // script yields exactly the 2 unread ones.
    let (page, _handle) = MockPageBuilder::new()
        .with_selector(r#"[data-test="chat-item"]"#)
        .with_eval_handler(|expr| {
            expr.contains(r#"[data-test="chat-item"]"#).then(|| {
                json!([
                    {"name": "ada", "avatar": "https://cdn/x.jpg", "excerpt": "hey", "threadId": "t-1"},
                    {"name": "greta", "avatar": "", "excerpt": "you there?", "threadId": "t-2"},
                ])
            })
        })
        .build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    session
        .restore_cookies(&fanbridge_protocol::CookieJar::default())
        .await
        .unwrap();

    let unread = session.fetch_unread_threads().await.unwrap();
    assert_eq!(unread.len(), 2);
    for record in &unread {
        assert!(!record.thread_id.is_empty());
        assert!(!record.read);
        assert_eq!(record.subscriber_id, record.thread_id.as_str());
    }
    assert_eq!(unread[0].avatar_url.as_deref(), Some("https://cdn/x.jpg"));
    assert!(unread[1].avatar_url.is_none());
}

#[tokio::test]
async fn scrape_timeout_is_an_error_not_an_empty_list() {
    // Inbox never renders its list container.
    let (page, _handle) = MockPageBuilder::new().build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    session
        .restore_cookies(&fanbridge_protocol::CookieJar::default())
        .await
        .unwrap();

    assert!(matches!(
        session.fetch_unread_threads().await,
        Err(DriverError::Scrape(_))
    ));
}

#[tokio::test]
async fn expiry_check_rides_out_a_transient_url_failure() {
    let (page, _handle) = MockPageBuilder::new()
        .with_selector(r#"[data-test="chat-item"]"#)
        .with_current_url_failures(1)
        .with_eval_handler(|expr| {
            expr.contains(r#"[data-test="chat-item"]"#).then(|| json!([]))
        })
        .build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    session
        .restore_cookies(&fanbridge_protocol::CookieJar::default())
        .await
        .unwrap();

    let unread = session.fetch_unread_threads().await.unwrap();
    assert!(unread.is_empty());
    assert_eq!(session.state().await, SessionState::Authenticated);
}

#[tokio::test]
async fn expiry_is_detected_lazily_and_sticks() {
    let adapter = PlatformAdapter::default();
    let inbox = adapter.inbox_url();
    let (page, handle) = MockPageBuilder::new()
        .with_redirect(&inbox, "https://onlyfans.com/login")
        .build();
    let session = Session::with_page(Box::new(page), adapter, test_config());
    session
        .restore_cookies(&fanbridge_protocol::CookieJar::default())
        .await
        .unwrap();

    // Stale cookies: the inbox navigation bounces to the login surface.
    assert!(matches!(
        session.fetch_unread_threads().await,
        Err(DriverError::NotAuthenticated)
    ));
    assert_eq!(session.state().await, SessionState::Expired);

    // Subsequent operations fail fast with no further navigation.
    let navigations_before = handle
        .calls()
        .iter()
        .filter(|c| matches!(c, PageCall::Navigate(_)))
        .count();
    assert!(matches!(
        session.send_text(&ThreadId::from("t-1"), "hi").await,
        Err(DriverError::NotAuthenticated)
    ));
    let navigations_after = handle
        .calls()
        .iter()
        .filter(|c| matches!(c, PageCall::Navigate(_)))
        .count();
    assert_eq!(navigations_before, navigations_after);
}

#[tokio::test]
async fn send_text_confirms_via_composer_clearing() {
    let (page, handle) = MockPageBuilder::new()
        .with_selector(r#"[data-test="message-input"]"#)
        .with_eval_handler(|expr| expr.contains("length === 0").then(|| json!(true)))
        .build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    session
        .restore_cookies(&fanbridge_protocol::CookieJar::default())
        .await
        .unwrap();

    let outcome = session.send_text(&ThreadId::from("t-9"), "hello").await.unwrap();
    assert_eq!(outcome, SendOutcome::Sent);

    let calls = handle.calls();
    assert!(calls.contains(&PageCall::Navigate(
        "https://onlyfans.com/my/chats/chat/t-9".into()
    )));
    assert!(calls.contains(&PageCall::Click(r#"[data-test="send-button"]"#.into())));
}

#[tokio::test]
async fn unconfirmed_send_is_indeterminate() {
    let (page, _handle) = MockPageBuilder::new()
        .with_selector(r#"[data-test="message-input"]"#)
        .with_eval_handler(|expr| expr.contains("length === 0").then(|| json!(false)))
        .build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    session
        .restore_cookies(&fanbridge_protocol::CookieJar::default())
        .await
        .unwrap();

    let outcome = session.send_text(&ThreadId::from("t-9"), "hello").await.unwrap();
    assert!(matches!(outcome, SendOutcome::Indeterminate { .. }));
}

#[tokio::test]
async fn send_media_uploads_then_captions_then_sends() {
    let (page, handle) = MockPageBuilder::new()
        .with_selector(r#"input[type="file"]"#)
        .with_selector(r#"[data-test="message-input"]"#)
        .with_eval_handler(|expr| expr.contains(".files").then(|| json!(true)))
        .build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    session
        .restore_cookies(&fanbridge_protocol::CookieJar::default())
        .await
        .unwrap();

    let outcome = session
        .send_media(
            &ThreadId::from("t-3"),
            std::path::Path::new("/tmp/render.png"),
            Some("for you"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, SendOutcome::Sent);

    let calls = handle.calls();
    let upload_at = calls
        .iter()
        .position(|c| matches!(c, PageCall::UploadFile { .. }))
        .unwrap();
    let send_at = calls
        .iter()
        .position(|c| *c == PageCall::Click(r#"[data-test="send-button"]"#.into()))
        .unwrap();
    assert!(upload_at < send_at);
    let typed: String = handle.typed_chars().into_iter().collect();
    assert_eq!(typed, "for you");
}

#[tokio::test]
async fn concurrent_sends_never_interleave_keystrokes() {
    let (page, handle) = MockPageBuilder::new()
        .with_selector(r#"[data-test="message-input"]"#)
        .with_eval_handler(|expr| expr.contains("length === 0").then(|| json!(true)))
        .build();
    let session = Arc::new(Session::with_page(
        Box::new(page),
        PlatformAdapter::default(),
        test_config(),
    ));
    session
        .restore_cookies(&fanbridge_protocol::CookieJar::default())
        .await
        .unwrap();

    let a = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.send_text(&ThreadId::from("t-1"), "aaaaaaaa").await }
    });
    let b = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.send_text(&ThreadId::from("t-1"), "bbbbbbbb").await }
    });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let typed: String = handle.typed_chars().into_iter().collect();
    assert!(
        typed == "aaaaaaaabbbbbbbb" || typed == "bbbbbbbbaaaaaaaa",
        "keystrokes interleaved: {typed}"
    );
}

#[tokio::test]
async fn selector_waits_are_bounded() {
    // Composer never appears; the 200ms selector budget must bound the
    // call well below the default budgets.
    let (page, _handle) = MockPageBuilder::new().build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    session
        .restore_cookies(&fanbridge_protocol::CookieJar::default())
        .await
        .unwrap();

    let start = std::time::Instant::now();
    let result = session.send_text(&ThreadId::from("t-1"), "hi").await;
    assert!(matches!(result, Err(DriverError::Timeout { .. })));
    assert!(
        start.elapsed() < Duration::from_secs(3),
        "wait was not bounded: {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn cancellation_aborts_a_hung_navigation() {
    let (page, _handle) = MockPageBuilder::new().with_hung_navigation().build();
    let session = Arc::new(Session::with_page(
        Box::new(page),
        PlatformAdapter::default(),
        // Long budgets: cancellation must win well before any timeout.
        DriverConfig::default().with_typing_delay(Duration::from_millis(1)),
    ));
    session
        .restore_cookies(&fanbridge_protocol::CookieJar::default())
        .await
        .unwrap();

    let token = session.cancellation_token();
    let op = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.open_thread(&ThreadId::from("t-1")).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let start = std::time::Instant::now();
    token.cancel();

    let result = op.await.unwrap();
    assert!(matches!(result, Err(DriverError::Cancelled)));
    assert!(start.elapsed() < Duration::from_secs(1));

    // A cancelled session still closes.
    session.close().await;
    assert_eq!(session.state().await, SessionState::Closed);
}

#[tokio::test]
async fn operations_on_a_closed_session_fail_fast() {
    let (page, _handle) = MockPageBuilder::new().build();
    let session = Session::with_page(Box::new(page), PlatformAdapter::default(), test_config());
    session.close().await;

    assert!(matches!(
        session.login(&credentials()).await,
        Err(DriverError::NotAuthenticated)
    ));
    assert!(matches!(
        session
            .restore_cookies(&fanbridge_protocol::CookieJar::default())
            .await,
        Err(DriverError::NotAuthenticated)
    ));
}
