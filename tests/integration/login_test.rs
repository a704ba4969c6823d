//! Integration tests for login and per-request authentication.

mod helpers;

use chrono::Duration;

use helpers::{PASSWORD, TestContext, client_ip};
use warden_auth::TokenType;
use warden_core::{Clock, ErrorKind};
use warden_directory::UserRepository;
use warden_entity::{Role, Status};

#[tokio::test]
async fn test_login_success() {
    let ctx = TestContext::new().await;
    let principal = ctx.create_user("ada@example.com").await;

    let result = ctx.login("ada@example.com").await;

    assert_eq!(result.principal.id, principal.id);
    assert_eq!(result.principal.role, Role::User);
    assert_eq!(result.tokens.access_expires_in, 15 * 60);
    assert_eq!(result.tokens.refresh_expires_in, 168 * 3600);

    let decoder = ctx.decoder();
    let access = decoder.decode(&result.tokens.access_token).unwrap();
    let refresh = decoder.decode(&result.tokens.refresh_token).unwrap();
    assert_eq!(access.token_type, TokenType::Access);
    assert_eq!(refresh.token_type, TokenType::Refresh);
    assert_eq!(access.subject_id, principal.id);
    assert_ne!(access.token_id, refresh.token_id);

    let stored = ctx.principal(principal.id).await;
    assert_eq!(stored.last_login_at, Some(ctx.clock.now()));
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;

    let result = ctx
        .services
        .sessions
        .login("ADA@Example.COM", PASSWORD, client_ip())
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_identical() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;

    let wrong_password = ctx
        .services
        .sessions
        .login("ada@example.com", "Wrong#Pass1", client_ip())
        .await
        .unwrap_err();
    let unknown_email = ctx
        .services
        .sessions
        .login("nobody@example.com", PASSWORD, client_ip())
        .await
        .unwrap_err();

    assert_eq!(wrong_password.kind, ErrorKind::InvalidCredentials);
    assert_eq!(unknown_email.kind, ErrorKind::InvalidCredentials);
    assert_eq!(wrong_password.public_message(), unknown_email.public_message());
}

#[tokio::test]
async fn test_account_status_checked_after_password() {
    let ctx = TestContext::new().await;
    ctx.create_principal("blocked@example.com", Role::User, Status::Blocked)
        .await;
    ctx.create_principal("idle@example.com", Role::User, Status::Inactive)
        .await;
    let sessions = &ctx.services.sessions;

    let err = sessions
        .login("blocked@example.com", "Wrong#Pass1", client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidCredentials);

    let err = sessions
        .login("blocked@example.com", PASSWORD, client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccountBlocked);

    let err = sessions
        .login("idle@example.com", PASSWORD, client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccountInactive);
}

#[tokio::test]
async fn test_login_rate_limited_after_max_attempts() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;
    let sessions = &ctx.services.sessions;
    let window_start = ctx.clock.now();

    for _ in 0..5 {
        let err = sessions
            .login("ada@example.com", "Wrong#Pass1", client_ip())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredentials);
    }

    // The correct password does not help once the window is full.
    let err = sessions
        .login("ada@example.com", PASSWORD, client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::LoginRateLimited);
    assert_eq!(err.retry_after(), Some(window_start + Duration::seconds(300)));

    // Other addresses are counted separately.
    let other_ip = "198.51.100.2".parse().unwrap();
    assert!(sessions.login("ada@example.com", PASSWORD, other_ip).await.is_ok());

    ctx.clock.advance(Duration::seconds(300));
    assert!(sessions.login("ada@example.com", PASSWORD, client_ip()).await.is_ok());
}

#[tokio::test]
async fn test_authenticate_returns_identity() {
    let ctx = TestContext::new().await;
    let principal = ctx.create_user("ada@example.com").await;

    let (login, identity) = ctx.identity("ada@example.com").await;

    assert_eq!(identity.subject_id, principal.id);
    assert_eq!(identity.role, Role::User);
    assert_eq!(identity.expires_at, login.tokens.access_expires_at);
}

#[tokio::test]
async fn test_authenticate_rejects_refresh_token() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;

    let err = ctx
        .services
        .sessions
        .authenticate(&login.tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongTokenType);
}

#[tokio::test]
async fn test_access_token_expires() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    ctx.clock.advance(Duration::minutes(14));
    assert!(sessions.authenticate(&login.tokens.access_token).await.is_ok());

    ctx.clock.advance(Duration::minutes(1));
    let err = sessions
        .authenticate(&login.tokens.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ExpiredToken);
}

#[tokio::test]
async fn test_tampered_token_is_malformed() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;

    let (unsigned, signature) = login.tokens.access_token.rsplit_once('.').unwrap();
    let replacement = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{unsigned}.{replacement}{}", &signature[1..]);

    for token in [tampered.as_str(), "not.a.token", ""] {
        let err = ctx.services.sessions.authenticate(token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedToken, "token {token:?}");
    }
}

#[tokio::test]
async fn test_current_role_and_status_apply_to_existing_tokens() {
    let ctx = TestContext::new().await;
    let principal = ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    ctx.users
        .update_role(principal.id, Role::Moderator)
        .await
        .unwrap();
    let identity = sessions
        .authenticate(&login.tokens.access_token)
        .await
        .unwrap();
    assert_eq!(identity.role, Role::Moderator);

    ctx.users
        .update_status(principal.id, Status::Blocked)
        .await
        .unwrap();
    let err = sessions
        .authenticate(&login.tokens.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccountBlocked);
}

#[tokio::test]
async fn test_logout_all_revokes_every_session() {
    let ctx = TestContext::new().await;
    let principal = ctx.create_user("ada@example.com").await;
    let first = ctx.login("ada@example.com").await;
    let second = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    ctx.clock.advance(Duration::seconds(1));
    sessions.logout_all(principal.id).await.unwrap();

    for token in [&first.tokens.access_token, &second.tokens.access_token] {
        let err = sessions.authenticate(token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenRevoked);
    }
    let err = sessions
        .refresh(&second.tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenRevoked);

    // Sessions started afterwards are unaffected.
    let (_, identity) = ctx.identity("ada@example.com").await;
    assert_eq!(identity.subject_id, principal.id);
}

#[tokio::test]
async fn test_logout_all_covers_tokens_from_the_same_instant() {
    let ctx = TestContext::new().await;
    let principal = ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    sessions.logout_all(principal.id).await.unwrap();

    let err = sessions
        .authenticate(&login.tokens.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenRevoked);
    let err = sessions
        .refresh(&login.tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenRevoked);

    let (_, identity) = ctx.identity("ada@example.com").await;
    assert_eq!(identity.subject_id, principal.id);
}
