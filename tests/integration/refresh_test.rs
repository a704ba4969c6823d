//! Integration tests for refresh token rotation and logout.

mod helpers;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;

use helpers::{TestContext, test_config};
use warden_auth::revocation::watermark_cutoff;
use warden_auth::{MemoryRevocationStore, RevocationStore};
use warden_core::ErrorKind;
use warden_core::config::RateLimitRule;
use warden_core::result::AppResult;
use warden_core::traits::{Clock, ManualClock};
use warden_core::types::{PrincipalId, TokenId};
use warden_directory::UserRepository;
use warden_entity::{Role, Status};

/// Memory store that revokes every session of `subject` right after each
/// single-token revocation, the way a password change racing a refresh
/// would.
#[derive(Debug)]
struct BulkRevokeOnRotation {
    inner: MemoryRevocationStore,
    clock: ManualClock,
    subject: Mutex<Option<PrincipalId>>,
}

#[async_trait]
impl RevocationStore for BulkRevokeOnRotation {
    async fn revoke(&self, token_id: TokenId, expires_at: DateTime<Utc>) -> AppResult<bool> {
        let revoked = self.inner.revoke(token_id, expires_at).await?;
        let subject = *self.subject.lock().unwrap();
        if let Some(subject) = subject {
            self.inner
                .revoke_all_for_subject(subject, watermark_cutoff(self.clock.now()))
                .await?;
        }
        Ok(revoked)
    }

    async fn is_revoked(&self, token_id: TokenId) -> AppResult<bool> {
        self.inner.is_revoked(token_id).await
    }

    async fn revoke_all_for_subject(
        &self,
        subject_id: PrincipalId,
        cutoff: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.inner.revoke_all_for_subject(subject_id, cutoff).await
    }

    async fn subject_watermark(&self, subject_id: PrincipalId) -> AppResult<Option<DateTime<Utc>>> {
        self.inner.subject_watermark(subject_id).await
    }

    async fn sweep(&self) -> AppResult<usize> {
        self.inner.sweep().await
    }
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let ctx = TestContext::new().await;
    let principal = ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    ctx.clock.advance(Duration::seconds(1));
    let pair = sessions.refresh(&login.tokens.refresh_token).await.unwrap();

    assert_ne!(pair.refresh_token, login.tokens.refresh_token);
    let identity = sessions.authenticate(&pair.access_token).await.unwrap();
    assert_eq!(identity.subject_id, principal.id);

    let err = sessions
        .refresh(&login.tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenRevoked);
}

#[tokio::test]
async fn test_reused_refresh_token_revokes_the_family() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    ctx.clock.advance(Duration::seconds(1));
    let rotated = sessions.refresh(&login.tokens.refresh_token).await.unwrap();

    // An attacker replays the stolen original.
    ctx.clock.advance(Duration::seconds(1));
    let err = sessions
        .refresh(&login.tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenRevoked);

    // The legitimate client's rotated pair is gone too.
    let err = sessions.refresh(&rotated.refresh_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenRevoked);
    let err = sessions
        .authenticate(&rotated.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenRevoked);
}

#[tokio::test]
async fn test_reuse_without_family_revocation() {
    let mut config = test_config();
    config.auth.revoke_family_on_reuse = false;
    let ctx = TestContext::with_config(config).await;
    ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    ctx.clock.advance(Duration::seconds(1));
    let rotated = sessions.refresh(&login.tokens.refresh_token).await.unwrap();

    ctx.clock.advance(Duration::seconds(1));
    let err = sessions
        .refresh(&login.tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenRevoked);

    assert!(sessions.refresh(&rotated.refresh_token).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_has_one_winner() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    let sessions = Arc::clone(&ctx.services.sessions);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let sessions = Arc::clone(&sessions);
            let token = login.tokens.refresh_token.clone();
            tokio::spawn(async move { sessions.refresh(&token).await })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert_eq!(result.as_ref().unwrap_err().kind, ErrorKind::TokenRevoked);
    }
}

#[tokio::test]
async fn test_refresh_picks_up_current_role() {
    let ctx = TestContext::new().await;
    let principal = ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;

    ctx.users
        .update_role(principal.id, Role::Moderator)
        .await
        .unwrap();
    let pair = ctx
        .services
        .sessions
        .refresh(&login.tokens.refresh_token)
        .await
        .unwrap();

    let claims = ctx.decoder().decode(&pair.access_token).unwrap();
    assert_eq!(claims.role, Role::Moderator);
}

#[tokio::test]
async fn test_refresh_rejected_for_blocked_principal() {
    let ctx = TestContext::new().await;
    let principal = ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;

    ctx.users
        .update_status(principal.id, Status::Blocked)
        .await
        .unwrap();
    let err = ctx
        .services
        .sessions
        .refresh(&login.tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccountBlocked);
}

#[tokio::test]
async fn test_refresh_error_cases() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    let err = sessions
        .refresh(&login.tokens.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongTokenType);

    let err = sessions.refresh("garbage").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedToken);

    ctx.clock.advance(Duration::hours(168));
    let err = sessions
        .refresh(&login.tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ExpiredToken);
}

#[tokio::test]
async fn test_refresh_rate_limited_per_subject() {
    let mut config = test_config();
    config.rate_limit.refresh = RateLimitRule::new(2, 60);
    let ctx = TestContext::with_config(config).await;
    ctx.create_user("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    let mut token = ctx.login("ada@example.com").await.tokens.refresh_token;
    for _ in 0..2 {
        token = sessions.refresh(&token).await.unwrap().refresh_token;
    }

    let err = sessions.refresh(&token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RefreshRateLimited);
    assert!(err.retry_after().is_some());

    // Denied attempts do not consume the token.
    ctx.clock.advance(Duration::seconds(60));
    assert!(sessions.refresh(&token).await.is_ok());
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    sessions.logout(&login.tokens.refresh_token).await.unwrap();
    sessions.logout(&login.tokens.refresh_token).await.unwrap();

    let err = sessions
        .refresh(&login.tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenRevoked);
}

#[tokio::test]
async fn test_logout_accepts_expired_and_rejects_invalid_tokens() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    let err = sessions
        .logout(&login.tokens.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongTokenType);

    let err = sessions.logout("garbage").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedToken);

    ctx.clock.advance(Duration::hours(200));
    assert!(sessions.logout(&login.tokens.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_sweep_purges_expired_revocations() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    ctx.services
        .sessions
        .logout(&login.tokens.refresh_token)
        .await
        .unwrap();

    let sweeper = ctx.services.sweeper();
    let report = sweeper.run_once().await.unwrap();
    assert_eq!(report.revocations, 0);

    ctx.clock.advance(Duration::hours(169));
    let report = sweeper.run_once().await.unwrap();
    assert_eq!(report.revocations, 1);
    assert_eq!(report.rate_limit_windows, 1);
}

#[tokio::test]
async fn test_replayed_revoked_token_does_not_spend_refresh_budget() {
    let mut config = test_config();
    config.auth.revoke_family_on_reuse = false;
    config.rate_limit.refresh = RateLimitRule::new(2, 60);
    let ctx = TestContext::with_config(config).await;
    ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    ctx.clock.advance(Duration::seconds(1));
    let rotated = sessions.refresh(&login.tokens.refresh_token).await.unwrap();

    for _ in 0..5 {
        let err = sessions
            .refresh(&login.tokens.refresh_token)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenRevoked);
    }

    assert!(sessions.refresh(&rotated.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_bulk_revocation_during_rotation_covers_the_new_pair() {
    let clock = ManualClock::starting_now();
    let store = Arc::new(BulkRevokeOnRotation {
        inner: MemoryRevocationStore::new(Arc::new(clock.clone()), Duration::days(7)),
        clock: clock.clone(),
        subject: Mutex::new(None),
    });
    let ctx = TestContext::with_revocations(test_config(), clock, store.clone());
    let principal = ctx.create_user("ada@example.com").await;
    let login = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    *store.subject.lock().unwrap() = Some(principal.id);
    let pair = sessions.refresh(&login.tokens.refresh_token).await.unwrap();
    *store.subject.lock().unwrap() = None;

    for token in [&login.tokens.access_token, &pair.access_token] {
        let err = sessions.authenticate(token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenRevoked);
    }
    let err = sessions.refresh(&pair.refresh_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenRevoked);

    let (_, identity) = ctx.identity("ada@example.com").await;
    assert_eq!(identity.subject_id, principal.id);
}
